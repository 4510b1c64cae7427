//! AWS Bedrock chat backend using the Converse API.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_bedrockruntime::Client as BedrockClient;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, ConverseOutput, Message, SystemContentBlock,
};
use tokio::time::timeout;

use atg_protocol::CapabilityError;

use super::LanguageModel;

/// Configuration for the Bedrock backend.
#[derive(Debug, Clone)]
pub struct BedrockConfig {
    /// Bedrock model ID (e.g., "us.amazon.nova-lite-v1:0").
    pub model_id: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl BedrockConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let model_id =
            std::env::var("BEDROCK_MODEL_ID").unwrap_or_else(|_| "us.amazon.nova-lite-v1:0".into());
        let timeout_secs: u64 = std::env::var("BEDROCK_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(5);
        Self {
            model_id,
            timeout: Duration::from_secs(timeout_secs),
        }
    }
}

/// Bedrock Converse API chat model.
pub struct BedrockChat {
    client: BedrockClient,
    config: BedrockConfig,
}

impl BedrockChat {
    /// Create a backend with a pre-built Bedrock client.
    pub fn new(client: BedrockClient, config: BedrockConfig) -> Self {
        Self { client, config }
    }

    async fn converse(&self, system: &str, user: &str) -> Result<String, CapabilityError> {
        let user_message = Message::builder()
            .role(ConversationRole::User)
            .content(ContentBlock::Text(user.to_string()))
            .build()
            .map_err(|e| CapabilityError::Malformed(format!("failed to build message: {e}")))?;

        let response = self
            .client
            .converse()
            .model_id(&self.config.model_id)
            .system(SystemContentBlock::Text(system.to_string()))
            .messages(user_message)
            .send()
            .await
            .map_err(|e| CapabilityError::Unavailable(format!("bedrock converse error: {e}")))?;

        let output = response
            .output()
            .ok_or_else(|| CapabilityError::Malformed("no output in bedrock response".into()))?;

        let text = match output {
            ConverseOutput::Message(msg) => msg.content().iter().find_map(|block| {
                if let ContentBlock::Text(t) = block {
                    Some(t.clone())
                } else {
                    None
                }
            }),
            _ => None,
        };
        text.ok_or_else(|| CapabilityError::Malformed("bedrock returned no text block".into()))
    }
}

#[async_trait]
impl LanguageModel for BedrockChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String, CapabilityError> {
        match timeout(self.config.timeout, self.converse(system, user)).await {
            Ok(result) => {
                if let Err(e) = &result {
                    tracing::warn!(error = %e, "bedrock completion failed");
                }
                result
            }
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.config.timeout.as_secs(),
                    "bedrock completion timed out"
                );
                Err(CapabilityError::Timeout(self.config.timeout.as_millis() as u64))
            }
        }
    }

    fn name(&self) -> &str {
        "bedrock"
    }
}
