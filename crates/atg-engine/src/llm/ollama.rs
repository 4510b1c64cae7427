//! Ollama chat client (`/api/chat`, JSON format).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use atg_protocol::CapabilityError;

use super::LanguageModel;

/// Configuration for an Ollama chat endpoint.
#[derive(Debug, Clone)]
pub struct OllamaChatConfig {
    /// Ollama HTTP API base URL.
    pub host: String,
    pub model: String,
    /// Transport timeout; the pipeline applies its own deadline on top.
    pub timeout: Duration,
}

impl Default for OllamaChatConfig {
    fn default() -> Self {
        Self {
            host: "http://localhost:11434".into(),
            model: "phi3:mini".into(),
            timeout: Duration::from_secs(5),
        }
    }
}

/// Ollama chat API request body.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    format: &'a str,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Ollama chat API response (only fields we need).
#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// Client for a local Ollama chat model.
pub struct OllamaChat {
    client: reqwest::Client,
    config: OllamaChatConfig,
}

impl OllamaChat {
    pub fn new(config: OllamaChatConfig) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CapabilityError::Unavailable(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl LanguageModel for OllamaChat {
    async fn complete(&self, system: &str, user: &str) -> Result<String, CapabilityError> {
        let url = format!("{}/api/chat", self.config.host.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            format: "json",
            stream: false,
        };

        let response = match self.client.post(&url).json(&body).send().await {
            Ok(resp) => resp,
            Err(e) if e.is_timeout() => {
                return Err(CapabilityError::Timeout(self.config.timeout.as_millis() as u64));
            }
            Err(e) => {
                tracing::warn!(error = %e, "ollama request failed");
                return Err(CapabilityError::Unavailable(e.to_string()));
            }
        };

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "ollama returned non-200");
            return Err(CapabilityError::Unavailable(format!(
                "ollama returned {}",
                response.status()
            )));
        }

        let chat: ChatResponse = response.json().await.map_err(|e| {
            tracing::warn!(error = %e, "failed to parse ollama response body");
            CapabilityError::Malformed(e.to_string())
        })?;

        chat.message
            .map(|m| m.content)
            .ok_or_else(|| CapabilityError::Malformed("response has no message".into()))
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
