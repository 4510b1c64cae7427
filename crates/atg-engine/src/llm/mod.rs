//! Language-model capability used by extraction fallback and advisory review.
//!
//! Backends:
//! - **Ollama** (local): `/api/chat` with JSON output.
//! - **Bedrock** (cloud): the model-agnostic Converse API.

pub mod bedrock;
pub mod mock;
pub mod ollama;

use async_trait::async_trait;

use atg_protocol::CapabilityError;

/// A chat-style model that answers one system + user prompt.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Return the model's raw text answer.
    async fn complete(&self, system: &str, user: &str) -> Result<String, CapabilityError>;

    /// Name of this backend (for logging/audit).
    fn name(&self) -> &str;
}

pub use bedrock::{BedrockChat, BedrockConfig};
pub use mock::{MockLanguageModel, SlowModel};
pub use ollama::{OllamaChat, OllamaChatConfig};

/// Extract JSON from model output that may be wrapped in markdown code blocks.
pub fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();

    if let Some(start) = trimmed.find("```json") {
        let after_fence = &trimmed[start + 7..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            return after_fence[..end].trim();
        }
    }

    trimmed
}
