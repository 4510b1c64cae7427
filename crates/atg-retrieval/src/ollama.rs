//! Ollama embedding client (`/api/embed`).

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use atg_protocol::CapabilityError;

use crate::embedder::Embedder;

/// Configuration for an Ollama embedding endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct OllamaEmbedderConfig {
    /// Ollama HTTP API base URL.
    #[serde(default = "default_host")]
    pub host: String,
    /// Embedding model name.
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_host() -> String {
    "http://localhost:11434".into()
}
fn default_model() -> String {
    "nomic-embed-text".into()
}
fn default_timeout_secs() -> u64 {
    5
}

impl Default for OllamaEmbedderConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

/// Embedder backed by a local Ollama server.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    config: OllamaEmbedderConfig,
}

impl OllamaEmbedder {
    pub fn new(config: OllamaEmbedderConfig) -> Result<Self, CapabilityError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CapabilityError::Unavailable(format!("http client: {e}")))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError> {
        let url = format!("{}/api/embed", self.config.host.trim_end_matches('/'));
        let body = EmbedRequest {
            model: &self.config.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    CapabilityError::Timeout(self.config.timeout_secs * 1000)
                } else {
                    tracing::warn!(error = %e, "ollama embed request failed");
                    CapabilityError::Unavailable(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "ollama embed returned non-200");
            return Err(CapabilityError::Unavailable(format!(
                "ollama returned {}",
                response.status()
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| CapabilityError::Malformed(e.to_string()))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(CapabilityError::Malformed(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.embeddings.len()
            )));
        }
        Ok(parsed.embeddings)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn embedder_for(server: &MockServer) -> OllamaEmbedder {
        OllamaEmbedder::new(OllamaEmbedderConfig {
            host: server.uri(),
            model: "nomic-embed-text".into(),
            timeout_secs: 2,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn embeds_batch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .and(body_partial_json(serde_json::json!({"model": "nomic-embed-text"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "nomic-embed-text",
                "embeddings": [[0.1, 0.2], [0.3, 0.4]]
            })))
            .mount(&server)
            .await;

        let out = embedder_for(&server)
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(out, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn server_error_is_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = embedder_for(&server).embed(&["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Unavailable(_)));
    }

    #[tokio::test]
    async fn wrong_count_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/embed"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"embeddings": [[1.0]]})),
            )
            .mount(&server)
            .await;

        let err = embedder_for(&server)
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, CapabilityError::Malformed(_)));
    }

    #[tokio::test]
    async fn unreachable_host_is_unavailable() {
        let embedder = OllamaEmbedder::new(OllamaEmbedderConfig {
            host: "http://127.0.0.1:1".into(),
            ..Default::default()
        })
        .unwrap();
        let err = embedder.embed(&["a".to_string()]).await.unwrap_err();
        assert!(matches!(err, CapabilityError::Unavailable(_)));
    }
}
