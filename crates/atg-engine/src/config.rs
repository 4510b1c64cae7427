//! Engine configuration, loadable from TOML.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Which language model backs extraction fallback and advisory review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[default]
    None,
    Ollama,
    Bedrock,
}

impl LlmProvider {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "none" | "off" | "" => Some(Self::None),
            "ollama" => Some(Self::Ollama),
            "bedrock" => Some(Self::Bedrock),
            _ => None,
        }
    }
}

/// Language model settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default)]
    pub provider: LlmProvider,
    /// Ollama HTTP API base URL.
    #[serde(default = "default_ollama_host")]
    pub host: String,
    /// Ollama model name. Bedrock reads `BEDROCK_MODEL_ID` instead.
    #[serde(default = "default_chat_model")]
    pub model: String,
    /// Run the advisory review after acceptance.
    #[serde(default)]
    pub advisory: bool,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: LlmProvider::None,
            host: default_ollama_host(),
            model: default_chat_model(),
            advisory: false,
        }
    }
}

/// Which embedder the index uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Deterministic offline concept embedder.
    #[default]
    Concept,
    Ollama,
}

/// Embedder settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbedderConfig {
    #[serde(default)]
    pub kind: EmbedderKind,
    #[serde(default = "default_ollama_host")]
    pub host: String,
    #[serde(default = "default_embed_model")]
    pub model: String,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self {
            kind: EmbedderKind::Concept,
            host: default_ollama_host(),
            model: default_embed_model(),
        }
    }
}

/// Pipeline configuration. Every field has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Minimum cosine score for a template to count as in scope.
    #[serde(default = "default_scope_threshold")]
    pub scope_threshold: f64,
    #[serde(default = "default_max_input_bytes")]
    pub max_input_bytes: usize,
    #[serde(default = "default_timeout_secs")]
    pub extraction_timeout_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub embedding_timeout_secs: u64,
    #[serde(default = "default_tie_epsilon")]
    pub tie_epsilon: f64,
    #[serde(default = "default_chunk_max_chars")]
    pub chunk_max_chars: usize,
    /// Directory of template definitions. The builtin corpus when absent.
    #[serde(default)]
    pub template_dir: Option<PathBuf>,
    /// Prepend the `terraform`/`provider "azurerm"` block to composed output.
    #[serde(default = "default_true")]
    pub provider_preamble: bool,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub embedder: EmbedderConfig,
}

fn default_scope_threshold() -> f64 {
    0.75
}
fn default_max_input_bytes() -> usize {
    4096
}
fn default_timeout_secs() -> u64 {
    5
}
fn default_tie_epsilon() -> f64 {
    1e-6
}
fn default_chunk_max_chars() -> usize {
    400
}
fn default_true() -> bool {
    true
}
fn default_ollama_host() -> String {
    "http://localhost:11434".into()
}
fn default_chat_model() -> String {
    "phi3:mini".into()
}
fn default_embed_model() -> String {
    "nomic-embed-text".into()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            scope_threshold: default_scope_threshold(),
            max_input_bytes: default_max_input_bytes(),
            extraction_timeout_secs: default_timeout_secs(),
            embedding_timeout_secs: default_timeout_secs(),
            tie_epsilon: default_tie_epsilon(),
            chunk_max_chars: default_chunk_max_chars(),
            template_dir: None,
            provider_preamble: true,
            llm: LlmConfig::default(),
            embedder: EmbedderConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn extraction_timeout(&self) -> Duration {
        Duration::from_secs(self.extraction_timeout_secs)
    }

    pub fn embedding_timeout(&self) -> Duration {
        Duration::from_secs(self.embedding_timeout_secs)
    }

    pub fn index_config(&self) -> atg_retrieval::IndexConfig {
        atg_retrieval::IndexConfig {
            tie_epsilon: self.tie_epsilon,
            chunk_max_chars: self.chunk_max_chars,
            embedding_timeout: self.embedding_timeout(),
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !valid_scope_threshold(self.scope_threshold) {
            anyhow::bail!(
                "scope_threshold must be a number in [-1, 1], got {}",
                self.scope_threshold
            );
        }
        if self.max_input_bytes == 0 {
            anyhow::bail!("max_input_bytes must be positive");
        }
        Ok(())
    }
}

/// Cosine scores live in [-1, 1]; a cutoff outside that range is unusable.
pub fn valid_scope_threshold(threshold: f64) -> bool {
    threshold.is_finite() && (-1.0..=1.0).contains(&threshold)
}
