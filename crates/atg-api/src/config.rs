//! API server configuration.

use std::path::PathBuf;

use serde::Deserialize;

use atg_engine::config::valid_scope_threshold;
use atg_engine::{EngineConfig, LlmProvider};

/// Top-level API server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Listen address (e.g., "0.0.0.0").
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Where accepted configurations are written, one directory per request.
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
    /// Pipeline settings.
    #[serde(default)]
    pub engine: EngineConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            output_dir: None,
            engine: EngineConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Load from a TOML file, or defaults when no path is given.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                toml::from_str(&contents)?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.engine.validate()?;
        Ok(config)
    }

    /// Apply `ATG_*` overrides looked up through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(host) = var("ATG_HOST") {
            self.host = host;
        }
        if let Some(port) = var("ATG_PORT").and_then(|p| p.parse().ok()) {
            self.port = port;
        }
        if let Some(dir) = var("ATG_OUTPUT_DIR") {
            self.output_dir = Some(dir.into());
        }
        if let Some(dir) = var("ATG_TEMPLATE_DIR") {
            self.engine.template_dir = Some(dir.into());
        }
        if let Some(provider) = var("ATG_LLM_PROVIDER") {
            match LlmProvider::parse(&provider) {
                Some(p) => self.engine.llm.provider = p,
                None => tracing::warn!(%provider, "ignoring unknown ATG_LLM_PROVIDER"),
            }
        }
        if let Some(raw) = var("ATG_SCOPE_THRESHOLD") {
            match raw.trim().parse::<f64>() {
                Ok(threshold) if valid_scope_threshold(threshold) => {
                    self.engine.scope_threshold = threshold;
                }
                _ => tracing::warn!(%raw, "ignoring ATG_SCOPE_THRESHOLD outside [-1, 1]"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(config.output_dir.is_none());
        assert_eq!(config.engine.scope_threshold, 0.75);
    }

    #[test]
    fn nested_engine_table() {
        let config: ApiConfig = toml::from_str(
            r#"
port = 8080

[engine]
scope_threshold = 0.8
max_input_bytes = 1024

[engine.llm]
provider = "ollama"
advisory = true
"#,
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.engine.scope_threshold, 0.8);
        assert_eq!(config.engine.max_input_bytes, 1024);
        assert_eq!(config.engine.llm.provider, LlmProvider::Ollama);
        assert!(config.engine.llm.advisory);
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ATG_PORT", "9090"),
            ("ATG_OUTPUT_DIR", "/tmp/out"),
            ("ATG_LLM_PROVIDER", "bedrock"),
            ("ATG_SCOPE_THRESHOLD", "not-a-number"),
        ]
        .into_iter()
        .collect();
        let mut config = ApiConfig::default();
        config.apply_env(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.port, 9090);
        assert_eq!(config.output_dir, Some(PathBuf::from("/tmp/out")));
        assert_eq!(config.engine.llm.provider, LlmProvider::Bedrock);
        assert_eq!(config.engine.scope_threshold, 0.75);
        assert_eq!(config.host, "0.0.0.0");
    }

    #[test]
    fn env_threshold_must_be_a_cosine_cutoff() {
        for raw in ["NaN", "inf", "1.5", "-2"] {
            let mut config = ApiConfig::default();
            config.apply_env(|key| (key == "ATG_SCOPE_THRESHOLD").then(|| raw.to_string()));
            assert_eq!(config.engine.scope_threshold, 0.75, "accepted {raw}");
        }

        let mut config = ApiConfig::default();
        config.apply_env(|key| (key == "ATG_SCOPE_THRESHOLD").then(|| " 0.6 ".to_string()));
        assert_eq!(config.engine.scope_threshold, 0.6);
    }

    #[test]
    fn load_rejects_out_of_range_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atg.toml");
        std::fs::write(&path, "[engine]\nscope_threshold = 7.5\n").unwrap();
        let err = ApiConfig::load(path.to_str()).unwrap_err();
        assert!(err.to_string().contains("scope_threshold"), "{err}");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("atg.toml");
        std::fs::write(&path, "host = \"127.0.0.1\"\n").unwrap();
        let config = ApiConfig::load(path.to_str()).unwrap();
        assert_eq!(config.host, "127.0.0.1");
    }
}
