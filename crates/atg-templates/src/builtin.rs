//! The curated corpus compiled into the binary.

use async_trait::async_trait;

use crate::error::{TemplateError, TemplateResult};
use crate::source::TemplateSource;

const BUILTIN: &[(&str, &str)] = &[
    ("aks.toml", include_str!("../../../templates/aks.toml")),
    ("lb.toml", include_str!("../../../templates/lb.toml")),
    ("storage.toml", include_str!("../../../templates/storage.toml")),
    (
        "virtual_machine.toml",
        include_str!("../../../templates/virtual_machine.toml"),
    ),
    ("vnet.toml", include_str!("../../../templates/vnet.toml")),
];

/// Serves the templates shipped in the repository's `templates/` directory.
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinTemplateSource;

#[async_trait]
impl TemplateSource for BuiltinTemplateSource {
    async fn list(&self) -> TemplateResult<Vec<String>> {
        Ok(BUILTIN.iter().map(|(name, _)| (*name).to_string()).collect())
    }

    async fn read(&self, name: &str) -> TemplateResult<String> {
        BUILTIN
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, text)| (*text).to_string())
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    fn describe(&self) -> String {
        "builtin".into()
    }
}
