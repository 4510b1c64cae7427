//! Mock template source for testing: serves pre-loaded definitions.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::builtin::BuiltinTemplateSource;
use crate::error::{TemplateError, TemplateResult};
use crate::source::TemplateSource;

/// A mock source that serves definition text by name.
#[derive(Debug, Default, Clone)]
pub struct MockTemplateSource {
    files: BTreeMap<String, String>,
}

impl MockTemplateSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a definition.
    pub fn add(&mut self, name: impl Into<String>, text: impl Into<String>) {
        self.files.insert(name.into(), text.into());
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.files.remove(name)
    }

    /// A mock pre-loaded with the builtin corpus, ready to be edited.
    pub async fn with_builtin() -> TemplateResult<Self> {
        let builtin = BuiltinTemplateSource;
        let mut m = Self::new();
        for name in builtin.list().await? {
            let text = builtin.read(&name).await?;
            m.add(name, text);
        }
        Ok(m)
    }
}

#[async_trait]
impl TemplateSource for MockTemplateSource {
    async fn list(&self) -> TemplateResult<Vec<String>> {
        Ok(self.files.keys().cloned().collect())
    }

    async fn read(&self, name: &str) -> TemplateResult<String> {
        self.files
            .get(name)
            .cloned()
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))
    }

    fn describe(&self) -> String {
        format!("mock:{} definitions", self.files.len())
    }
}
