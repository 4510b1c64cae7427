//! Template source abstraction: read definitions from a directory, the
//! builtin corpus, or a mock.

use std::path::PathBuf;

use async_trait::async_trait;

use crate::error::{TemplateError, TemplateResult};

/// Abstraction over where template definitions come from.
///
/// A source only hands out raw definition text; parsing and curation
/// happen in [`crate::TemplateStore`].
#[async_trait]
pub trait TemplateSource: Send + Sync {
    /// Names of all available definitions, sorted.
    async fn list(&self) -> TemplateResult<Vec<String>>;

    /// Raw TOML text of one definition.
    async fn read(&self, name: &str) -> TemplateResult<String>;

    /// Human-readable label for logs.
    fn describe(&self) -> String;
}

/// Reads `*.toml` definitions from a directory on the local filesystem.
pub struct DirTemplateSource {
    dir: PathBuf,
}

impl DirTemplateSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl TemplateSource for DirTemplateSource {
    async fn list(&self) -> TemplateResult<Vec<String>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| io_error(&self.dir.display().to_string(), e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| io_error(&self.dir.display().to_string(), e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "toml")
                && let Some(name) = path.file_name().and_then(|n| n.to_str())
            {
                names.push(name.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    async fn read(&self, name: &str) -> TemplateResult<String> {
        let path = self.dir.join(name);
        tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| io_error(&path.display().to_string(), e))
    }

    fn describe(&self) -> String {
        format!("dir:{}", self.dir.display())
    }
}

fn io_error(path: &str, e: std::io::Error) -> TemplateError {
    if e.kind() == std::io::ErrorKind::NotFound {
        TemplateError::NotFound(path.to_string())
    } else {
        TemplateError::Io(format!("{path}: {e}"))
    }
}
