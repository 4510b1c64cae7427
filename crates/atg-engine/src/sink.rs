//! Hand-off of accepted configurations to whatever applies them.
//!
//! The pipeline only writes; it never reads back or interprets what the
//! downstream executor does with the file.

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("write failed for {path}: {message}")]
    Io { path: String, message: String },
}

/// Destination for composed configurations.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    /// Store `composed` for `request_id`; returns where it went.
    async fn deliver(&self, request_id: Uuid, composed: &str) -> Result<String, SinkError>;

    fn describe(&self) -> String;
}

/// Writes `<root>/<request_id>/main.tf`.
#[derive(Debug, Clone)]
pub struct DirArtifactSink {
    root: PathBuf,
}

impl DirArtifactSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ArtifactSink for DirArtifactSink {
    async fn deliver(&self, request_id: Uuid, composed: &str) -> Result<String, SinkError> {
        let dir = self.root.join(request_id.to_string());
        let io_err = |path: &PathBuf, e: std::io::Error| SinkError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| io_err(&dir, e))?;
        let file = dir.join("main.tf");
        tokio::fs::write(&file, composed)
            .await
            .map_err(|e| io_err(&file, e))?;
        Ok(file.display().to_string())
    }

    fn describe(&self) -> String {
        format!("dir:{}", self.root.display())
    }
}
