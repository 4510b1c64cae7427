//! Failed-class pipeline errors.

use thiserror::Error;

use atg_protocol::{CapabilityError, FailureKind};
use atg_retrieval::IndexError;
use atg_templates::TemplateError;

/// An unrecoverable request error. Every variant maps onto one
/// [`FailureKind`] and ends the request in the `Failed` state.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("request is {len} bytes, limit is {max}")]
    InputTooLong { len: usize, max: usize },

    #[error("parameter extraction timed out after {0} ms")]
    ExtractionTimeout(u64),

    #[error("extraction capability unavailable: {0}")]
    ExtractorUnavailable(String),

    #[error("query embedding timed out after {0} ms")]
    EmbeddingTimeout(u64),

    #[error("embedding capability unavailable: {0}")]
    EmbedderUnavailable(String),

    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("request cancelled")]
    Cancelled,
}

impl PipelineError {
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::InputTooLong { .. } => FailureKind::InputTooLong,
            Self::ExtractionTimeout(_) => FailureKind::ExtractionTimeout,
            Self::ExtractorUnavailable(_) => FailureKind::ExtractorUnavailable,
            Self::EmbeddingTimeout(_) => FailureKind::EmbeddingTimeout,
            Self::EmbedderUnavailable(_) => FailureKind::EmbedderUnavailable,
            Self::IndexUnavailable(_) => FailureKind::IndexUnavailable,
            Self::Cancelled => FailureKind::Cancelled,
        }
    }

    /// Map a language-model failure during extraction.
    pub fn from_extractor(err: CapabilityError) -> Self {
        match err {
            CapabilityError::Timeout(ms) => Self::ExtractionTimeout(ms),
            other => Self::ExtractorUnavailable(other.to_string()),
        }
    }
}

impl From<IndexError> for PipelineError {
    fn from(err: IndexError) -> Self {
        let message = err.to_string();
        match err {
            IndexError::EmbeddingTimeout(ms) => Self::EmbeddingTimeout(ms),
            IndexError::Embedder(CapabilityError::Timeout(ms)) => Self::EmbeddingTimeout(ms),
            IndexError::Embedder(_)
            | IndexError::CountMismatch { .. }
            | IndexError::DimensionMismatch { .. } => Self::EmbedderUnavailable(message),
            IndexError::Unavailable | IndexError::InvalidK => Self::IndexUnavailable(message),
        }
    }
}

/// Failure to reload the corpus. The previous snapshot keeps serving.
#[derive(Debug, Error)]
pub enum ReloadError {
    #[error("template load failed: {0}")]
    Templates(#[from] TemplateError),

    #[error("index build failed: {0}")]
    Index(#[from] IndexError),
}
