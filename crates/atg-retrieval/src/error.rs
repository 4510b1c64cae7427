use atg_protocol::CapabilityError;
use thiserror::Error;

/// Errors from building or querying the embedding index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No snapshot has been published yet.
    #[error("embedding index is not built")]
    Unavailable,

    #[error("k must be at least 1")]
    InvalidK,

    #[error("embedding timed out after {0} ms")]
    EmbeddingTimeout(u64),

    #[error("embedder failed: {0}")]
    Embedder(#[from] CapabilityError),

    #[error("embedder returned {got} vectors for {expected} texts")]
    CountMismatch { expected: usize, got: usize },

    #[error("vector dimension {got} does not match index dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

pub type IndexResult<T> = Result<T, IndexError>;
