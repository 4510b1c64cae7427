//! Embedding capability abstraction.

use async_trait::async_trait;

use atg_protocol::CapabilityError;

/// Maps text to fixed-dimension vectors.
///
/// The index is agnostic to the dimension and the model; it only requires
/// every vector from one embedder to share a dimension, and rankings to be
/// reproducible within tolerance.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a batch of texts, one vector per text, in input order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, CapabilityError>;

    /// Short name for logs and health output.
    fn name(&self) -> &str;
}
