//! Semantic retrieval over the curated template catalog.
//!
//! Templates are chunked into description facets, embedded through the
//! [`Embedder`] capability and published as immutable [`IndexSnapshot`]s.
//! Rebuilds swap the snapshot pointer in one write, so concurrent readers
//! always see a complete index. [`Retriever`] turns a parameter bag and the
//! raw request into a scope-classified [`atg_protocol::RetrievalResult`].

pub mod chunk;
pub mod concept;
pub mod embedder;
pub mod error;
pub mod index;
pub mod mock;
pub mod ollama;
pub mod retriever;
pub mod vector;

pub use concept::ConceptEmbedder;
pub use embedder::Embedder;
pub use error::{IndexError, IndexResult};
pub use index::{EmbeddingIndex, IndexConfig, IndexSnapshot, ScoredTemplate};
pub use mock::{FixedEmbedder, SlowEmbedder};
pub use ollama::{OllamaEmbedder, OllamaEmbedderConfig};
pub use retriever::Retriever;
