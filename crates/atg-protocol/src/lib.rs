//! Shared types for the Azure Terraform generator pipeline.
//!
//! Everything here is plain data (serde-serializable) exchanged between
//! the template store, retrieval, the engine and the HTTP surface.

pub mod artifact;
pub mod capability;
pub mod params;
pub mod pipeline;
pub mod resource;
pub mod retrieval;
pub mod verdict;

pub use artifact::*;
pub use capability::*;
pub use params::*;
pub use pipeline::*;
pub use resource::*;
pub use retrieval::*;
pub use verdict::*;
