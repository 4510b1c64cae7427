//! Template store for the Azure Terraform generator.
//!
//! Provides the curated template model (`Template`, `ParameterSpec`), the
//! `{{placeholder}}` scanner and renderer, TOML definition loading with
//! curation checks, a `TemplateSource` abstraction for testability
//! (directory, builtin corpus, mock), and `TemplateStore`, which turns a
//! source into a validated `TemplateCatalog`.

pub mod builtin;
pub mod definition;
pub mod error;
pub mod mock;
pub mod placeholder;
pub mod source;
pub mod store;
pub mod types;

// Re-export key types for convenience
pub use builtin::BuiltinTemplateSource;
pub use error::{TemplateError, TemplateResult};
pub use mock::MockTemplateSource;
pub use source::{DirTemplateSource, TemplateSource};
pub use store::{TemplateCatalog, TemplateStore};
pub use types::{ParamType, ParameterSpec, Template};
