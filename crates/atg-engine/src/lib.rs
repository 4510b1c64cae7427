//! Request pipeline for the Azure Terraform generator.
//!
//! Extraction (rule tier plus optional language-model tier), per-template
//! customization, rule-based validation with an optional advisory review,
//! composition of accepted artifacts into one `main.tf`, and the
//! [`Orchestrator`] state machine that sequences them against a pinned
//! index snapshot.

pub mod advisor;
pub mod compose;
pub mod config;
pub mod customize;
pub mod error;
pub mod extract;
pub mod llm;
pub mod orchestrator;
pub mod sink;
pub mod validate;

pub use advisor::LlmAdvisor;
pub use config::{EmbedderConfig, EmbedderKind, EngineConfig, LlmConfig, LlmProvider};
pub use customize::customize;
pub use error::{PipelineError, ReloadError};
pub use compose::compose;
pub use extract::{LlmExtractor, ParameterExtractor};
pub use llm::{LanguageModel, MockLanguageModel};
pub use orchestrator::{GenerateRequest, Orchestrator};
pub use sink::{ArtifactSink, DirArtifactSink};
pub use validate::validate;
