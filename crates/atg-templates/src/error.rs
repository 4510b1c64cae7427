//! Template store error types.

use thiserror::Error;

/// Errors that can occur while loading or curating templates.
#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("parse error in {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("invalid template '{id}': {message}")]
    Invalid { id: String, message: String },

    #[error("duplicate template id: {0}")]
    Duplicate(String),

    #[error("template source not found: {0}")]
    NotFound(String),

    #[error("template source is empty")]
    Empty,
}

/// Convenience alias for template store results.
pub type TemplateResult<T> = Result<T, TemplateError>;
