//! Errors shared by the external capabilities (language model, embedder).

use thiserror::Error;

/// Failure of an external model capability.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The call did not complete within its deadline.
    #[error("capability timed out after {0} ms")]
    Timeout(u64),

    /// Transport or backend failure (connection refused, non-2xx, SDK error).
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    /// The backend answered, but not with something usable.
    #[error("malformed capability response: {0}")]
    Malformed(String),
}

impl CapabilityError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_carries_detail() {
        assert_eq!(
            CapabilityError::Timeout(5000).to_string(),
            "capability timed out after 5000 ms"
        );
        assert!(CapabilityError::Unavailable("refused".into())
            .to_string()
            .contains("refused"));
        assert!(CapabilityError::Timeout(1).is_timeout());
        assert!(!CapabilityError::Malformed("x".into()).is_timeout());
    }
}
