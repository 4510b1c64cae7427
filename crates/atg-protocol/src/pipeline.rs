use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::artifact::CustomizedArtifact;
use crate::params::ParameterBag;
use crate::retrieval::RetrievalResult;
use crate::verdict::ValidationIssue;

/// Orchestrator state. `OutOfScope`, `Accepted`, `Rejected` and `Failed`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Extracting,
    Retrieving,
    OutOfScope,
    Customizing,
    Validating,
    Accepted,
    Rejected,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::OutOfScope | Self::Accepted | Self::Rejected | Self::Failed
        )
    }

    /// Whether the state machine allows `self -> next`.
    ///
    /// `Failed` is reachable from every non-terminal state.
    pub fn can_transition_to(&self, next: PipelineState) -> bool {
        use PipelineState::*;
        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Extracting, Retrieving)
                | (Retrieving, OutOfScope)
                | (Retrieving, Customizing)
                | (Customizing, Validating)
                | (Validating, Accepted)
                | (Validating, Rejected)
        )
    }
}

/// Failed-class error kinds. Never retried by the pipeline itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    InputTooLong,
    ExtractionTimeout,
    EmbeddingTimeout,
    IndexUnavailable,
    ExtractorUnavailable,
    EmbedderUnavailable,
    Cancelled,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputTooLong => "input_too_long",
            Self::ExtractionTimeout => "extraction_timeout",
            Self::EmbeddingTimeout => "embedding_timeout",
            Self::IndexUnavailable => "index_unavailable",
            Self::ExtractorUnavailable => "extractor_unavailable",
            Self::EmbedderUnavailable => "embedder_unavailable",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Soft review remark. Never changes a verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Advisory {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    pub message: String,
}

/// Terminal result of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Accepted {
        bag: ParameterBag,
        retrieval: RetrievalResult,
        artifacts: Vec<CustomizedArtifact>,
        /// All artifacts composed into one configuration file.
        composed: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<ValidationIssue>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        advisories: Vec<Advisory>,
    },
    Rejected {
        bag: ParameterBag,
        retrieval: RetrievalResult,
        artifacts: Vec<CustomizedArtifact>,
        reasons: Vec<ValidationIssue>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<ValidationIssue>,
    },
    OutOfScope {
        bag: ParameterBag,
        retrieval: RetrievalResult,
        explanation: String,
    },
    Failed {
        failure: FailureKind,
        message: String,
    },
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Accepted { .. } => "accepted",
            Self::Rejected { .. } => "rejected",
            Self::OutOfScope { .. } => "out_of_scope",
            Self::Failed { .. } => "failed",
        }
    }

    /// Process exit code for command-line surfaces; distinct per outcome.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Accepted { .. } => 0,
            Self::Failed { .. } => 1,
            Self::Rejected { .. } => 2,
            Self::OutOfScope { .. } => 3,
        }
    }

    pub fn terminal_state(&self) -> PipelineState {
        match self {
            Self::Accepted { .. } => PipelineState::Accepted,
            Self::Rejected { .. } => PipelineState::Rejected,
            Self::OutOfScope { .. } => PipelineState::OutOfScope,
            Self::Failed { .. } => PipelineState::Failed,
        }
    }
}

/// Full report of one request: identity, visited states, and the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub request_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// States visited, in order, ending in the terminal state.
    pub trace: Vec<PipelineState>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_transitions_allowed() {
        use PipelineState::*;
        let path = [Extracting, Retrieving, Customizing, Validating, Accepted];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn illegal_transitions_rejected() {
        use PipelineState::*;
        assert!(!Extracting.can_transition_to(Customizing));
        assert!(!OutOfScope.can_transition_to(Customizing));
        assert!(!Accepted.can_transition_to(Failed));
        assert!(Validating.can_transition_to(Failed));
    }

    #[test]
    fn exit_codes_are_distinct() {
        let outcomes = [
            Outcome::Failed {
                failure: FailureKind::IndexUnavailable,
                message: "no index".into(),
            },
            Outcome::OutOfScope {
                bag: ParameterBag::new(),
                retrieval: RetrievalResult::from_ranked(vec![], 0.75, 0),
                explanation: "nothing close".into(),
            },
        ];
        assert_ne!(outcomes[0].exit_code(), outcomes[1].exit_code());
        assert_ne!(outcomes[0].exit_code(), 0);
    }

    #[test]
    fn report_flattens_outcome_tag() {
        let report = PipelineReport {
            request_id: Uuid::now_v7(),
            started_at: Utc::now(),
            finished_at: Utc::now(),
            trace: vec![PipelineState::Extracting, PipelineState::Failed],
            outcome: Outcome::Failed {
                failure: FailureKind::InputTooLong,
                message: "request is 9000 bytes, limit is 4096".into(),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "failed");
        assert_eq!(json["failure"], "input_too_long");
        assert_eq!(json["trace"][1], "failed");
    }
}
