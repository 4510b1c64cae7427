use serde::{Deserialize, Serialize};

use crate::artifact::CustomizedArtifact;

/// Kind of problem a validation rule detected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Problem {
    UnresolvedRequired,
    DanglingReference,
    UnbalancedDelimiter,
    UnterminatedString,
    LeftoverPlaceholder,
    InvalidJson,
    DuplicateResourceAddress,
    /// A request value carries a `${` or `%{` template sequence.
    InterpolationInValue,
    /// Warning: an explicit value was kept although it breaks consistency.
    ExplicitValueKept,
    /// Warning: a quantity was clamped into its declared range.
    Clamped,
}

impl Problem {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnresolvedRequired => "unresolved-required",
            Self::DanglingReference => "dangling-reference",
            Self::UnbalancedDelimiter => "unbalanced-delimiter",
            Self::UnterminatedString => "unterminated-string",
            Self::LeftoverPlaceholder => "leftover-placeholder",
            Self::InvalidJson => "invalid-json",
            Self::DuplicateResourceAddress => "duplicate-resource-address",
            Self::InterpolationInValue => "interpolation-in-value",
            Self::ExplicitValueKept => "explicit-value-kept",
            Self::Clamped => "clamped",
        }
    }
}

impl std::fmt::Display for Problem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One detected problem, tied to a field of a specific artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub template_id: String,
    pub field: String,
    pub problem: Problem,
    pub detail: String,
}

impl ValidationIssue {
    pub fn new(
        template_id: impl Into<String>,
        field: impl Into<String>,
        problem: Problem,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            template_id: template_id.into(),
            field: field.into(),
            problem,
            detail: detail.into(),
        }
    }
}

/// Outcome of validating a batch of artifacts.
///
/// Rejection reasons are cumulative: every detected problem is listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum ValidationVerdict {
    Accepted {
        artifacts: Vec<CustomizedArtifact>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<ValidationIssue>,
    },
    Rejected {
        reasons: Vec<ValidationIssue>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        warnings: Vec<ValidationIssue>,
    },
}

impl ValidationVerdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted { .. })
    }

    pub fn reasons(&self) -> &[ValidationIssue] {
        match self {
            Self::Accepted { .. } => &[],
            Self::Rejected { reasons, .. } => reasons,
        }
    }

    pub fn warnings(&self) -> &[ValidationIssue] {
        match self {
            Self::Accepted { warnings, .. } | Self::Rejected { warnings, .. } => warnings,
        }
    }

    /// Whether a reason with this field and problem is present.
    pub fn has_reason(&self, field: &str, problem: Problem) -> bool {
        self.reasons()
            .iter()
            .any(|r| r.field == field && r.problem == problem)
    }
}
