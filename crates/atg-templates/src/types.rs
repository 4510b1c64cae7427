//! Core template types.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use atg_protocol::{ParamValue, ResourceKind, Syntax, ValueShape};

use crate::placeholder;

// ── Parameter types ──────────────────────────────────────────

/// Declared type of a template parameter, with its per-template constraints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParamType {
    String,
    /// Quantity-like value; out-of-range input is clamped, not rejected.
    Integer {
        min: Option<i64>,
        max: Option<i64>,
    },
    Enum {
        allowed: Vec<String>,
    },
    List,
    /// Cross-reference key of another artifact in the same batch.
    Reference {
        references: Vec<ResourceKind>,
    },
}

impl ParamType {
    pub fn shape(&self) -> ValueShape {
        match self {
            Self::Integer { .. } => ValueShape::Integer,
            Self::List => ValueShape::List,
            Self::String | Self::Enum { .. } | Self::Reference { .. } => ValueShape::Text,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer { .. } => "integer",
            Self::Enum { .. } => "enum",
            Self::List => "list",
            Self::Reference { .. } => "reference",
        }
    }
}

/// One declared parameter of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(flatten)]
    pub kind: ParamType,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<ParamValue>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ParameterSpec {
    /// Resource kinds a reference parameter may point at.
    pub fn references(&self) -> &[ResourceKind] {
        match &self.kind {
            ParamType::Reference { references } => references,
            _ => &[],
        }
    }
}

// ── Template ─────────────────────────────────────────────────

/// An immutable, curated infrastructure template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Stable identifier; re-indexing the same id is idempotent.
    pub id: String,
    pub version: u32,
    pub resource_kind: ResourceKind,
    pub syntax: Syntax,
    /// Free text used for embedding. Paragraphs are separate facets.
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
    pub body: String,
}

impl Template {
    pub fn parameter(&self, name: &str) -> Option<&ParameterSpec> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_parameters(&self) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters.iter().filter(|p| p.required)
    }

    /// Placeholder names in body order, without duplicates.
    pub fn placeholders(&self) -> Vec<String> {
        placeholder::names(&self.body)
    }

    /// Hex SHA-256 over the fields embeddings are derived from.
    ///
    /// A changed fingerprint means the template's vectors are stale.
    pub fn content_fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.description.as_bytes());
        hasher.update([0u8]);
        hasher.update(self.body.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Description split into non-empty paragraph facets.
    pub fn facets(&self) -> Vec<&str> {
        self.description
            .split("\n\n")
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }
}
