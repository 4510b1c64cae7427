use serde::{Deserialize, Serialize};

use crate::params::ParamValue;
use crate::resource::ResourceKind;

/// Grammar a template body is written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Syntax {
    #[default]
    Hcl,
    Json,
}

/// Where a placeholder's final value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Stated explicitly in the request.
    Request,
    /// Implied by the request's phrasing.
    Inferred,
    /// Template-declared default.
    Default,
    Unresolved,
}

/// Resolution record for one placeholder of a template body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderResolution {
    pub name: String,
    /// Required placeholders block acceptance when unresolved.
    pub required: bool,
    pub source: ResolutionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<ParamValue>,
    /// Resource kinds a reference parameter may point at; empty otherwise.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<ResourceKind>,
}

impl PlaceholderResolution {
    pub fn is_resolved(&self) -> bool {
        self.source != ResolutionSource::Unresolved
    }
}

/// What a customization note records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    /// An integer was moved into its declared `[min, max]` range.
    Clamped,
    /// A request value did not fit the parameter; the default was used.
    Fallback,
    /// A body placeholder has no declared parameter.
    Undeclared,
}

/// Audit note attached during customization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionNote {
    pub field: String,
    pub kind: NoteKind,
    pub note: String,
}

/// A template body with placeholders resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizedArtifact {
    pub template_id: String,
    pub template_version: u32,
    pub resource_kind: ResourceKind,
    /// Key other artifacts in the same batch use to reference this one.
    pub xref_key: String,
    pub syntax: Syntax,
    pub body: String,
    pub resolutions: Vec<PlaceholderResolution>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<ResolutionNote>,
}

impl CustomizedArtifact {
    pub fn resolution(&self, name: &str) -> Option<&PlaceholderResolution> {
        self.resolutions.iter().find(|r| r.name == name)
    }

    pub fn unresolved_required(&self) -> impl Iterator<Item = &PlaceholderResolution> {
        self.resolutions
            .iter()
            .filter(|r| r.required && !r.is_resolved())
    }

    /// No required placeholder is left unresolved.
    pub fn is_complete(&self) -> bool {
        self.unresolved_required().next().is_none()
    }
}
