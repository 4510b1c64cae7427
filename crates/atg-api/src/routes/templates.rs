//! Template catalog listing.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use atg_protocol::{ResourceKind, Syntax};
use atg_templates::ParameterSpec;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// One supported resource as exposed over the API.
#[derive(Debug, Serialize)]
pub struct TemplateSummary {
    pub id: String,
    pub version: u32,
    pub resource_kind: ResourceKind,
    pub display_name: &'static str,
    pub syntax: Syntax,
    pub description: String,
    pub parameters: Vec<ParameterSpec>,
}

#[derive(Debug, Serialize)]
pub struct TemplateList {
    pub index_version: u64,
    pub scope_threshold: f64,
    pub templates: Vec<TemplateSummary>,
}

/// GET /api/v1/templates: templates of the snapshot currently serving.
pub async fn list_templates(State(state): State<AppState>) -> ApiResult<Json<TemplateList>> {
    let snapshot = state
        .orchestrator
        .index()
        .snapshot()
        .map_err(|e| ApiError::Unavailable(e.to_string()))?;

    let templates = snapshot
        .catalog()
        .templates()
        .iter()
        .map(|t| TemplateSummary {
            id: t.id.clone(),
            version: t.version,
            resource_kind: t.resource_kind,
            display_name: t.resource_kind.display_name(),
            syntax: t.syntax,
            description: t.description.trim().to_string(),
            parameters: t.parameters.clone(),
        })
        .collect();

    Ok(Json(TemplateList {
        index_version: snapshot.version(),
        scope_threshold: state.orchestrator.scope_threshold(),
        templates,
    }))
}
