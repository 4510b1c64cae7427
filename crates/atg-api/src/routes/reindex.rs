//! Explicit corpus reload.

use axum::Json;
use axum::extract::State;
use serde::Serialize;

use crate::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ReindexResponse {
    pub index_version: u64,
    pub templates: usize,
    pub chunks: usize,
    /// Templates whose content changed since the previous snapshot.
    pub changed: Vec<String>,
}

/// POST /api/v1/reindex: reload templates and swap in a new index.
///
/// On failure the previous index keeps serving and the error is returned.
pub async fn reindex(State(state): State<AppState>) -> ApiResult<Json<ReindexResponse>> {
    let snapshot = state.orchestrator.reload().await?;
    tracing::info!(version = snapshot.version(), "reindex requested");
    Ok(Json(ReindexResponse {
        index_version: snapshot.version(),
        templates: snapshot.len(),
        chunks: snapshot.chunk_count(),
        changed: snapshot.changed_templates().to_vec(),
    }))
}
