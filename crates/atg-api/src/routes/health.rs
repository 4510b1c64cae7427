//! Health check endpoint.

use axum::Json;
use axum::extract::State;
use serde_json::{Value, json};

use crate::state::AppState;

/// GET /health: liveness plus index status.
///
/// Always 200; `status` is `degraded` until an index snapshot exists.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let index = state.orchestrator.index();
    let body = match index.snapshot() {
        Ok(snapshot) => json!({
            "status": "ok",
            "version": env!("CARGO_PKG_VERSION"),
            "index_version": snapshot.version(),
            "index_built_at": snapshot.built_at(),
            "templates": snapshot.len(),
            "embedder": snapshot.embedder(),
            "started_at": state.started_at,
        }),
        Err(_) => json!({
            "status": "degraded",
            "version": env!("CARGO_PKG_VERSION"),
            "index_version": 0,
            "templates": 0,
            "embedder": index.embedder_name(),
            "started_at": state.started_at,
        }),
    };
    Json(body)
}
