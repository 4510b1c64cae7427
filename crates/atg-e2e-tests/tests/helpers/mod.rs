//! Shared test harness for E2E integration tests.
//!
//! Wires a real `Orchestrator` (template store, embedding index, extractor)
//! behind the API router, so every request crosses all crate boundaries.

use std::path::Path;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use atg_api::routes::build_router;
use atg_api::state::AppState;
use atg_engine::{EngineConfig, LanguageModel, Orchestrator};
use atg_templates::{MockTemplateSource, TemplateSource};

/// End-to-end test harness wiring the pipeline and the HTTP surface.
#[derive(Clone)]
pub struct TestHarness {
    /// Pipeline shared with the router.
    pub orchestrator: Arc<Orchestrator>,
    /// Axum router for HTTP requests via `tower::oneshot`.
    pub router: Router,
}

impl TestHarness {
    /// Builtin templates, offline embedder, index already built.
    pub async fn ready() -> Self {
        Self::with_config(&EngineConfig::default(), None).await
    }

    /// Same wiring as [`TestHarness::ready`] but the index was never built.
    pub fn unbuilt() -> Self {
        let orchestrator =
            Orchestrator::from_config(&EngineConfig::default(), None, None).unwrap();
        Self::from_orchestrator(orchestrator)
    }

    /// Wire from a config and optional model, then build the index once.
    pub async fn with_config(config: &EngineConfig, model: Option<Arc<dyn LanguageModel>>) -> Self {
        let orchestrator = Orchestrator::from_config(config, model, None).unwrap();
        orchestrator.reload().await.unwrap();
        Self::from_orchestrator(orchestrator)
    }

    pub fn from_orchestrator(orchestrator: Orchestrator) -> Self {
        let orchestrator = Arc::new(orchestrator);
        let router = build_router(AppState::new(Arc::clone(&orchestrator)));
        Self {
            orchestrator,
            router,
        }
    }

    /// Submit a request (POST /api/v1/generate).
    /// Returns (HTTP status code, response JSON body).
    pub async fn generate(&self, text: &str) -> (StatusCode, serde_json::Value) {
        self.generate_with(serde_json::json!({ "text": text })).await
    }

    /// Submit a raw generate body.
    pub async fn generate_with(&self, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let response = self
            .router
            .clone()
            .oneshot(
                Request::post("/api/v1/generate")
                    .header("content-type", "application/json")
                    .body(Body::from(serde_json::to_vec(&body).unwrap()))
                    .unwrap(),
            )
            .await
            .unwrap();
        into_parts(response).await
    }

    /// GET any route.
    pub async fn get(&self, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = self
            .router
            .clone()
            .oneshot(Request::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        into_parts(response).await
    }

    /// Trigger a rebuild (POST /api/v1/reindex).
    pub async fn reindex(&self) -> (StatusCode, serde_json::Value) {
        let response = self
            .router
            .clone()
            .oneshot(Request::post("/api/v1/reindex").body(Body::empty()).unwrap())
            .await
            .unwrap();
        into_parts(response).await
    }
}

async fn into_parts(response: axum::response::Response) -> (StatusCode, serde_json::Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    (status, json)
}

/// Write the builtin template definitions into `dir`.
pub async fn copy_builtin_templates(dir: &Path) {
    let builtin = MockTemplateSource::with_builtin().await.unwrap();
    for name in builtin.list().await.unwrap() {
        std::fs::write(dir.join(&name), builtin.read(&name).await.unwrap()).unwrap();
    }
}

/// Template ids of the artifacts in an accepted or rejected response.
pub fn artifact_ids(json: &serde_json::Value) -> Vec<String> {
    json["artifacts"]
        .as_array()
        .map(|artifacts| {
            artifacts
                .iter()
                .map(|a| a["template_id"].as_str().unwrap().to_string())
                .collect()
        })
        .unwrap_or_default()
}
