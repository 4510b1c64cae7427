//! Shared application state for the Axum server.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use atg_engine::Orchestrator;

/// Shared application state, cheap to clone into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Pipeline plus the template store and index it reads from.
    pub orchestrator: Arc<Orchestrator>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            started_at: Utc::now(),
        }
    }
}
