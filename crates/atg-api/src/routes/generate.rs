//! Generation endpoint.

use axum::Json;
use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use tokio_util::sync::CancellationToken;

use atg_engine::GenerateRequest;
use atg_protocol::{FailureKind, Outcome, PipelineReport};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// HTTP status for a terminal outcome.
pub fn outcome_status(outcome: &Outcome) -> StatusCode {
    match outcome {
        Outcome::Accepted { .. } => StatusCode::OK,
        Outcome::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        Outcome::OutOfScope { .. } => StatusCode::NOT_FOUND,
        Outcome::Failed { failure, .. } => match failure {
            FailureKind::InputTooLong => StatusCode::PAYLOAD_TOO_LARGE,
            FailureKind::ExtractionTimeout | FailureKind::EmbeddingTimeout => {
                StatusCode::GATEWAY_TIMEOUT
            }
            FailureKind::IndexUnavailable
            | FailureKind::ExtractorUnavailable
            | FailureKind::EmbedderUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            FailureKind::Cancelled => StatusCode::INTERNAL_SERVER_ERROR,
        },
    }
}

/// POST /api/v1/generate: run one request through the pipeline.
///
/// The body is always the full report. A client that disconnects cancels
/// the run. A body that does not decode is a 400, never a 422, which is
/// reserved for rejected batches.
pub async fn generate(
    State(state): State<AppState>,
    payload: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<PipelineReport>)> {
    let Json(req) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    if req.text.trim().is_empty() {
        return Err(ApiError::BadRequest("request text is empty".into()));
    }

    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let report = state.orchestrator.run(req, cancel).await;
    let _ = guard.disarm();

    Ok((outcome_status(&report.outcome), Json(report)))
}
