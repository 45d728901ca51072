use axum::{extract::State, Extension, Json};
use serde::Serialize;

use crate::middleware::RequestId;

use super::{map_db_error, ApiError, AppState, IngestMode};

#[derive(Debug, Serialize)]
pub(super) struct IngestResponse {
    status: &'static str,
    persisted: usize,
    duplicates: usize,
    errors: usize,
}

/// Runs one ingest pass immediately and waits for it to finish.
pub(super) async fn trigger_ingest(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<IngestResponse>, ApiError> {
    let ingestor = match &state.ingest {
        IngestMode::NoDatabase => {
            return Err(ApiError::new(
                req_id.0,
                "service_unavailable",
                "database not configured",
            ))
        }
        IngestMode::Disabled => {
            return Err(ApiError::new(
                req_id.0,
                "service_unavailable",
                "scheduler is disabled",
            ))
        }
        IngestMode::Enabled(ingestor) => ingestor,
    };

    tracing::info!(request_id = %req_id.0, "manual ingest requested");
    let summary = ingestor
        .run_once()
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    Ok(Json(IngestResponse {
        status: "completed",
        persisted: summary.persisted_count,
        duplicates: summary.duplicate_count,
        errors: summary.error_count,
    }))
}
