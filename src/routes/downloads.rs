//! Download Routes
//!
//! HTTP endpoints used by the browser extension and desktop agent.
//!
//! Endpoints:
//! - POST /api/downloads/check - Would this download duplicate a known file?
//! - POST /api/downloads/log - Register a download (or get the existing record)
//! - GET /api/downloads/quota/:user_id - Today's quota for a user

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::dedup::{
    DedupError, DuplicateCheckRequest, DuplicateCheckResponse, LogFileRequest, QuotaStatus,
    Registration,
};
use crate::state::AppState;

/// Response header naming the terminal state of a registration
pub const OUTCOME_HEADER: &str = "x-ddas-outcome";

// ============================================================================
// Error Response
// ============================================================================

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for DedupError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "Duplicate detection request failed");
        }

        let body = Json(ErrorResponse {
            error: self.to_string(),
            code: self.code().to_string(),
        });

        (status, body).into_response()
    }
}

fn invalid_body(rejection: JsonRejection) -> DedupError {
    DedupError::InvalidRequest(rejection.body_text())
}

// ============================================================================
// Router
// ============================================================================

/// Create the downloads router
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/check", post(check_duplicate))
        .route("/log", post(log_file))
        .route("/quota/:user_id", get(get_quota))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/downloads/check
///
/// Read-only lookup. A hit is recorded in the blocked-duplicate audit trail.
async fn check_duplicate(
    State(state): State<AppState>,
    payload: Result<Json<DuplicateCheckRequest>, JsonRejection>,
) -> Result<Json<DuplicateCheckResponse>, DedupError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let request = request.normalized()?;
    let response = state.dedup().check_duplicate(&request).await?;
    Ok(Json(response))
}

/// POST /api/downloads/log
///
/// 201 with the new record, 200 with the existing record when the file was
/// already known, 204 when registration could not settle on a record.
async fn log_file(
    State(state): State<AppState>,
    payload: Result<Json<LogFileRequest>, JsonRejection>,
) -> Result<Response, DedupError> {
    let Json(request) = payload.map_err(invalid_body)?;
    let request = request.normalized()?;
    let outcome = state.dedup().log_file(&request).await?;
    let state_name = outcome.state_name();

    let mut response = match outcome {
        Registration::Persisted(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Registration::Failed => StatusCode::NO_CONTENT.into_response(),
        existing => match existing.into_record() {
            Some(record) => (StatusCode::OK, Json(record)).into_response(),
            None => StatusCode::NO_CONTENT.into_response(),
        },
    };

    response
        .headers_mut()
        .insert(OUTCOME_HEADER, HeaderValue::from_static(state_name));
    Ok(response)
}

/// GET /api/downloads/quota/:user_id
async fn get_quota(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<QuotaStatus>, DedupError> {
    let status = state.dedup().quota_status(&user_id).await?;
    Ok(Json(status))
}
