//! # voxflow-api
//!
//! HTTP surface for the transcription job lifecycle. Handlers are thin:
//! every operation delegates to [`TranscriptionService`] and maps its
//! errors onto HTTP statuses here.

pub mod handlers;

use std::sync::Arc;

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use voxflow_jobs::TranscriptionService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TranscriptionService>,
    /// Shared secret the provider must echo in the webhook `token` query
    /// parameter. `None` disables webhook authentication.
    pub webhook_token: Option<String>,
}

impl AppState {
    pub fn new(service: Arc<TranscriptionService>, webhook_token: Option<String>) -> Self {
        Self {
            service,
            webhook_token,
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/v1/jobs",
            post(handlers::jobs::create_job).get(handlers::jobs::list_jobs),
        )
        .route(
            "/api/v1/jobs/:id",
            get(handlers::jobs::get_job).delete(handlers::jobs::delete_job),
        )
        .route("/api/v1/jobs/:id/submit", post(handlers::jobs::resubmit_job))
        .route("/api/v1/jobs/:id/retry", post(handlers::jobs::retry_job))
        .route(
            "/api/v1/jobs/:id/reset-retries",
            post(handlers::jobs::reset_retries),
        )
        .route("/api/v1/jobs/:id/poll", post(handlers::jobs::poll_job))
        .route(
            "/api/v1/jobs/:id/force-complete",
            post(handlers::jobs::force_complete_job),
        )
        .route("/api/v1/webhooks/asr", post(handlers::webhooks::asr_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[derive(Debug)]
pub enum ApiError {
    Internal(voxflow_core::Error),
    Unauthorized(String),
    NotFound(String),
    BadRequest(String),
    Conflict(String),
}

impl From<voxflow_core::Error> for ApiError {
    fn from(err: voxflow_core::Error) -> Self {
        use voxflow_core::Error;
        match err {
            Error::NotFound(msg) => ApiError::NotFound(msg),
            Error::JobNotFound(id) => ApiError::NotFound(format!("Job not found: {}", id)),
            Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            Error::Conflict(msg) => ApiError::Conflict(msg),
            Error::Unauthorized(msg) => ApiError::Unauthorized(msg),
            // Both are actionable client-side: resubmit or reset the budget.
            err @ (Error::ResubmissionRequired | Error::RetriesExhausted(_)) => {
                ApiError::Conflict(err.to_string())
            }
            err => ApiError::Internal(err),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            ApiError::Internal(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
        };

        let body = Json(serde_json::json!({
            "error": message,
        }));

        (status, body).into_response()
    }
}
