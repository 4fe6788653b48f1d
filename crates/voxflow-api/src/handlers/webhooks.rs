//! Provider webhook ingestion.
//!
//! The provider retries deliveries on any non-2xx response, so after
//! authentication this endpoint always acknowledges: a malformed payload or
//! an unknown job will not parse better on the fifth redelivery, and the
//! poll channel covers every live job regardless.

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;
use tracing::warn;

use voxflow_jobs::{WebhookEvent, WebhookOutcome};

use crate::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub struct WebhookParams {
    pub token: Option<String>,
    #[serde(rename = "jobId")]
    pub job_id: Option<String>,
}

/// Receive an ASR provider notification.
///
/// # Returns
/// - 401 Unauthorized if a webhook token is configured and not echoed
/// - 200 OK otherwise, with `{"ok": ...}` describing what happened
pub async fn asr_webhook(
    State(state): State<AppState>,
    Query(params): Query<WebhookParams>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, ApiError> {
    if let Some(ref expected) = state.webhook_token {
        if params.token.as_deref() != Some(expected.as_str()) {
            return Err(ApiError::Unauthorized("Invalid webhook token".to_string()));
        }
    }

    let event = match WebhookEvent::parse(params.job_id.as_deref(), &body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Unparseable webhook payload acknowledged");
            return Ok(Json(serde_json::json!({
                "ok": false,
                "error": e.to_string(),
            })));
        }
    };

    match state.service.handle_webhook(event).await {
        Ok(WebhookOutcome::Applied(status)) => Ok(Json(serde_json::json!({
            "ok": true,
            "status": status.as_str(),
        }))),
        Ok(WebhookOutcome::UnknownJob) => Ok(Json(serde_json::json!({
            "ok": true,
            "status": "unknown-job",
        }))),
        Err(e) => {
            warn!(error = %e, "Webhook reconciliation failed, acknowledged anyway");
            Ok(Json(serde_json::json!({
                "ok": false,
                "error": e.to_string(),
            })))
        }
    }
}
