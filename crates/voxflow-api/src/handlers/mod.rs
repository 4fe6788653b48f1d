//! HTTP handlers.

pub mod jobs;
pub mod webhooks;

use axum::Json;

/// Liveness probe.
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
