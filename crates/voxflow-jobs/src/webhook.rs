//! Webhook payload parsing.
//!
//! Providers have shipped at least three notification shapes over time:
//! `{"job": {"id", "status"}}`, `{"jobinfo": {"id", "status"}}`, and a flat
//! object carrying `id`/`status`/`results` at the top level. Parsing accepts
//! all of them; a `results` array with no status at all is read as a
//! completed job carrying its transcript inline.

use serde_json::Value;
use tracing::warn;

use voxflow_asr::wire::TranscriptBody;
use voxflow_asr::ProviderStatus;
use voxflow_core::{Error, JobStatus, Result};

/// A provider notification normalized out of whichever payload shape
/// arrived.
#[derive(Debug, Clone)]
pub struct WebhookEvent {
    /// Provider-side job id, from the payload or the `jobId` query
    /// parameter.
    pub provider_job_id: String,
    /// Reported status, when the payload carried a recognizable one.
    pub status: Option<ProviderStatus>,
    /// Inline token-level results, when the payload carried them. Saves a
    /// transcript fetch round-trip.
    pub results: Option<TranscriptBody>,
}

impl WebhookEvent {
    /// Parse a notification body, falling back to `query_job_id` when the
    /// payload itself names no job.
    ///
    /// Unrecognized status strings are dropped with a warning rather than
    /// rejected; the caller re-queries the provider in that case.
    pub fn parse(query_job_id: Option<&str>, body: &Value) -> Result<Self> {
        let envelope = body
            .get("job")
            .or_else(|| body.get("jobinfo"))
            .filter(|v| v.is_object())
            .unwrap_or(body);

        let provider_job_id = envelope
            .get("id")
            .and_then(Value::as_str)
            .or(query_job_id)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                Error::InvalidInput("webhook names no provider job id".to_string())
            })?
            .to_string();

        let status = envelope
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| match ProviderStatus::parse(s) {
                Some(status) => Some(status),
                None => {
                    warn!(
                        provider_job_id = %provider_job_id,
                        status = s,
                        "Webhook carried unknown status string"
                    );
                    None
                }
            });

        let results = body
            .get("results")
            .filter(|v| v.is_array())
            .map(|_| serde_json::from_value::<TranscriptBody>(body.clone()))
            .transpose()
            .map_err(|e| Error::InvalidInput(format!("malformed results array: {}", e)))?;

        // An inline transcript with no explicit status can only mean the
        // job finished.
        let status = match (status, &results) {
            (None, Some(_)) => Some(ProviderStatus::Done),
            (status, _) => status,
        };

        Ok(Self {
            provider_job_id,
            status,
            results,
        })
    }
}

/// What applying a webhook notification did.
#[derive(Debug, Clone, PartialEq)]
pub enum WebhookOutcome {
    /// The notification was reconciled; the job now has this status.
    Applied(JobStatus),
    /// No job record matches the provider job id. Acknowledged and
    /// dropped, the poll channel still covers the job if it exists.
    UnknownJob,
}
