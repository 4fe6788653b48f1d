//! Status reconciler: the state-machine core.
//!
//! Webhook ingestion and the poller both normalize what they observed into a
//! [`ProviderEvent`] and hand it to [`Reconciler::apply`], so the transition
//! and idempotency logic lives in exactly one place. Every status write is a
//! compare-and-set against the status read immediately before it: whichever
//! channel applies the completion first wins, and the loser's write is a
//! logged no-op.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use voxflow_asr::wire::TranscriptBody;
use voxflow_asr::SpeechProvider;
use voxflow_core::{
    BlobStore, Error, Job, JobMode, JobPatch, JobStatus, JobStore, Result, UpdateOutcome,
};

use crate::payload::{route_payload, StoredTranscript};
use crate::segmenter::build_segments;

/// Normalized observation about a remote job, from either channel.
#[derive(Debug)]
pub enum ProviderEvent {
    /// Provider still working; bookkeeping only.
    Running,
    /// Provider finished. `results` carries webhook-inline output when
    /// present; otherwise the reconciler fetches the transcript itself.
    Done { results: Option<TranscriptBody> },
    /// Provider explicitly rejected the job.
    Rejected { reason: Option<String> },
    /// Unrecoverable local error (poll timeout, fetch failure upstream).
    Failure { error: Error },
}

/// Applies exactly one deterministic transition per reconciliation event.
pub struct Reconciler {
    jobs: Arc<dyn JobStore>,
    blobs: Arc<dyn BlobStore>,
    provider: Arc<dyn SpeechProvider>,
    inline_limit: usize,
}

impl Reconciler {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        blobs: Arc<dyn BlobStore>,
        provider: Arc<dyn SpeechProvider>,
        inline_limit: usize,
    ) -> Self {
        Self {
            jobs,
            blobs,
            provider,
            inline_limit,
        }
    }

    /// Apply one event to one job, returning the job's resulting status.
    ///
    /// Local failures (fetch, storage) are recorded on the job record as
    /// `failed` rather than propagated; only store access errors bubble up.
    pub async fn apply(&self, job_id: Uuid, event: ProviderEvent) -> Result<JobStatus> {
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or(Error::JobNotFound(job_id))?;

        if job.status.is_terminal() {
            debug!(
                job_id = %job_id,
                job_status = %job.status,
                ?event,
                "Stale event for terminal job ignored"
            );
            return Ok(job.status);
        }

        match event {
            ProviderEvent::Running => {
                self.jobs
                    .update(job_id, JobPatch::new().last_checked_at(Utc::now()))
                    .await?;
                Ok(job.status)
            }
            ProviderEvent::Done { results } => self.complete(job, results).await,
            ProviderEvent::Rejected { reason } => {
                let message = reason.unwrap_or_else(|| "rejected by provider".to_string());
                self.fail(job, Error::ProviderRejected(message)).await
            }
            ProviderEvent::Failure { error } => self.fail(job, error).await,
        }
    }

    /// Completion path: obtain the token stream, rebuild segments, route the
    /// payload, and flip the job to its mode-dependent terminal status.
    async fn complete(&self, job: Job, results: Option<TranscriptBody>) -> Result<JobStatus> {
        let body = match results {
            Some(body) => body,
            None => {
                let Some(ref external_id) = job.external_job_id else {
                    return self
                        .fail(
                            job,
                            Error::TranscriptFetch(
                                "done reported but no provider job handle exists".to_string(),
                            ),
                        )
                        .await;
                };
                match self.provider.transcript(external_id).await {
                    Ok(body) => body,
                    Err(e) => {
                        // The provider-side job may still exist; poll_once can
                        // retry the fetch without resubmission.
                        return self.fail(job, e).await;
                    }
                }
            }
        };

        let doc = build_segments(&body.results);
        let stored = match route_payload(self.blobs.as_ref(), job.id, &doc, self.inline_limit).await
        {
            Ok(stored) => stored,
            Err(e) => return self.fail(job, e).await,
        };

        let target = match job.mode {
            JobMode::Ai => JobStatus::Complete,
            JobMode::Hybrid | JobMode::Human => JobStatus::PendingReview,
        };

        let now = Utc::now();
        let mut patch = JobPatch::new()
            .status(target)
            .clear_error()
            .completed_at(now)
            .last_checked_at(now);
        patch = match stored {
            StoredTranscript::Inline {
                transcript,
                segments,
            } => patch
                .transcript(transcript)
                .segments(segments)
                .clear_transcript_storage_path(),
            StoredTranscript::Offloaded {
                path,
                segment_count,
                transcript_length,
            } => patch
                .clear_transcript()
                .clear_segments()
                .transcript_storage_path(path)
                .segment_count(segment_count)
                .transcript_length(transcript_length),
        };

        match self.jobs.update_if_status(job.id, job.status, patch).await? {
            UpdateOutcome::Updated => {
                info!(
                    job_id = %job.id,
                    job_status = %target,
                    segment_count = doc.segments.len(),
                    "Transcription completed"
                );
                Ok(target)
            }
            UpdateOutcome::Conflict => self.report_conflict(job.id).await,
            UpdateOutcome::Missing => Err(Error::JobNotFound(job.id)),
        }
    }

    /// Failure path: record the error, stamp `errored_at`, flip to `failed`.
    async fn fail(&self, job: Job, error: Error) -> Result<JobStatus> {
        let message = error.to_string();
        let now = Utc::now();
        let patch = JobPatch::new()
            .status(JobStatus::Failed)
            .error(message.clone())
            .errored_at(now)
            .last_checked_at(now);

        match self.jobs.update_if_status(job.id, job.status, patch).await? {
            UpdateOutcome::Updated => {
                warn!(job_id = %job.id, error = %message, "Job failed");
                Ok(JobStatus::Failed)
            }
            UpdateOutcome::Conflict => self.report_conflict(job.id).await,
            UpdateOutcome::Missing => Err(Error::JobNotFound(job.id)),
        }
    }

    /// A concurrent writer got there first; report what the record now says.
    async fn report_conflict(&self, job_id: Uuid) -> Result<JobStatus> {
        let current = self
            .jobs
            .get(job_id)
            .await?
            .ok_or(Error::JobNotFound(job_id))?;
        debug!(
            job_id = %job_id,
            job_status = %current.status,
            "Transition lost to a concurrent writer; keeping first result"
        );
        Ok(current.status)
    }
}
