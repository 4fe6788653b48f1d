//! Service facade tying the lifecycle components together.
//!
//! The HTTP layer talks only to [`TranscriptionService`]; the reconciler,
//! poller, and retry manager are wired up here and never exposed
//! individually.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use voxflow_asr::{ProviderStatus, SpeechProvider, TranscriptionConfig};
use voxflow_core::{
    defaults, BlobStore, Error, Job, JobPatch, JobStatus, JobStore, NewJob, Result, UpdateOutcome,
};

use crate::poller::{Poller, PollerConfig};
use crate::reconciler::{ProviderEvent, Reconciler};
use crate::retry::RetryManager;
use crate::webhook::{WebhookEvent, WebhookOutcome};

/// Configuration for the lifecycle service.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Serialized payloads larger than this go to blob storage.
    pub inline_payload_limit: usize,
    pub poller: PollerConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            inline_payload_limit: defaults::INLINE_PAYLOAD_LIMIT_BYTES,
            poller: PollerConfig::default(),
        }
    }
}

impl ServiceConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `INLINE_PAYLOAD_LIMIT_BYTES` | `900000` | Inline storage cutoff |
    ///
    /// Poller variables are read by [`PollerConfig::from_env`].
    pub fn from_env() -> Self {
        let inline_payload_limit = std::env::var("INLINE_PAYLOAD_LIMIT_BYTES")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(defaults::INLINE_PAYLOAD_LIMIT_BYTES);

        Self {
            inline_payload_limit,
            poller: PollerConfig::from_env(),
        }
    }

    pub fn with_inline_payload_limit(mut self, limit: usize) -> Self {
        self.inline_payload_limit = limit;
        self
    }

    pub fn with_poller(mut self, poller: PollerConfig) -> Self {
        self.poller = poller;
        self
    }
}

/// The transcription job lifecycle, end to end: create, submit, reconcile,
/// retry, inspect.
pub struct TranscriptionService {
    jobs: Arc<dyn JobStore>,
    provider: Arc<dyn SpeechProvider>,
    reconciler: Arc<Reconciler>,
    poller: Arc<Poller>,
    retries: RetryManager,
}

impl TranscriptionService {
    pub fn new(
        jobs: Arc<dyn JobStore>,
        blobs: Arc<dyn BlobStore>,
        provider: Arc<dyn SpeechProvider>,
        config: ServiceConfig,
    ) -> Self {
        let reconciler = Arc::new(Reconciler::new(
            jobs.clone(),
            blobs,
            provider.clone(),
            config.inline_payload_limit,
        ));
        let poller = Arc::new(Poller::new(
            provider.clone(),
            reconciler.clone(),
            config.poller,
        ));
        let retries = RetryManager::new(jobs.clone(), poller.clone());
        Self {
            jobs,
            provider,
            reconciler,
            poller,
            retries,
        }
    }

    /// Create a job record in `pending`.
    pub async fn create_job(&self, new: NewJob) -> Result<Job> {
        let id = self.jobs.create(new).await?;
        info!(job_id = %id, "Job created");
        self.get_job(id).await
    }

    /// Submit a pending job's audio to the provider and start polling.
    ///
    /// A submission failure is recorded on the job as `failed` with no
    /// provider handle, which routes any retry to resubmission.
    pub async fn submit(&self, job_id: Uuid, audio: &[u8], filename: &str) -> Result<Job> {
        if audio.is_empty() {
            return Err(Error::InvalidInput("audio payload is empty".to_string()));
        }

        let job = self.get_job(job_id).await?;
        if job.status != JobStatus::Pending {
            return Err(Error::Conflict(format!(
                "job {} is {}, only pending jobs can be submitted",
                job_id, job.status
            )));
        }

        let config =
            TranscriptionConfig::new(job.language.clone()).with_diarization(job.diarization);

        let external_id = match self.provider.submit(audio, filename, &config).await {
            Ok(id) => id,
            Err(e) => {
                let message = e.to_string();
                let now = Utc::now();
                // No handle is recorded, so retry classification demands
                // resubmission rather than re-polling nothing.
                self.jobs
                    .update_if_status(
                        job_id,
                        JobStatus::Pending,
                        JobPatch::new()
                            .status(JobStatus::Failed)
                            .error(message.clone())
                            .errored_at(now),
                    )
                    .await?;
                warn!(job_id = %job_id, error = %message, "Submission failed");
                return Err(e);
            }
        };

        let outcome = self
            .jobs
            .update_if_status(
                job_id,
                JobStatus::Pending,
                JobPatch::new()
                    .status(JobStatus::Processing)
                    .external_job_id(external_id.clone())
                    .submitted_at(Utc::now())
                    .clear_error(),
            )
            .await?;
        match outcome {
            UpdateOutcome::Updated => {}
            UpdateOutcome::Conflict => {
                return Err(Error::Conflict(format!(
                    "job {} changed state during submission",
                    job_id
                )));
            }
            UpdateOutcome::Missing => return Err(Error::JobNotFound(job_id)),
        }

        self.poller.spawn(job_id, external_id.clone()).await;
        info!(
            job_id = %job_id,
            provider_job_id = %external_id,
            "Job submitted"
        );
        self.get_job(job_id).await
    }

    /// Resubmit a failed job with fresh audio.
    ///
    /// Clears the stale provider handle and any partial result, returns the
    /// job to `pending`, and runs the normal submission path.
    pub async fn resubmit(&self, job_id: Uuid, audio: &[u8], filename: &str) -> Result<Job> {
        let job = self.get_job(job_id).await?;
        if job.status != JobStatus::Failed {
            return Err(Error::Conflict(format!(
                "job {} is {}, only failed jobs can be resubmitted",
                job_id, job.status
            )));
        }

        let outcome = self
            .jobs
            .update_if_status(
                job_id,
                JobStatus::Failed,
                JobPatch::new()
                    .status(JobStatus::Pending)
                    .clear_external_job_id()
                    .clear_transcript()
                    .clear_segments()
                    .clear_transcript_storage_path()
                    .clear_error(),
            )
            .await?;
        match outcome {
            UpdateOutcome::Updated => {}
            UpdateOutcome::Conflict => {
                return Err(Error::Conflict(format!(
                    "job {} changed state during resubmission",
                    job_id
                )));
            }
            UpdateOutcome::Missing => return Err(Error::JobNotFound(job_id)),
        }

        self.submit(job_id, audio, filename).await
    }

    /// Apply a provider webhook notification.
    ///
    /// Unknown provider job ids are acknowledged and dropped; the
    /// notification may be a replay for a deleted job, and the poll channel
    /// covers live ones. When the payload carried no recognizable status the
    /// provider is queried once.
    pub async fn handle_webhook(&self, event: WebhookEvent) -> Result<WebhookOutcome> {
        let Some(job) = self
            .jobs
            .find_by_external_id(&event.provider_job_id)
            .await?
        else {
            warn!(
                provider_job_id = %event.provider_job_id,
                "Webhook for unknown provider job id"
            );
            return Ok(WebhookOutcome::UnknownJob);
        };

        let status = match event.status {
            Some(status) => status,
            None => self.provider.status(&event.provider_job_id).await?,
        };

        let provider_event = match status {
            ProviderStatus::Running => ProviderEvent::Running,
            ProviderStatus::Done => ProviderEvent::Done {
                results: event.results,
            },
            ProviderStatus::Rejected => ProviderEvent::Rejected { reason: None },
        };

        let status = self.reconciler.apply(job.id, provider_event).await?;
        Ok(WebhookOutcome::Applied(status))
    }

    /// Manually re-check a job against the provider, outside the poll loop.
    pub async fn poll_job(&self, job_id: Uuid) -> Result<JobStatus> {
        let job = self.get_job(job_id).await?;
        let external_id = job.external_job_id.ok_or(Error::ResubmissionRequired)?;
        self.poller.poll_once(job_id, &external_id).await
    }

    /// Retry a failed job within its budget.
    pub async fn retry(&self, job_id: Uuid) -> Result<Job> {
        self.retries.retry(job_id).await
    }

    /// Reset a job's retry budget.
    pub async fn reset_retries(&self, job_id: Uuid) -> Result<Job> {
        self.retries.reset_retries(job_id).await
    }

    /// Accept a manually written or corrected transcript and complete the
    /// job. Refuses to overwrite an already complete job.
    pub async fn force_complete(&self, job_id: Uuid, transcript: String) -> Result<Job> {
        let job = self.get_job(job_id).await?;
        if job.status == JobStatus::Complete {
            return Err(Error::Conflict(format!(
                "job {} is already complete",
                job_id
            )));
        }

        let outcome = self
            .jobs
            .update_if_status(
                job_id,
                job.status,
                JobPatch::new()
                    .status(JobStatus::Complete)
                    .transcript(transcript)
                    .clear_segments()
                    .clear_transcript_storage_path()
                    .clear_error()
                    .completed_at(Utc::now()),
            )
            .await?;
        match outcome {
            UpdateOutcome::Updated => {
                info!(job_id = %job_id, "Job force-completed");
                self.get_job(job_id).await
            }
            UpdateOutcome::Conflict => Err(Error::Conflict(format!(
                "job {} changed state during completion",
                job_id
            ))),
            UpdateOutcome::Missing => Err(Error::JobNotFound(job_id)),
        }
    }

    /// Delete a job and best-effort clean up its provider-side counterpart.
    pub async fn cancel(&self, job_id: Uuid) -> Result<()> {
        let job = self.get_job(job_id).await?;
        if let Some(ref external_id) = job.external_job_id {
            if let Err(e) = self.provider.delete(external_id).await {
                warn!(
                    job_id = %job_id,
                    provider_job_id = %external_id,
                    error = %e,
                    "Remote job cleanup failed during cancel"
                );
            }
        }
        self.jobs.delete(job_id).await?;
        info!(job_id = %job_id, "Job deleted");
        Ok(())
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Job> {
        self.jobs
            .get(job_id)
            .await?
            .ok_or(Error::JobNotFound(job_id))
    }

    pub async fn list_jobs(&self, limit: i64) -> Result<Vec<Job>> {
        self.jobs.list(limit).await
    }

    /// Whether a poll loop is currently running for the job.
    pub async fn is_polling(&self, job_id: Uuid) -> bool {
        self.poller.is_active(job_id).await
    }
}
