//! Retry classification and the bounded retry budget.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use voxflow_core::{Error, Job, JobPatch, JobStatus, JobStore, Result, UpdateOutcome};

use crate::poller::Poller;

/// What a failed job is allowed to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Budget remains and a provider handle exists; re-enter polling.
    Retry,
    /// No provider handle survives, so there is nothing to re-check; the
    /// audio must be submitted again.
    NeedsResubmission,
    /// The retry budget is spent.
    Exhausted,
}

/// Classify a job for retry. Pure; the caller decides what to do with the
/// answer.
///
/// A missing provider handle dominates the budget check: re-polling a job
/// the provider never acknowledged would spin forever.
pub fn classify_retry(job: &Job) -> RetryDecision {
    if job.external_job_id.is_none() {
        return RetryDecision::NeedsResubmission;
    }
    if job.retry_count >= job.max_retries {
        return RetryDecision::Exhausted;
    }
    RetryDecision::Retry
}

/// Drives failed jobs back into the polling loop, within budget.
pub struct RetryManager {
    jobs: Arc<dyn JobStore>,
    poller: Arc<Poller>,
}

impl RetryManager {
    pub fn new(jobs: Arc<dyn JobStore>, poller: Arc<Poller>) -> Self {
        Self { jobs, poller }
    }

    /// Retry a failed job: consume one budget unit, move it back to
    /// `processing`, and restart its poll loop.
    ///
    /// Only `failed` jobs are eligible; everything else is a conflict. No
    /// provider call is made when classification refuses the retry.
    pub async fn retry(&self, job_id: Uuid) -> Result<Job> {
        let job = self
            .jobs
            .get(job_id)
            .await?
            .ok_or(Error::JobNotFound(job_id))?;

        if job.status != JobStatus::Failed {
            return Err(Error::Conflict(format!(
                "job {} is {}, only failed jobs can be retried",
                job_id, job.status
            )));
        }

        match classify_retry(&job) {
            RetryDecision::NeedsResubmission => {
                warn!(job_id = %job_id, "Retry refused, no provider handle");
                return Err(Error::ResubmissionRequired);
            }
            RetryDecision::Exhausted => {
                warn!(
                    job_id = %job_id,
                    retry_count = job.retry_count,
                    max_retries = job.max_retries,
                    "Retry refused, budget exhausted"
                );
                return Err(Error::RetriesExhausted(job.max_retries));
            }
            RetryDecision::Retry => {}
        }

        let patch = JobPatch::new()
            .status(JobStatus::Processing)
            .retry_count(job.retry_count + 1)
            .clear_error()
            .last_checked_at(Utc::now());

        match self
            .jobs
            .update_if_status(job_id, JobStatus::Failed, patch)
            .await?
        {
            UpdateOutcome::Updated => {}
            UpdateOutcome::Conflict => {
                let current = self
                    .jobs
                    .get(job_id)
                    .await?
                    .ok_or(Error::JobNotFound(job_id))?;
                return Err(Error::Conflict(format!(
                    "job {} changed to {} while retrying",
                    job_id, current.status
                )));
            }
            UpdateOutcome::Missing => return Err(Error::JobNotFound(job_id)),
        }

        let external_id = job
            .external_job_id
            .clone()
            .ok_or(Error::ResubmissionRequired)?;
        self.poller.spawn(job_id, external_id).await;

        info!(
            job_id = %job_id,
            attempt = job.retry_count + 1,
            max_retries = job.max_retries,
            "Job retry started"
        );
        self.jobs
            .get(job_id)
            .await?
            .ok_or(Error::JobNotFound(job_id))
    }

    /// Reset the retry budget, for operator intervention on a job that
    /// exhausted it for a since-fixed reason.
    pub async fn reset_retries(&self, job_id: Uuid) -> Result<Job> {
        self.jobs
            .update(job_id, JobPatch::new().retry_count(0))
            .await?;
        info!(job_id = %job_id, "Retry budget reset");
        self.jobs
            .get(job_id)
            .await?
            .ok_or(Error::JobNotFound(job_id))
    }
}
