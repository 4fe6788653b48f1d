//! Per-job supervised polling loop with a duplicate-poller guard.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use voxflow_asr::{ProviderStatus, SpeechProvider};
use voxflow_core::{defaults, Error, JobStatus, Result};

use crate::reconciler::{ProviderEvent, Reconciler};

/// Configuration for the polling loop.
#[derive(Debug, Clone)]
pub struct PollerConfig {
    /// Sleep between provider status checks.
    pub poll_interval: Duration,
    /// Status checks before the job is failed with a timeout.
    pub max_attempts: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(defaults::POLL_INTERVAL_SECS),
            max_attempts: defaults::POLL_MAX_ATTEMPTS,
        }
    }
}

impl PollerConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `POLL_INTERVAL_SECS` | `5` | Seconds between status checks |
    /// | `POLL_MAX_ATTEMPTS` | `120` | Checks before timing out |
    pub fn from_env() -> Self {
        let poll_interval_secs = std::env::var("POLL_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::POLL_INTERVAL_SECS);

        let max_attempts = std::env::var("POLL_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .unwrap_or(defaults::POLL_MAX_ATTEMPTS)
            .max(1);

        Self {
            poll_interval: Duration::from_secs(poll_interval_secs),
            max_attempts,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }
}

/// Spawns and supervises one polling task per in-flight job.
///
/// The registry of actively polled job ids is the only mutable shared state
/// in the system; it guarantees at most one loop per job.
pub struct Poller {
    provider: Arc<dyn SpeechProvider>,
    reconciler: Arc<Reconciler>,
    config: PollerConfig,
    active: Arc<Mutex<HashSet<Uuid>>>,
}

impl Poller {
    pub fn new(
        provider: Arc<dyn SpeechProvider>,
        reconciler: Arc<Reconciler>,
        config: PollerConfig,
    ) -> Self {
        Self {
            provider,
            reconciler,
            config,
            active: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Whether a poll loop is currently registered for this job.
    pub async fn is_active(&self, job_id: Uuid) -> bool {
        self.active.lock().await.contains(&job_id)
    }

    /// Number of currently registered poll loops.
    pub async fn active_count(&self) -> usize {
        self.active.lock().await.len()
    }

    /// Start a poll loop for the job unless one is already running.
    ///
    /// Returns `false` when the job is already being polled. The loop
    /// deregisters itself on every exit path (terminal state, timeout).
    pub async fn spawn(&self, job_id: Uuid, provider_job_id: String) -> bool {
        {
            let mut active = self.active.lock().await;
            if !active.insert(job_id) {
                warn!(job_id = %job_id, "Poll loop already active, not starting another");
                return false;
            }
        }

        let provider = self.provider.clone();
        let reconciler = self.reconciler.clone();
        let config = self.config.clone();
        let active = self.active.clone();

        debug!(job_id = %job_id, provider_job_id = %provider_job_id, "Poll loop started");
        tokio::spawn(async move {
            Self::run_loop(provider, reconciler, config, job_id, &provider_job_id).await;
            active.lock().await.remove(&job_id);
        });

        true
    }

    async fn run_loop(
        provider: Arc<dyn SpeechProvider>,
        reconciler: Arc<Reconciler>,
        config: PollerConfig,
        job_id: Uuid,
        provider_job_id: &str,
    ) {
        for attempt in 1..=config.max_attempts {
            sleep(config.poll_interval).await;

            match provider.status(provider_job_id).await {
                Ok(ProviderStatus::Running) => {
                    if let Err(e) = reconciler.apply(job_id, ProviderEvent::Running).await {
                        warn!(job_id = %job_id, error = %e, "Failed to record poll check");
                    }
                }
                Ok(ProviderStatus::Done) => {
                    if let Err(e) = reconciler
                        .apply(job_id, ProviderEvent::Done { results: None })
                        .await
                    {
                        error!(job_id = %job_id, error = %e, "Failed to apply completion");
                    }
                    // Remote cleanup is best-effort and never blocks the result.
                    if let Err(e) = provider.delete(provider_job_id).await {
                        warn!(
                            job_id = %job_id,
                            provider_job_id,
                            error = %e,
                            "Remote job cleanup failed"
                        );
                    }
                    return;
                }
                Ok(ProviderStatus::Rejected) => {
                    if let Err(e) = reconciler
                        .apply(job_id, ProviderEvent::Rejected { reason: None })
                        .await
                    {
                        error!(job_id = %job_id, error = %e, "Failed to apply rejection");
                    }
                    return;
                }
                Err(e) => {
                    // Transient query failure consumes an attempt but does
                    // not fail the job by itself.
                    warn!(job_id = %job_id, attempt, error = %e, "Status check failed");
                }
            }
        }

        info!(
            job_id = %job_id,
            attempts = config.max_attempts,
            "Poll budget exhausted, failing job"
        );
        if let Err(e) = reconciler
            .apply(
                job_id,
                ProviderEvent::Failure {
                    error: Error::PollTimeout {
                        attempts: config.max_attempts,
                    },
                },
            )
            .await
        {
            error!(job_id = %job_id, error = %e, "Failed to record poll timeout");
        }
    }

    /// One manual status check outside any loop, for re-checking a job
    /// stuck in `processing` (crash between fetch and record write).
    pub async fn poll_once(&self, job_id: Uuid, provider_job_id: &str) -> Result<JobStatus> {
        let event = match self.provider.status(provider_job_id).await? {
            ProviderStatus::Running => ProviderEvent::Running,
            ProviderStatus::Done => ProviderEvent::Done { results: None },
            ProviderStatus::Rejected => ProviderEvent::Rejected { reason: None },
        };
        self.reconciler.apply(job_id, event).await
    }
}
