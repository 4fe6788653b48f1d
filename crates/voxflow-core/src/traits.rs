//! Collaborator traits consumed by the lifecycle core.
//!
//! The job record store and blob store are external services; the core only
//! sees these narrow contracts. Production implementations live in
//! `voxflow-store`, in-memory ones back the test suites.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{Job, JobStatus, NewJob, Segment};
use crate::Result;

/// Partial update applied to a job record.
///
/// Two layers of `Option`: the outer layer means "touch this field at all",
/// the inner one carries the new value, where `None` clears the field.
#[derive(Debug, Default, Clone)]
pub struct JobPatch {
    pub status: Option<JobStatus>,
    pub external_job_id: Option<Option<String>>,
    pub retry_count: Option<i32>,
    pub transcript: Option<Option<String>>,
    pub segments: Option<Option<Vec<Segment>>>,
    pub transcript_storage_path: Option<Option<String>>,
    pub segment_count: Option<Option<i64>>,
    pub transcript_length: Option<Option<i64>>,
    pub error: Option<Option<String>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub errored_at: Option<DateTime<Utc>>,
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl JobPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(mut self, status: JobStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn external_job_id(mut self, id: impl Into<String>) -> Self {
        self.external_job_id = Some(Some(id.into()));
        self
    }

    pub fn clear_external_job_id(mut self) -> Self {
        self.external_job_id = Some(None);
        self
    }

    pub fn retry_count(mut self, count: i32) -> Self {
        self.retry_count = Some(count);
        self
    }

    pub fn transcript(mut self, transcript: impl Into<String>) -> Self {
        self.transcript = Some(Some(transcript.into()));
        self
    }

    pub fn clear_transcript(mut self) -> Self {
        self.transcript = Some(None);
        self
    }

    pub fn segments(mut self, segments: Vec<Segment>) -> Self {
        self.segments = Some(Some(segments));
        self
    }

    pub fn clear_segments(mut self) -> Self {
        self.segments = Some(None);
        self
    }

    pub fn transcript_storage_path(mut self, path: impl Into<String>) -> Self {
        self.transcript_storage_path = Some(Some(path.into()));
        self
    }

    pub fn clear_transcript_storage_path(mut self) -> Self {
        self.transcript_storage_path = Some(None);
        self
    }

    pub fn segment_count(mut self, count: i64) -> Self {
        self.segment_count = Some(Some(count));
        self
    }

    pub fn transcript_length(mut self, length: i64) -> Self {
        self.transcript_length = Some(Some(length));
        self
    }

    pub fn error(mut self, message: impl Into<String>) -> Self {
        self.error = Some(Some(message.into()));
        self
    }

    pub fn clear_error(mut self) -> Self {
        self.error = Some(None);
        self
    }

    pub fn submitted_at(mut self, at: DateTime<Utc>) -> Self {
        self.submitted_at = Some(at);
        self
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed_at = Some(at);
        self
    }

    pub fn errored_at(mut self, at: DateTime<Utc>) -> Self {
        self.errored_at = Some(at);
        self
    }

    pub fn last_checked_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_checked_at = Some(at);
        self
    }

    /// Apply this patch to a job in place.
    ///
    /// Shared by the in-memory store and the read-modify-write path of the
    /// Postgres store so both interpret patches identically.
    pub fn apply(&self, job: &mut Job) {
        if let Some(status) = self.status {
            job.status = status;
        }
        if let Some(ref v) = self.external_job_id {
            job.external_job_id = v.clone();
        }
        if let Some(count) = self.retry_count {
            job.retry_count = count;
        }
        if let Some(ref v) = self.transcript {
            job.transcript = v.clone();
        }
        if let Some(ref v) = self.segments {
            job.segments = v.clone();
        }
        if let Some(ref v) = self.transcript_storage_path {
            job.transcript_storage_path = v.clone();
        }
        if let Some(ref v) = self.segment_count {
            job.segment_count = *v;
        }
        if let Some(ref v) = self.transcript_length {
            job.transcript_length = *v;
        }
        if let Some(ref v) = self.error {
            job.error = v.clone();
        }
        if let Some(at) = self.submitted_at {
            job.submitted_at = Some(at);
        }
        if let Some(at) = self.completed_at {
            job.completed_at = Some(at);
        }
        if let Some(at) = self.errored_at {
            job.errored_at = Some(at);
        }
        if let Some(at) = self.last_checked_at {
            job.last_checked_at = Some(at);
        }
    }
}

/// Outcome of a conditional update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The expected status matched and the patch was applied.
    Updated,
    /// The record's current status differed from the expected one;
    /// nothing was written.
    Conflict,
    /// No record with that id exists.
    Missing,
}

/// Durable store holding one record per job.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Create a record and return its id.
    async fn create(&self, new: NewJob) -> Result<Uuid>;

    /// Fetch a job by id.
    async fn get(&self, id: Uuid) -> Result<Option<Job>>;

    /// Look up a job by the provider-side correlation handle.
    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Job>>;

    /// Unconditional partial update (non-status bookkeeping such as
    /// `last_checked_at`).
    async fn update(&self, id: Uuid, patch: JobPatch) -> Result<()>;

    /// Compare-and-set update: the patch is applied only when the record's
    /// current status equals `expected`. This is the idempotency primitive
    /// closing the webhook/poller race.
    async fn update_if_status(
        &self,
        id: Uuid,
        expected: JobStatus,
        patch: JobPatch,
    ) -> Result<UpdateOutcome>;

    /// Delete a record.
    async fn delete(&self, id: Uuid) -> Result<()>;

    /// List the most recently created jobs.
    async fn list(&self, limit: i64) -> Result<Vec<Job>>;
}

/// Content-addressable object storage for oversized payloads.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Write data at the given path, returning a descriptor for the stored
    /// object. Writing the same path twice overwrites.
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<String>;

    /// Read data at the given path.
    async fn get(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete data at the given path.
    async fn delete(&self, path: &str) -> Result<()>;

    /// Check whether data exists at the given path.
    async fn exists(&self, path: &str) -> Result<bool>;
}
