//! Data model for voxflow jobs and transcripts.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::defaults;

/// Lifecycle status of a transcription job.
///
/// String forms are the kebab-case names stored on job records
/// (`pending-review`, `pending-transcription`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JobStatus {
    /// Created, not yet accepted by the provider.
    Pending,
    /// Accepted by the provider; transcription in flight.
    Processing,
    /// Transcript attached, awaiting human review (hybrid mode).
    PendingReview,
    /// Awaiting a manually submitted transcript (human mode).
    PendingTranscription,
    /// Terminal: transcript stored.
    Complete,
    /// Terminal: last attempt failed, `error` describes why.
    Failed,
}

impl JobStatus {
    /// Terminal statuses are never overwritten by reconciliation events.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Complete | JobStatus::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::PendingReview => "pending-review",
            JobStatus::PendingTranscription => "pending-transcription",
            JobStatus::Complete => "complete",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "pending-review" => Some(JobStatus::PendingReview),
            "pending-transcription" => Some(JobStatus::PendingTranscription),
            "complete" => Some(JobStatus::Complete),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a job reaches its terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobMode {
    /// Fully automatic: provider result is final.
    Ai,
    /// Provider result goes to a human reviewer before completion.
    Hybrid,
    /// Transcript is typed by a human; the ASR pipeline is not the
    /// primary path.
    Human,
}

impl JobMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobMode::Ai => "ai",
            JobMode::Hybrid => "hybrid",
            JobMode::Human => "human",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ai" => Some(JobMode::Ai),
            "hybrid" => Some(JobMode::Hybrid),
            "human" => Some(JobMode::Human),
            _ => None,
        }
    }
}

/// A reconstructed sentence with timing and speaker attribution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// Sentence text, trimmed and non-empty.
    pub text: String,
    /// Speaker label; `"UU"` means unknown, not an error.
    pub speaker: String,
}

/// Final `{transcript, segments}` pair produced by the segment builder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TranscriptDocument {
    pub transcript: String,
    pub segments: Vec<Segment>,
}

/// One transcription job, one per submitted audio file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: Uuid,
    pub status: JobStatus,
    pub mode: JobMode,
    /// Correlation handle assigned by the ASR provider at submission.
    /// Absent until submission succeeds; cleared only on deliberate
    /// resubmission.
    pub external_job_id: Option<String>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub language: String,
    pub diarization: bool,
    /// Inline transcript. Mutually exclusive with `transcript_storage_path`.
    pub transcript: Option<String>,
    /// Inline segments, present only when the payload was stored inline.
    pub segments: Option<Vec<Segment>>,
    /// Blob path of an offloaded payload.
    pub transcript_storage_path: Option<String>,
    /// Segment count recorded when the payload was offloaded.
    pub segment_count: Option<i64>,
    /// Transcript length recorded when the payload was offloaded.
    pub transcript_length: Option<i64>,
    /// Last failure description; cleared on each new attempt.
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub errored_at: Option<DateTime<Utc>>,
    /// May repeat; every other timestamp is monotonically non-decreasing
    /// within a job's lifetime.
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Build a fresh record from creation parameters.
    pub fn new_record(id: Uuid, new: &NewJob, now: DateTime<Utc>) -> Self {
        Self {
            id,
            status: JobStatus::Pending,
            mode: new.mode,
            external_job_id: None,
            retry_count: 0,
            max_retries: new.max_retries,
            language: new.language.clone(),
            diarization: new.diarization,
            transcript: None,
            segments: None,
            transcript_storage_path: None,
            segment_count: None,
            transcript_length: None,
            error: None,
            created_at: now,
            submitted_at: None,
            completed_at: None,
            errored_at: None,
            last_checked_at: None,
        }
    }
}

/// Parameters for creating a new job record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewJob {
    pub mode: JobMode,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub diarization: bool,
    #[serde(default = "default_max_retries")]
    pub max_retries: i32,
}

fn default_language() -> String {
    defaults::DEFAULT_LANGUAGE.to_string()
}

fn default_max_retries() -> i32 {
    defaults::JOB_MAX_RETRIES
}

impl NewJob {
    pub fn new(mode: JobMode) -> Self {
        Self {
            mode,
            language: default_language(),
            diarization: false,
            max_retries: defaults::JOB_MAX_RETRIES,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_diarization(mut self, diarization: bool) -> Self {
        self.diarization = diarization;
        self
    }

    pub fn with_max_retries(mut self, max_retries: i32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(JobStatus::Complete.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(!JobStatus::Pending.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
        assert!(!JobStatus::PendingReview.is_terminal());
        assert!(!JobStatus::PendingTranscription.is_terminal());
    }

    #[test]
    fn test_status_round_trip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::PendingReview,
            JobStatus::PendingTranscription,
            JobStatus::Complete,
            JobStatus::Failed,
        ] {
            assert_eq!(JobStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::parse("bogus"), None);
    }

    #[test]
    fn test_status_serde_kebab_case() {
        let json = serde_json::to_string(&JobStatus::PendingReview).unwrap();
        assert_eq!(json, "\"pending-review\"");
        let back: JobStatus = serde_json::from_str("\"pending-transcription\"").unwrap();
        assert_eq!(back, JobStatus::PendingTranscription);
    }

    #[test]
    fn test_mode_parse() {
        assert_eq!(JobMode::parse("ai"), Some(JobMode::Ai));
        assert_eq!(JobMode::parse("hybrid"), Some(JobMode::Hybrid));
        assert_eq!(JobMode::parse("human"), Some(JobMode::Human));
        assert_eq!(JobMode::parse("robot"), None);
    }

    #[test]
    fn test_segment_serialization() {
        let segment = Segment {
            start: 0.5,
            end: 2.25,
            text: "Hello world.".to_string(),
            speaker: "S1".to_string(),
        };
        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(json["start"], 0.5);
        assert_eq!(json["end"], 2.25);
        assert_eq!(json["text"], "Hello world.");
        assert_eq!(json["speaker"], "S1");
    }

    #[test]
    fn test_new_job_defaults() {
        let new = NewJob::new(JobMode::Ai);
        assert_eq!(new.language, defaults::DEFAULT_LANGUAGE);
        assert!(!new.diarization);
        assert_eq!(new.max_retries, defaults::JOB_MAX_RETRIES);
    }

    #[test]
    fn test_new_job_builder() {
        let new = NewJob::new(JobMode::Hybrid)
            .with_language("de")
            .with_diarization(true)
            .with_max_retries(5);
        assert_eq!(new.language, "de");
        assert!(new.diarization);
        assert_eq!(new.max_retries, 5);
    }

    #[test]
    fn test_new_job_deserialize_defaults() {
        let new: NewJob = serde_json::from_str(r#"{"mode":"ai"}"#).unwrap();
        assert_eq!(new.mode, JobMode::Ai);
        assert_eq!(new.language, "en");
        assert!(!new.diarization);
    }
}
