//! Error types for voxflow.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using voxflow's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for voxflow operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Provider rejected the initial submit call (bad audio, bad config, auth).
    /// Not retried automatically.
    #[error("Submission failed: {0}")]
    Submission(String),

    /// Exceeded the bounded polling attempts without a terminal provider state.
    #[error("Polling timed out after {attempts} attempts")]
    PollTimeout { attempts: u32 },

    /// Provider explicitly reported the job as rejected.
    #[error("Provider rejected job: {0}")]
    ProviderRejected(String),

    /// Provider reported done but transcript retrieval failed. The provider-side
    /// job may still exist; a fetch-only re-check is possible without resubmission.
    #[error("Transcript fetch failed: {0}")]
    TranscriptFetch(String),

    /// Retry requested but no provider job handle exists; the original audio
    /// must be re-uploaded.
    #[error("Resubmission required: job was never accepted by the provider, re-upload the audio")]
    ResubmissionRequired,

    /// Retry budget exhausted; retry_count must be reset explicitly.
    #[error("Maximum retries exceeded ({0})")]
    RetriesExhausted(i32),

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Job not found
    #[error("Job not found: {0}")]
    JobNotFound(Uuid),

    /// Conditional update lost to a concurrent writer
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Blob storage operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Authentication/authorization failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
