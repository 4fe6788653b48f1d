//! Centralized default constants for the voxflow system.
//!
//! **This module is the single source of truth** for all shared default
//! values. All crates should reference these constants instead of defining
//! their own magic numbers.

// =============================================================================
// POLLING
// =============================================================================

/// Seconds to sleep between provider status checks.
pub const POLL_INTERVAL_SECS: u64 = 5;

/// Maximum status checks before a job is failed with a timeout.
/// 120 checks at 5s intervals gives a ~10 minute ceiling.
pub const POLL_MAX_ATTEMPTS: u32 = 120;

// =============================================================================
// PAYLOAD ROUTING
// =============================================================================

/// Largest serialized `{transcript, segments}` payload stored inline on the
/// job record, in bytes. Chosen to stay safely under the document store's
/// 1 MB per-record limit; anything larger is offloaded to blob storage.
pub const INLINE_PAYLOAD_LIMIT_BYTES: usize = 900_000;

/// Content type used for offloaded transcript blobs.
pub const TRANSCRIPT_CONTENT_TYPE: &str = "application/json";

// =============================================================================
// RETRY
// =============================================================================

/// Default retry budget for a job.
pub const JOB_MAX_RETRIES: i32 = 3;

// =============================================================================
// TRANSCRIPTION
// =============================================================================

/// Speaker label assigned when the provider supplies no speaker field.
pub const UNKNOWN_SPEAKER: &str = "UU";

/// Default transcription language (ISO 639-1).
pub const DEFAULT_LANGUAGE: &str = "en";

// =============================================================================
// SERVER
// =============================================================================

/// Default HTTP server port.
pub const SERVER_PORT: u16 = 3000;

// =============================================================================
// ENVIRONMENT VARIABLES
// =============================================================================

/// Base URL of the ASR provider API.
pub const ENV_ASR_BASE_URL: &str = "ASR_BASE_URL";

/// API key for the ASR provider.
pub const ENV_ASR_API_KEY: &str = "ASR_API_KEY";

/// Shared secret expected on inbound webhook calls.
pub const ENV_WEBHOOK_TOKEN: &str = "WEBHOOK_TOKEN";

/// Root directory for the filesystem blob store.
pub const ENV_BLOB_ROOT: &str = "BLOB_ROOT";
