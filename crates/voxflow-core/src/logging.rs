//! Structured logging field name constants for voxflow.
//!
//! All crates use these constants for consistent structured logging fields,
//! so log aggregation tools can query by standardized names across every
//! subsystem.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | Degraded service, requires operator attention |
//! | WARN  | Recoverable issue, automatic fallback applied |
//! | INFO  | Lifecycle events (submission, completion), operation completions |
//! | DEBUG | Decision points, intermediate values, config choices |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "store", "asr", "jobs"
pub const SUBSYSTEM: &str = "subsystem";

/// Logical operation name.
/// Examples: "submit", "reconcile", "poll", "offload"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Job UUID being operated on.
pub const JOB_ID: &str = "job_id";

/// Correlation handle assigned by the ASR provider.
pub const PROVIDER_JOB_ID: &str = "provider_job_id";

/// Job status enum variant.
pub const JOB_STATUS: &str = "job_status";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Poll attempt number within a poll loop.
pub const ATTEMPT: &str = "attempt";

/// Number of segments produced by the segment builder.
pub const SEGMENT_COUNT: &str = "segment_count";

/// Serialized payload size in bytes.
pub const PAYLOAD_BYTES: &str = "payload_bytes";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
