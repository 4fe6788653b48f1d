//! # voxflow-jobs
//!
//! The transcription job lifecycle core: submit audio to the ASR provider,
//! reconcile provider state through webhook and polling channels, rebuild
//! speaker-attributed sentence segments from token-level output, and route
//! oversized payloads to blob storage.
//!
//! All components are plain structs holding their collaborators behind
//! `Arc<dyn ...>` seams; there is no process-global state. The only mutable
//! shared resource is the active-poller registry owned by [`Poller`].

pub mod payload;
pub mod poller;
pub mod reconciler;
pub mod retry;
pub mod segmenter;
pub mod service;
pub mod webhook;

pub use payload::{route_payload, transcript_blob_path, StoredTranscript};
pub use poller::{Poller, PollerConfig};
pub use reconciler::{ProviderEvent, Reconciler};
pub use retry::{classify_retry, RetryDecision, RetryManager};
pub use segmenter::build_segments;
pub use service::{ServiceConfig, TranscriptionService};
pub use webhook::{WebhookEvent, WebhookOutcome};
