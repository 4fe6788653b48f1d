//! # voxflow-asr
//!
//! Thin request/response wrapper around the external speech-recognition
//! provider: submit-job, get-status, get-transcript, delete-job.
//!
//! The `SpeechProvider` trait is the seam the lifecycle core depends on;
//! `HttpSpeechProvider` is the production implementation and
//! `mock::MockSpeechProvider` backs the test suites.

pub mod mock;
pub mod provider;
pub mod wire;

pub use provider::{
    HttpSpeechProvider, ProviderStatus, SpeechProvider, TranscriptFormat, TranscriptionConfig,
};
pub use wire::{RecognitionAlternative, RecognitionResult, TokenKind, TranscriptBody};
