//! # voxflow-core
//!
//! Core types, traits, and abstractions for the voxflow transcription
//! lifecycle manager.
//!
//! This crate provides the job/segment data model, the error taxonomy, and
//! the collaborator traits (job record store, blob store) that the other
//! voxflow crates depend on.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
