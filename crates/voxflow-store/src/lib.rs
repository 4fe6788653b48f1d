//! # voxflow-store
//!
//! Implementations of the `JobStore` and `BlobStore` collaborator contracts:
//! a PostgreSQL job record store, a filesystem blob store with atomic
//! writes, and in-memory variants backing tests and local development.

pub mod blob_fs;
pub mod blob_memory;
pub mod jobs_memory;
pub mod jobs_pg;

pub use blob_fs::FilesystemBlobStore;
pub use blob_memory::MemoryBlobStore;
pub use jobs_memory::MemoryJobStore;
pub use jobs_pg::PgJobStore;
