//! Filesystem blob store with atomic writes.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

use voxflow_core::{BlobStore, Error, Result};

/// Filesystem implementation of `BlobStore`.
///
/// Writes go to a temp file followed by a rename, so a crash mid-write never
/// leaves a truncated object at the final path. Writing the same path twice
/// overwrites, which keeps duplicate offload attempts at-most-once in effect.
pub struct FilesystemBlobStore {
    base_path: PathBuf,
}

impl FilesystemBlobStore {
    /// Create a new store rooted at the given base directory.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }

    /// Validate that the store can write, read, and delete files.
    ///
    /// Performs a full round-trip at startup to catch filesystem issues
    /// (permission errors, missing directories) early.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.base_path.join(".health-check");
        let test_file = test_dir.join("test.bin");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"storage-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await; // Best-effort cleanup

        Ok(())
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, path: &str, data: &[u8], content_type: &str) -> Result<String> {
        let full_path = self.full_path(path);
        debug!(
            blob_path = %path,
            size = data.len(),
            content_type,
            "blob_store: put"
        );

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "blob_store: create_dir_all failed");
                Error::Storage(e.to_string())
            })?;
        }

        // Atomic write: temp file + rename
        let temp_path = full_path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)
            .await
            .map_err(|e| Error::Storage(format!("create({:?}): {}", temp_path, e)))?;
        file.write_all(data)
            .await
            .map_err(|e| Error::Storage(format!("write: {}", e)))?;
        file.sync_all()
            .await
            .map_err(|e| Error::Storage(format!("sync: {}", e)))?;
        drop(file);

        fs::rename(&temp_path, &full_path)
            .await
            .map_err(|e| Error::Storage(format!("rename to {:?}: {}", full_path, e)))?;

        Ok(format!("file://{}", full_path.display()))
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.full_path(path);
        fs::read(&full_path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(format!("blob: {}", path))
            } else {
                Error::Storage(format!("read({:?}): {}", full_path, e))
            }
        })
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full_path = self.full_path(path);
        match fs::remove_file(&full_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Storage(format!("remove({:?}): {}", full_path, e))),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(fs::try_exists(self.full_path(path))
            .await
            .unwrap_or(false))
    }
}
