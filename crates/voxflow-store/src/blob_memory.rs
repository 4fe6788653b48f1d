//! In-memory blob store for tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use voxflow_core::{BlobStore, Error, Result};

/// `BlobStore` backed by a `HashMap`. Tracks put calls so tests can assert
/// at-most-once offload behavior.
#[derive(Default)]
pub struct MemoryBlobStore {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
    put_calls: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of put calls made against this store.
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    /// Number of distinct stored paths.
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, path: &str, data: &[u8], _content_type: &str) -> Result<String> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.blobs
            .write()
            .await
            .insert(path.to_string(), data.to_vec());
        Ok(format!("mem://{}", path))
    }

    async fn get(&self, path: &str) -> Result<Vec<u8>> {
        self.blobs
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("blob: {}", path)))
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.blobs.write().await.remove(path);
        Ok(())
    }

    async fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.blobs.read().await.contains_key(path))
    }
}
