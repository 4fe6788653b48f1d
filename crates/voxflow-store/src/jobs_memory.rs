//! In-memory job store for tests and local development.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use voxflow_core::{Error, Job, JobPatch, JobStatus, JobStore, NewJob, Result, UpdateOutcome};

/// `JobStore` backed by a `HashMap` behind an async lock.
///
/// Conditional updates hold the write lock for the whole read-compare-write,
/// giving the same first-writer-wins behavior as the SQL implementation.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: RwLock<HashMap<Uuid, Job>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored jobs.
    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.jobs.read().await.is_empty()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, new: NewJob) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let job = Job::new_record(id, &new, Utc::now());
        self.jobs.write().await.insert(id, job);
        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        Ok(self.jobs.read().await.get(&id).cloned())
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Job>> {
        Ok(self
            .jobs
            .read()
            .await
            .values()
            .find(|j| j.external_job_id.as_deref() == Some(external_id))
            .cloned())
    }

    async fn update(&self, id: Uuid, patch: JobPatch) -> Result<()> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(&id).ok_or(Error::JobNotFound(id))?;
        patch.apply(job);
        Ok(())
    }

    async fn update_if_status(
        &self,
        id: Uuid,
        expected: JobStatus,
        patch: JobPatch,
    ) -> Result<UpdateOutcome> {
        let mut jobs = self.jobs.write().await;
        match jobs.get_mut(&id) {
            None => Ok(UpdateOutcome::Missing),
            Some(job) if job.status != expected => Ok(UpdateOutcome::Conflict),
            Some(job) => {
                patch.apply(job);
                Ok(UpdateOutcome::Updated)
            }
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.jobs.write().await.remove(&id);
        Ok(())
    }

    async fn list(&self, limit: i64) -> Result<Vec<Job>> {
        let jobs = self.jobs.read().await;
        let mut all: Vec<Job> = jobs.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.truncate(limit.max(0) as usize);
        Ok(all)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voxflow_core::JobMode;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryJobStore::new();
        let id = store.create(NewJob::new(JobMode::Ai)).await.unwrap();
        let job = store.get(id).await.unwrap().unwrap();
        assert_eq!(job.id, id);
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.external_job_id.is_none());
    }

    #[tokio::test]
    async fn test_find_by_external_id() {
        let store = MemoryJobStore::new();
        let id = store.create(NewJob::new(JobMode::Ai)).await.unwrap();
        store
            .update(id, JobPatch::new().external_job_id("prov-7"))
            .await
            .unwrap();

        let found = store.find_by_external_id("prov-7").await.unwrap().unwrap();
        assert_eq!(found.id, id);
        assert!(store.find_by_external_id("prov-8").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_conditional_update_matches() {
        let store = MemoryJobStore::new();
        let id = store.create(NewJob::new(JobMode::Ai)).await.unwrap();

        let outcome = store
            .update_if_status(
                id,
                JobStatus::Pending,
                JobPatch::new().status(JobStatus::Processing),
            )
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Updated);
        assert_eq!(
            store.get(id).await.unwrap().unwrap().status,
            JobStatus::Processing
        );
    }

    #[tokio::test]
    async fn test_conditional_update_conflict_writes_nothing() {
        let store = MemoryJobStore::new();
        let id = store.create(NewJob::new(JobMode::Ai)).await.unwrap();

        let outcome = store
            .update_if_status(
                id,
                JobStatus::Processing,
                JobPatch::new().status(JobStatus::Complete).transcript("x"),
            )
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Conflict);

        let job = store.get(id).await.unwrap().unwrap();
        assert_eq!(job.status, JobStatus::Pending);
        assert!(job.transcript.is_none());
    }

    #[tokio::test]
    async fn test_conditional_update_missing() {
        let store = MemoryJobStore::new();
        let outcome = store
            .update_if_status(
                Uuid::now_v7(),
                JobStatus::Pending,
                JobPatch::new().status(JobStatus::Processing),
            )
            .await
            .unwrap();
        assert_eq!(outcome, UpdateOutcome::Missing);
    }

    #[tokio::test]
    async fn test_delete_and_list() {
        let store = MemoryJobStore::new();
        let a = store.create(NewJob::new(JobMode::Ai)).await.unwrap();
        let _b = store.create(NewJob::new(JobMode::Hybrid)).await.unwrap();
        assert_eq!(store.list(10).await.unwrap().len(), 2);

        store.delete(a).await.unwrap();
        assert_eq!(store.list(10).await.unwrap().len(), 1);
        assert!(store.get(a).await.unwrap().is_none());
    }
}
