//! PostgreSQL job store implementation.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use voxflow_core::{
    Error, Job, JobMode, JobPatch, JobStatus, JobStore, NewJob, Result, Segment, UpdateOutcome,
};

/// PostgreSQL implementation of `JobStore`.
///
/// Updates run as read-modify-write inside a transaction with
/// `SELECT ... FOR UPDATE`, so `update_if_status` compares the status the
/// row holds at write time, not a stale snapshot.
pub struct PgJobStore {
    pool: PgPool,
}

const SELECT_COLUMNS: &str = "id, status, mode, external_job_id, retry_count, max_retries, \
     language, diarization, transcript, segments, transcript_storage_path, \
     segment_count, transcript_length, error, created_at, submitted_at, \
     completed_at, errored_at, last_checked_at";

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run the schema migrations for this store.
    pub async fn migrate(pool: &PgPool) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(|e| Error::Config(format!("Migration failed: {}", e)))?;
        Ok(())
    }

    fn parse_job_row(row: &sqlx::postgres::PgRow) -> Result<Job> {
        let status_str: String = row.get("status");
        let status = JobStatus::parse(&status_str)
            .ok_or_else(|| Error::Serialization(format!("Unknown job status: {}", status_str)))?;
        let mode_str: String = row.get("mode");
        let mode = JobMode::parse(&mode_str)
            .ok_or_else(|| Error::Serialization(format!("Unknown job mode: {}", mode_str)))?;

        let segments: Option<Vec<Segment>> = row
            .get::<Option<serde_json::Value>, _>("segments")
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| Error::Serialization(format!("Bad segments column: {}", e)))?;

        Ok(Job {
            id: row.get("id"),
            status,
            mode,
            external_job_id: row.get("external_job_id"),
            retry_count: row.get("retry_count"),
            max_retries: row.get("max_retries"),
            language: row.get("language"),
            diarization: row.get("diarization"),
            transcript: row.get("transcript"),
            segments,
            transcript_storage_path: row.get("transcript_storage_path"),
            segment_count: row.get("segment_count"),
            transcript_length: row.get("transcript_length"),
            error: row.get("error"),
            created_at: row.get("created_at"),
            submitted_at: row.get("submitted_at"),
            completed_at: row.get("completed_at"),
            errored_at: row.get("errored_at"),
            last_checked_at: row.get("last_checked_at"),
        })
    }

    async fn fetch_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM transcription_job WHERE id = $1 FOR UPDATE",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_job_row).transpose()
    }

    async fn write_job(tx: &mut Transaction<'_, Postgres>, job: &Job) -> Result<()> {
        let segments_json = job
            .segments
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| Error::Serialization(e.to_string()))?;

        sqlx::query(
            "UPDATE transcription_job SET
                status = $2, external_job_id = $3, retry_count = $4,
                transcript = $5, segments = $6, transcript_storage_path = $7,
                segment_count = $8, transcript_length = $9, error = $10,
                submitted_at = $11, completed_at = $12, errored_at = $13,
                last_checked_at = $14
             WHERE id = $1",
        )
        .bind(job.id)
        .bind(job.status.as_str())
        .bind(&job.external_job_id)
        .bind(job.retry_count)
        .bind(&job.transcript)
        .bind(segments_json)
        .bind(&job.transcript_storage_path)
        .bind(job.segment_count)
        .bind(job.transcript_length)
        .bind(&job.error)
        .bind(job.submitted_at)
        .bind(job.completed_at)
        .bind(job.errored_at)
        .bind(job.last_checked_at)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;

        Ok(())
    }
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn create(&self, new: NewJob) -> Result<Uuid> {
        let id = Uuid::now_v7();
        let job = Job::new_record(id, &new, Utc::now());

        sqlx::query(
            "INSERT INTO transcription_job
                (id, status, mode, retry_count, max_retries, language, diarization, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(job.id)
        .bind(job.status.as_str())
        .bind(job.mode.as_str())
        .bind(job.retry_count)
        .bind(job.max_retries)
        .bind(&job.language)
        .bind(job.diarization)
        .bind(job.created_at)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(id)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM transcription_job WHERE id = $1",
            SELECT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_job_row).transpose()
    }

    async fn find_by_external_id(&self, external_id: &str) -> Result<Option<Job>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM transcription_job WHERE external_job_id = $1",
            SELECT_COLUMNS
        ))
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(Self::parse_job_row).transpose()
    }

    async fn update(&self, id: Uuid, patch: JobPatch) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut job = Self::fetch_for_update(&mut tx, id)
            .await?
            .ok_or(Error::JobNotFound(id))?;
        patch.apply(&mut job);
        Self::write_job(&mut tx, &job).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn update_if_status(
        &self,
        id: Uuid,
        expected: JobStatus,
        patch: JobPatch,
    ) -> Result<UpdateOutcome> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let Some(mut job) = Self::fetch_for_update(&mut tx, id).await? else {
            return Ok(UpdateOutcome::Missing);
        };
        if job.status != expected {
            // Dropping the transaction rolls back; nothing was written.
            return Ok(UpdateOutcome::Conflict);
        }
        patch.apply(&mut job);
        Self::write_job(&mut tx, &job).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(UpdateOutcome::Updated)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM transcription_job WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn list(&self, limit: i64) -> Result<Vec<Job>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM transcription_job ORDER BY created_at DESC LIMIT $1",
            SELECT_COLUMNS
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(Self::parse_job_row).collect()
    }
}
