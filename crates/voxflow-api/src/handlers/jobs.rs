//! Job lifecycle HTTP handlers.
//!
//! Jobs are created and submitted in one request: a multipart form carrying
//! the audio file plus optional text fields for mode, language, diarization,
//! and the retry budget.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use voxflow_core::{Job, JobMode, NewJob};

use crate::{ApiError, AppState};

/// One uploaded audio file: bytes plus the client-supplied filename.
struct AudioUpload {
    bytes: Vec<u8>,
    filename: String,
}

/// Creation parameters collected from the non-file multipart fields.
#[derive(Default)]
struct CreateJobFields {
    mode: Option<JobMode>,
    language: Option<String>,
    diarization: Option<bool>,
    max_retries: Option<i32>,
}

impl CreateJobFields {
    fn into_new_job(self) -> NewJob {
        let mut new = NewJob::new(self.mode.unwrap_or(JobMode::Ai));
        if let Some(language) = self.language {
            new = new.with_language(language);
        }
        if let Some(diarization) = self.diarization {
            new = new.with_diarization(diarization);
        }
        if let Some(max_retries) = self.max_retries {
            new = new.with_max_retries(max_retries);
        }
        new
    }
}

fn parse_bool_field(value: &str) -> bool {
    matches!(value, "true" | "1" | "on")
}

/// Read the multipart form, separating the audio file from the text fields.
/// Unknown fields are ignored.
async fn read_upload_form(
    mut multipart: Multipart,
) -> Result<(Option<AudioUpload>, CreateJobFields), ApiError> {
    let mut audio = None;
    let mut fields = CreateJobFields::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "audio" | "data_file" => {
                let filename = field
                    .file_name()
                    .unwrap_or("audio.wav")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read audio: {}", e)))?;
                audio = Some(AudioUpload {
                    bytes: bytes.to_vec(),
                    filename,
                });
            }
            "mode" => {
                let text = read_text_field(field).await?;
                let mode = JobMode::parse(&text)
                    .ok_or_else(|| ApiError::BadRequest(format!("Unknown mode: {}", text)))?;
                fields.mode = Some(mode);
            }
            "language" => {
                fields.language = Some(read_text_field(field).await?);
            }
            "diarization" => {
                let text = read_text_field(field).await?;
                fields.diarization = Some(parse_bool_field(&text));
            }
            "max_retries" => {
                let text = read_text_field(field).await?;
                let parsed = text
                    .parse::<i32>()
                    .map_err(|_| ApiError::BadRequest(format!("Invalid max_retries: {}", text)))?;
                if parsed < 0 {
                    return Err(ApiError::BadRequest(
                        "max_retries must not be negative".to_string(),
                    ));
                }
                fields.max_retries = Some(parsed);
            }
            _ => {}
        }
    }

    Ok((audio, fields))
}

async fn read_text_field(field: axum::extract::multipart::Field<'_>) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read form field: {}", e)))
}

/// Create a job and submit its audio to the provider.
///
/// # Returns
/// - 201 Created with the job record (already `processing` on success)
/// - 400 Bad Request if the form carries no audio or invalid fields
pub async fn create_job(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let (audio, fields) = read_upload_form(multipart).await?;
    let audio = audio.ok_or_else(|| {
        ApiError::BadRequest("Multipart form carries no audio file".to_string())
    })?;

    let job = state.service.create_job(fields.into_new_job()).await?;
    let job = state
        .service
        .submit(job.id, &audio.bytes, &audio.filename)
        .await?;
    Ok((StatusCode::CREATED, Json(job)))
}

/// Resubmit a failed job with fresh audio.
pub async fn resubmit_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> Result<Json<Job>, ApiError> {
    let (audio, _) = read_upload_form(multipart).await?;
    let audio = audio.ok_or_else(|| {
        ApiError::BadRequest("Multipart form carries no audio file".to_string())
    })?;

    let job = state
        .service
        .resubmit(id, &audio.bytes, &audio.filename)
        .await?;
    Ok(Json(job))
}

#[derive(Debug, Deserialize)]
pub struct ListJobsParams {
    pub limit: Option<i64>,
}

/// List the most recently created jobs.
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(params): Query<ListJobsParams>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let limit = params.limit.unwrap_or(50).clamp(1, 500);
    let jobs = state.service.list_jobs(limit).await?;
    Ok(Json(jobs))
}

/// Get a job by id.
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, ApiError> {
    let job = state.service.get_job(id).await?;
    Ok(Json(job))
}

/// Retry a failed job within its budget.
pub async fn retry_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, ApiError> {
    let job = state.service.retry(id).await?;
    Ok(Json(job))
}

/// Reset a job's retry budget.
pub async fn reset_retries(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Job>, ApiError> {
    let job = state.service.reset_retries(id).await?;
    Ok(Json(job))
}

/// Manually re-check a job against the provider.
pub async fn poll_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let status = state.service.poll_job(id).await?;
    Ok(Json(serde_json::json!({ "status": status })))
}

#[derive(Debug, Deserialize)]
pub struct ForceCompleteRequest {
    pub transcript: String,
}

/// Attach a manually written transcript and complete the job.
pub async fn force_complete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<ForceCompleteRequest>,
) -> Result<Json<Job>, ApiError> {
    if request.transcript.trim().is_empty() {
        return Err(ApiError::BadRequest("Transcript is empty".to_string()));
    }
    let job = state.service.force_complete(id, request.transcript).await?;
    Ok(Json(job))
}

/// Delete a job and clean up its provider-side counterpart.
pub async fn delete_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.service.cancel(id).await?;
    Ok(Json(serde_json::json!({
        "success": true,
        "message": "Job deleted",
    })))
}
