//! Speech provider trait and HTTP implementation.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use voxflow_core::{defaults, Error, Result};

use crate::wire::TranscriptBody;

/// Status the provider reports for a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderStatus {
    Running,
    Done,
    Rejected,
}

impl ProviderStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "running" => Some(ProviderStatus::Running),
            "done" => Some(ProviderStatus::Done),
            "rejected" => Some(ProviderStatus::Rejected),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderStatus::Running => "running",
            ProviderStatus::Done => "done",
            ProviderStatus::Rejected => "rejected",
        }
    }
}

/// Transcript retrieval format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TranscriptFormat {
    JsonV2,
    Txt,
    Srt,
}

impl TranscriptFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptFormat::JsonV2 => "json-v2",
            TranscriptFormat::Txt => "txt",
            TranscriptFormat::Srt => "srt",
        }
    }
}

/// Per-job transcription parameters sent with the submission.
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    pub language: String,
    pub diarization: bool,
    pub operating_point: Option<String>,
}

impl TranscriptionConfig {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
            diarization: false,
            operating_point: None,
        }
    }

    pub fn with_diarization(mut self, diarization: bool) -> Self {
        self.diarization = diarization;
        self
    }

    pub fn with_operating_point(mut self, operating_point: impl Into<String>) -> Self {
        self.operating_point = Some(operating_point.into());
        self
    }

    /// Provider-side config JSON sent as the `config` multipart field.
    pub fn to_provider_json(&self) -> serde_json::Value {
        let mut transcription_config = serde_json::json!({
            "language": self.language,
        });
        if self.diarization {
            transcription_config["diarization"] = serde_json::json!("speaker");
        }
        if let Some(ref op) = self.operating_point {
            transcription_config["operating_point"] = serde_json::json!(op);
        }
        serde_json::json!({
            "type": "transcription",
            "transcription_config": transcription_config,
        })
    }
}

/// Outbound interface to the external ASR provider.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Submit audio for transcription; returns the provider-side job id.
    async fn submit(
        &self,
        audio: &[u8],
        filename: &str,
        config: &TranscriptionConfig,
    ) -> Result<String>;

    /// Query the status of a remote job.
    async fn status(&self, provider_job_id: &str) -> Result<ProviderStatus>;

    /// Fetch the token-level transcript (`json-v2`).
    async fn transcript(&self, provider_job_id: &str) -> Result<TranscriptBody>;

    /// Fetch the transcript as plain text in the given format.
    async fn transcript_text(
        &self,
        provider_job_id: &str,
        format: TranscriptFormat,
    ) -> Result<String>;

    /// Delete a remote job. Best-effort cleanup; callers log failures
    /// instead of propagating them.
    async fn delete(&self, provider_job_id: &str) -> Result<()>;
}

/// HTTP client for the provider's v2 job API.
pub struct HttpSpeechProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

#[derive(Deserialize)]
struct SubmitResponse {
    id: String,
}

#[derive(Deserialize)]
struct StatusResponse {
    job: StatusJob,
}

#[derive(Deserialize)]
struct StatusJob {
    status: String,
}

impl HttpSpeechProvider {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            base_url,
            api_key,
            client: reqwest::Client::new(),
            timeout_secs: 60,
        }
    }

    /// Create from environment variables.
    /// Returns None if `ASR_BASE_URL` is not set.
    pub fn from_env() -> Option<Self> {
        let base_url = std::env::var(defaults::ENV_ASR_BASE_URL).ok()?;
        if base_url.is_empty() {
            return None;
        }
        let api_key = std::env::var(defaults::ENV_ASR_API_KEY).unwrap_or_default();
        Some(Self::new(base_url, api_key))
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    fn jobs_url(&self) -> String {
        format!("{}/v2/jobs", self.base_url)
    }
}

#[async_trait]
impl SpeechProvider for HttpSpeechProvider {
    async fn submit(
        &self,
        audio: &[u8],
        filename: &str,
        config: &TranscriptionConfig,
    ) -> Result<String> {
        let file_part = reqwest::multipart::Part::bytes(audio.to_vec())
            .file_name(filename.to_string())
            .mime_str("application/octet-stream")
            .map_err(|e| Error::Submission(format!("Failed to build multipart: {}", e)))?;

        let form = reqwest::multipart::Form::new()
            .part("data_file", file_part)
            .text("config", config.to_provider_json().to_string());

        let response = self
            .client
            .post(self.jobs_url())
            .bearer_auth(&self.api_key)
            .multipart(form)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Submission(format!("Submit request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Submission(format!(
                "Provider returned {}: {}",
                status, body
            )));
        }

        let parsed: SubmitResponse = response
            .json()
            .await
            .map_err(|e| Error::Submission(format!("Failed to parse submit response: {}", e)))?;

        debug!(provider_job_id = %parsed.id, "ASR job submitted");
        Ok(parsed.id)
    }

    async fn status(&self, provider_job_id: &str) -> Result<ProviderStatus> {
        let url = format!("{}/{}", self.jobs_url(), provider_job_id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Request(format!("Status request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Request(format!(
                "Status query returned {}: {}",
                status, body
            )));
        }

        let parsed: StatusResponse = response
            .json()
            .await
            .map_err(|e| Error::Request(format!("Failed to parse status response: {}", e)))?;

        ProviderStatus::parse(&parsed.job.status).ok_or_else(|| {
            Error::Request(format!(
                "Provider reported unknown status: {}",
                parsed.job.status
            ))
        })
    }

    async fn transcript(&self, provider_job_id: &str) -> Result<TranscriptBody> {
        let url = format!(
            "{}/{}/transcript?format={}",
            self.jobs_url(),
            provider_job_id,
            TranscriptFormat::JsonV2.as_str()
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::TranscriptFetch(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TranscriptFetch(format!(
                "Provider returned {}: {}",
                status, body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::TranscriptFetch(format!("Failed to parse transcript: {}", e)))
    }

    async fn transcript_text(
        &self,
        provider_job_id: &str,
        format: TranscriptFormat,
    ) -> Result<String> {
        let url = format!(
            "{}/{}/transcript?format={}",
            self.jobs_url(),
            provider_job_id,
            format.as_str()
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::TranscriptFetch(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TranscriptFetch(format!(
                "Provider returned {}: {}",
                status, body
            )));
        }

        response
            .text()
            .await
            .map_err(|e| Error::TranscriptFetch(e.to_string()))
    }

    async fn delete(&self, provider_job_id: &str) -> Result<()> {
        let url = format!("{}/{}", self.jobs_url(), provider_job_id);
        let response = self
            .client
            .delete(&url)
            .bearer_auth(&self.api_key)
            .timeout(std::time::Duration::from_secs(self.timeout_secs))
            .send()
            .await
            .map_err(|e| Error::Request(format!("Delete request failed: {}", e)))?;

        if !response.status().is_success() {
            warn!(
                provider_job_id,
                status = %response.status(),
                "Remote job delete returned non-success"
            );
        }
        Ok(())
    }
}
