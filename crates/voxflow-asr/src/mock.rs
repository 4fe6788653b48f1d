//! Scripted mock provider for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use voxflow_core::{Error, Result};

use crate::provider::{ProviderStatus, SpeechProvider, TranscriptFormat, TranscriptionConfig};
use crate::wire::TranscriptBody;

/// Mock `SpeechProvider` with a scripted status sequence and call counters.
///
/// Status checks consume the scripted queue in order; once the queue is
/// empty the last status repeats indefinitely (an always-`running` provider
/// is a one-element script).
pub struct MockSpeechProvider {
    submit_result: Mutex<Result<String>>,
    statuses: Mutex<VecDeque<ProviderStatus>>,
    last_status: Mutex<ProviderStatus>,
    transcript: Mutex<Result<TranscriptBody>>,
    pub submit_calls: AtomicUsize,
    pub status_calls: AtomicUsize,
    pub transcript_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
}

impl MockSpeechProvider {
    /// Provider that accepts submissions and immediately reports `done`
    /// with the given transcript.
    pub fn done_with(body: TranscriptBody) -> Self {
        Self::new("mock-job-1", vec![ProviderStatus::Done], Ok(body))
    }

    /// Provider that reports `running` forever.
    pub fn always_running() -> Self {
        Self::new(
            "mock-job-1",
            vec![ProviderStatus::Running],
            Ok(TranscriptBody::default()),
        )
    }

    /// Provider that rejects the job on the first status check.
    pub fn rejecting() -> Self {
        Self::new(
            "mock-job-1",
            vec![ProviderStatus::Rejected],
            Ok(TranscriptBody::default()),
        )
    }

    pub fn new(
        submit_id: &str,
        statuses: Vec<ProviderStatus>,
        transcript: Result<TranscriptBody>,
    ) -> Self {
        let last = statuses.last().copied().unwrap_or(ProviderStatus::Running);
        Self {
            submit_result: Mutex::new(Ok(submit_id.to_string())),
            statuses: Mutex::new(statuses.into()),
            last_status: Mutex::new(last),
            transcript: Mutex::new(transcript),
            submit_calls: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            transcript_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Make the next submit call fail.
    pub fn fail_submissions(self, message: &str) -> Self {
        *self.submit_result.lock().unwrap() = Err(Error::Submission(message.to_string()));
        self
    }

    /// Make transcript fetches fail.
    pub fn fail_transcript(self, message: &str) -> Self {
        *self.transcript.lock().unwrap() = Err(Error::TranscriptFetch(message.to_string()));
        self
    }
}

#[async_trait]
impl SpeechProvider for MockSpeechProvider {
    async fn submit(
        &self,
        _audio: &[u8],
        _filename: &str,
        _config: &TranscriptionConfig,
    ) -> Result<String> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        match &*self.submit_result.lock().unwrap() {
            Ok(id) => Ok(id.clone()),
            Err(e) => Err(Error::Submission(e.to_string())),
        }
    }

    async fn status(&self, _provider_job_id: &str) -> Result<ProviderStatus> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.statuses.lock().unwrap();
        match queue.pop_front() {
            Some(status) => {
                if queue.is_empty() {
                    // Keep repeating the final scripted status
                    queue.push_back(status);
                }
                Ok(status)
            }
            None => Ok(*self.last_status.lock().unwrap()),
        }
    }

    async fn transcript(&self, _provider_job_id: &str) -> Result<TranscriptBody> {
        self.transcript_calls.fetch_add(1, Ordering::SeqCst);
        match &*self.transcript.lock().unwrap() {
            Ok(body) => Ok(body.clone()),
            Err(e) => Err(Error::TranscriptFetch(e.to_string())),
        }
    }

    async fn transcript_text(
        &self,
        provider_job_id: &str,
        _format: TranscriptFormat,
    ) -> Result<String> {
        let body = self.transcript(provider_job_id).await?;
        let words: Vec<&str> = body.results.iter().filter_map(|r| r.content()).collect();
        Ok(words.join(" "))
    }

    async fn delete(&self, _provider_job_id: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
