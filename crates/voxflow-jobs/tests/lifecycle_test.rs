//! End-to-end lifecycle scenarios against in-memory stores and a scripted
//! provider: both reconciliation channels, retries, and payload offload.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;

use voxflow_asr::mock::MockSpeechProvider;
use voxflow_asr::wire::{RecognitionResult as Token, TranscriptBody};
use voxflow_asr::ProviderStatus;
use voxflow_core::{BlobStore, Job, JobMode, JobStatus, NewJob};
use voxflow_jobs::{PollerConfig, ServiceConfig, TranscriptionService, WebhookEvent, WebhookOutcome};
use voxflow_store::{MemoryBlobStore, MemoryJobStore};

struct Harness {
    blobs: Arc<MemoryBlobStore>,
    provider: Arc<MockSpeechProvider>,
    service: TranscriptionService,
}

fn harness(provider: MockSpeechProvider) -> Harness {
    harness_with_limit(provider, voxflow_core::defaults::INLINE_PAYLOAD_LIMIT_BYTES)
}

fn harness_with_limit(provider: MockSpeechProvider, inline_limit: usize) -> Harness {
    let jobs = Arc::new(MemoryJobStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    let provider = Arc::new(provider);
    let config = ServiceConfig::default()
        .with_inline_payload_limit(inline_limit)
        .with_poller(
            PollerConfig::default()
                .with_poll_interval(Duration::from_millis(1))
                .with_max_attempts(20),
        );
    let service = TranscriptionService::new(jobs, blobs.clone(), provider.clone(), config);
    Harness {
        blobs,
        provider,
        service,
    }
}

fn meeting_body() -> TranscriptBody {
    TranscriptBody {
        results: vec![
            Token::word("Good", 0.0, 0.3, Some("S1")),
            Token::word("morning", 0.3, 0.8, Some("S1")),
            Token::punctuation(".", 0.8, true, true),
            Token::word("Morning", 1.2, 1.6, Some("S2")),
            Token::punctuation("!", 1.6, true, true),
        ],
    }
}

async fn wait_until_settled(harness: &Harness, id: Uuid) -> Job {
    for _ in 0..500 {
        let job = harness.service.get_job(id).await.unwrap();
        let settled = job.status.is_terminal() || job.status == JobStatus::PendingReview;
        if settled && !harness.service.is_polling(id).await {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("job never settled");
}

#[tokio::test]
async fn test_ai_job_full_lifecycle_via_polling() {
    let h = harness(MockSpeechProvider::new(
        "prov-e2e",
        vec![
            ProviderStatus::Running,
            ProviderStatus::Running,
            ProviderStatus::Done,
        ],
        Ok(meeting_body()),
    ));

    let job = h
        .service
        .create_job(NewJob::new(JobMode::Ai).with_diarization(true))
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Pending);

    let job = h
        .service
        .submit(job.id, b"riff-audio-bytes", "meeting.wav")
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.external_job_id.as_deref(), Some("prov-e2e"));

    let job = wait_until_settled(&h, job.id).await;
    assert_eq!(job.status, JobStatus::Complete);
    assert_eq!(job.transcript.as_deref(), Some("Good morning. Morning!"));
    let segments = job.segments.unwrap();
    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].speaker, "S1");
    assert_eq!(segments[1].speaker, "S2");
    assert!(job.last_checked_at.is_some());

    // Remote job cleaned up once the result was in hand.
    assert_eq!(h.provider.delete_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_hybrid_job_stops_at_review_then_completes_manually() {
    let h = harness(MockSpeechProvider::done_with(meeting_body()));

    let job = h
        .service
        .create_job(NewJob::new(JobMode::Hybrid))
        .await
        .unwrap();
    h.service
        .submit(job.id, b"riff-audio-bytes", "interview.wav")
        .await
        .unwrap();

    let job = wait_until_settled(&h, job.id).await;
    assert_eq!(job.status, JobStatus::PendingReview);
    assert_eq!(job.transcript.as_deref(), Some("Good morning. Morning!"));

    // Reviewer edits the draft and signs it off.
    let job = h
        .service
        .force_complete(job.id, "Good morning. Morning!".to_string())
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Complete);
}

#[tokio::test]
async fn test_webhook_and_poller_race_yields_single_completion() {
    // Poller would need two checks to see done; the webhook lands first.
    let h = harness(MockSpeechProvider::new(
        "prov-race",
        vec![ProviderStatus::Running, ProviderStatus::Done],
        Ok(meeting_body()),
    ));

    let job = h.service.create_job(NewJob::new(JobMode::Ai)).await.unwrap();
    h.service
        .submit(job.id, b"riff-audio-bytes", "call.wav")
        .await
        .unwrap();

    let body = json!({"job": {"id": "prov-race", "status": "done"}});
    let event = WebhookEvent::parse(None, &body).unwrap();
    let outcome = h.service.handle_webhook(event.clone()).await.unwrap();
    assert_eq!(outcome, WebhookOutcome::Applied(JobStatus::Complete));
    let first = h.service.get_job(job.id).await.unwrap();

    // The duplicate delivery and the still-running poller both lose to the
    // first writer; the record is untouched.
    let outcome = h.service.handle_webhook(event).await.unwrap();
    assert_eq!(outcome, WebhookOutcome::Applied(JobStatus::Complete));

    let job = wait_until_settled(&h, job.id).await;
    assert_eq!(job.completed_at, first.completed_at);
    assert_eq!(job.transcript, first.transcript);
}

#[tokio::test]
async fn test_rejection_then_retry_recovers() {
    // First poll sees a rejection; the retry's poll loop then sees done.
    let h = harness(MockSpeechProvider::new(
        "prov-retry",
        vec![ProviderStatus::Rejected, ProviderStatus::Done],
        Ok(meeting_body()),
    ));

    let job = h.service.create_job(NewJob::new(JobMode::Ai)).await.unwrap();
    h.service
        .submit(job.id, b"riff-audio-bytes", "retry.wav")
        .await
        .unwrap();

    let job = wait_until_settled(&h, job.id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.is_some());

    let job = h.service.retry(job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Processing);
    assert_eq!(job.retry_count, 1);
    assert!(job.error.is_none());

    let job = wait_until_settled(&h, job.id).await;
    assert_eq!(job.status, JobStatus::Complete);
    assert_eq!(job.transcript.as_deref(), Some("Good morning. Morning!"));
}

#[tokio::test]
async fn test_oversized_transcript_is_offloaded_end_to_end() {
    // A tiny inline limit forces the offload path without a megabyte body.
    let h = harness_with_limit(MockSpeechProvider::done_with(meeting_body()), 64);

    let job = h.service.create_job(NewJob::new(JobMode::Ai)).await.unwrap();
    h.service
        .submit(job.id, b"riff-audio-bytes", "long.wav")
        .await
        .unwrap();

    let job = wait_until_settled(&h, job.id).await;
    assert_eq!(job.status, JobStatus::Complete);
    assert!(job.transcript.is_none());
    assert!(job.segments.is_none());
    let path = job.transcript_storage_path.unwrap();
    assert_eq!(path, format!("transcripts/{}/transcript.json", job.id));
    assert_eq!(job.segment_count, Some(2));
    assert_eq!(
        job.transcript_length,
        Some("Good morning. Morning!".len() as i64)
    );

    // The full document is retrievable from the blob store.
    let bytes = h.blobs.get(&path).await.unwrap();
    let doc: voxflow_core::TranscriptDocument = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(doc.transcript, "Good morning. Morning!");
    assert_eq!(doc.segments.len(), 2);
}

#[tokio::test]
async fn test_poll_timeout_fails_job_with_attempt_count() {
    let h = harness(MockSpeechProvider::always_running());

    let job = h.service.create_job(NewJob::new(JobMode::Ai)).await.unwrap();
    h.service
        .submit(job.id, b"riff-audio-bytes", "slow.wav")
        .await
        .unwrap();

    let job = wait_until_settled(&h, job.id).await;
    assert_eq!(job.status, JobStatus::Failed);
    assert!(job.error.as_deref().unwrap().contains("timed out"));

    // The handle survives, so a retry re-enters polling rather than
    // demanding a fresh upload.
    let job = h.service.retry(job.id).await.unwrap();
    assert_eq!(job.status, JobStatus::Processing);
}

#[tokio::test]
async fn test_human_mode_manual_transcript_path() {
    let h = harness(MockSpeechProvider::always_running());

    let job = h
        .service
        .create_job(NewJob::new(JobMode::Human))
        .await
        .unwrap();
    // Human-mode jobs can complete without ever touching the provider.
    let job = h
        .service
        .force_complete(job.id, "Dictated, not read.".to_string())
        .await
        .unwrap();
    assert_eq!(job.status, JobStatus::Complete);
    assert_eq!(job.transcript.as_deref(), Some("Dictated, not read."));
    assert_eq!(h.provider.submit_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_list_returns_newest_first() {
    let h = harness(MockSpeechProvider::always_running());
    let first = h.service.create_job(NewJob::new(JobMode::Ai)).await.unwrap();
    let second = h.service.create_job(NewJob::new(JobMode::Hybrid)).await.unwrap();

    let listed = h.service.list_jobs(10).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, second.id);
    assert_eq!(listed[1].id, first.id);

    h.service.cancel(first.id).await.unwrap();
    assert_eq!(h.service.list_jobs(10).await.unwrap().len(), 1);
}
