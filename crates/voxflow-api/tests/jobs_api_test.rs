//! HTTP integration tests for the job endpoints and webhook ingestion.
//!
//! Each test serves the router on an ephemeral port with in-memory stores
//! and a scripted provider, then drives it over HTTP with reqwest.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use uuid::Uuid;

use voxflow_api::{build_router, AppState};
use voxflow_asr::mock::MockSpeechProvider;
use voxflow_asr::wire::{RecognitionResult as Token, TranscriptBody};
use voxflow_core::{JobPatch, JobStatus, JobStore};
use voxflow_jobs::{PollerConfig, ServiceConfig, TranscriptionService};
use voxflow_store::{MemoryBlobStore, MemoryJobStore};

const WEBHOOK_TOKEN: &str = "test-webhook-token";

struct TestApp {
    base_url: String,
    client: reqwest::Client,
    jobs: Arc<MemoryJobStore>,
}

async fn spawn_app(provider: MockSpeechProvider) -> TestApp {
    let jobs = Arc::new(MemoryJobStore::new());
    let blobs = Arc::new(MemoryBlobStore::new());
    // Quick polling, but a budget long enough that no job times out within
    // a test's lifetime unless the test waits for it.
    let config = ServiceConfig::default().with_poller(
        PollerConfig::default()
            .with_poll_interval(Duration::from_millis(25))
            .with_max_attempts(2000),
    );
    let service = Arc::new(TranscriptionService::new(
        jobs.clone(),
        blobs,
        Arc::new(provider),
        config,
    ));
    let app = build_router(AppState::new(service, Some(WEBHOOK_TOKEN.to_string())));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        base_url: format!("http://{}", addr),
        client: reqwest::Client::new(),
        jobs,
    }
}

fn hello_body() -> TranscriptBody {
    TranscriptBody {
        results: vec![
            Token::word("hello", 0.0, 0.4, Some("S1")),
            Token::punctuation(".", 0.4, true, true),
        ],
    }
}

fn audio_form() -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(b"riff-audio-bytes".to_vec())
        .file_name("take.wav")
        .mime_str("audio/wav")
        .unwrap();
    reqwest::multipart::Form::new().part("audio", part)
}

async fn create_job(app: &TestApp, form: reqwest::multipart::Form) -> Value {
    let response = app
        .client
        .post(format!("{}/api/v1/jobs", app.base_url))
        .multipart(form)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    response.json().await.unwrap()
}

async fn get_job(app: &TestApp, id: &str) -> Value {
    app.client
        .get(format!("{}/api/v1/jobs/{}", app.base_url, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn wait_for_status(app: &TestApp, id: &str, wanted: &str) -> Value {
    for _ in 0..500 {
        let job = get_job(app, id).await;
        if job["status"] == wanted {
            return job;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("job never reached status {}", wanted);
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = spawn_app(MockSpeechProvider::always_running()).await;
    let body: Value = app
        .client
        .get(format!("{}/health", app.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_create_job_submits_and_completes() {
    let app = spawn_app(MockSpeechProvider::done_with(hello_body())).await;

    let form = audio_form()
        .text("mode", "ai")
        .text("language", "de")
        .text("diarization", "true");
    let job = create_job(&app, form).await;
    assert_eq!(job["status"], "processing");
    assert_eq!(job["mode"], "ai");
    assert_eq!(job["language"], "de");
    assert_eq!(job["diarization"], true);
    assert_eq!(job["externalJobId"], "mock-job-1");

    let job = wait_for_status(&app, job["id"].as_str().unwrap(), "complete").await;
    assert_eq!(job["transcript"], "hello.");
    assert_eq!(job["segments"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_job_without_audio_is_rejected() {
    let app = spawn_app(MockSpeechProvider::always_running()).await;
    let response = app
        .client
        .post(format!("{}/api/v1/jobs", app.base_url))
        .multipart(reqwest::multipart::Form::new().text("mode", "ai"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("no audio"));
}

#[tokio::test]
async fn test_create_job_with_unknown_mode_is_rejected() {
    let app = spawn_app(MockSpeechProvider::always_running()).await;
    let response = app
        .client
        .post(format!("{}/api/v1/jobs", app.base_url))
        .multipart(audio_form().text("mode", "robot"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_get_unknown_job_is_404() {
    let app = spawn_app(MockSpeechProvider::always_running()).await;
    let response = app
        .client
        .get(format!("{}/api/v1/jobs/{}", app.base_url, Uuid::now_v7()))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_list_jobs_with_limit() {
    let app = spawn_app(MockSpeechProvider::done_with(hello_body())).await;
    create_job(&app, audio_form()).await;
    create_job(&app, audio_form()).await;

    let body: Value = app
        .client
        .get(format!("{}/api/v1/jobs?limit=1", app.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_retry_of_processing_job_conflicts() {
    let app = spawn_app(MockSpeechProvider::always_running()).await;
    let job = create_job(&app, audio_form()).await;

    let response = app
        .client
        .post(format!(
            "{}/api/v1/jobs/{}/retry",
            app.base_url,
            job["id"].as_str().unwrap()
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn test_force_complete_and_refusal_to_overwrite() {
    let app = spawn_app(MockSpeechProvider::always_running()).await;
    let job = create_job(&app, audio_form().text("mode", "hybrid")).await;
    let id = job["id"].as_str().unwrap().to_string();

    let response = app
        .client
        .post(format!("{}/api/v1/jobs/{}/force-complete", app.base_url, id))
        .json(&json!({"transcript": "reviewed text"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let job: Value = response.json().await.unwrap();
    assert_eq!(job["status"], "complete");
    assert_eq!(job["transcript"], "reviewed text");

    // A second completion attempt is refused.
    let response = app
        .client
        .post(format!("{}/api/v1/jobs/{}/force-complete", app.base_url, id))
        .json(&json!({"transcript": "other text"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 409);
}

#[tokio::test]
async fn test_force_complete_with_empty_transcript_is_rejected() {
    let app = spawn_app(MockSpeechProvider::always_running()).await;
    let job = create_job(&app, audio_form()).await;

    let response = app
        .client
        .post(format!(
            "{}/api/v1/jobs/{}/force-complete",
            app.base_url,
            job["id"].as_str().unwrap()
        ))
        .json(&json!({"transcript": "   "}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}

#[tokio::test]
async fn test_delete_job() {
    let app = spawn_app(MockSpeechProvider::always_running()).await;
    let job = create_job(&app, audio_form()).await;
    let id = job["id"].as_str().unwrap().to_string();

    let response = app
        .client
        .delete(format!("{}/api/v1/jobs/{}", app.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);

    let response = app
        .client
        .get(format!("{}/api/v1/jobs/{}", app.base_url, id))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
}

#[tokio::test]
async fn test_webhook_rejects_bad_token() {
    let app = spawn_app(MockSpeechProvider::always_running()).await;
    let response = app
        .client
        .post(format!(
            "{}/api/v1/webhooks/asr?token=wrong",
            app.base_url
        ))
        .json(&json!({"job": {"id": "prov-1", "status": "done"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 401);
}

#[tokio::test]
async fn test_webhook_acknowledges_unknown_job() {
    let app = spawn_app(MockSpeechProvider::always_running()).await;
    let response = app
        .client
        .post(format!(
            "{}/api/v1/webhooks/asr?token={}",
            app.base_url, WEBHOOK_TOKEN
        ))
        .json(&json!({"job": {"id": "never-seen", "status": "done"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["status"], "unknown-job");
}

#[tokio::test]
async fn test_webhook_acknowledges_unparseable_payload() {
    let app = spawn_app(MockSpeechProvider::always_running()).await;
    let response = app
        .client
        .post(format!(
            "{}/api/v1/webhooks/asr?token={}",
            app.base_url, WEBHOOK_TOKEN
        ))
        .json(&json!({"status": "done"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], false);
}

#[tokio::test]
async fn test_webhook_completion_applies_to_job() {
    let app = spawn_app(MockSpeechProvider::done_with(hello_body())).await;
    let job = create_job(&app, audio_form()).await;
    let id = job["id"].as_str().unwrap().to_string();
    // Let the poll loop finish first, then park the job back in processing
    // under a fresh provider handle so the webhook is the only writer.
    wait_for_status(&app, &id, "complete").await;
    let job_id: Uuid = id.parse().unwrap();
    app.jobs
        .update(
            job_id,
            JobPatch::new()
                .status(JobStatus::Processing)
                .external_job_id("prov-wh"),
        )
        .await
        .unwrap();

    let response = app
        .client
        .post(format!(
            "{}/api/v1/webhooks/asr?token={}",
            app.base_url, WEBHOOK_TOKEN
        ))
        .json(&json!({
            "job": {"id": "prov-wh", "status": "done"},
            "results": [
                {
                    "type": "word",
                    "start_time": 0.0,
                    "end_time": 0.4,
                    "alternatives": [{"content": "delivered", "confidence": 0.9}]
                }
            ]
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["ok"], true);
    assert_eq!(body["status"], "complete");

    let job = get_job(&app, &id).await;
    assert_eq!(job["transcript"], "delivered");
}
