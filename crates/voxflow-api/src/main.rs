//! voxflow-api - HTTP API server for voxflow

use std::net::SocketAddr;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use voxflow_api::{build_router, AppState};
use voxflow_asr::HttpSpeechProvider;
use voxflow_core::defaults;
use voxflow_jobs::{ServiceConfig, TranscriptionService};
use voxflow_store::{FilesystemBlobStore, PgJobStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    //
    // Environment variables:
    //   RUST_LOG - standard env filter (default: "voxflow_api=debug,tower_http=debug")
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "voxflow_api=debug,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Get configuration from environment
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "postgres://localhost/voxflow".to_string());
    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(defaults::SERVER_PORT);
    let blob_root = std::env::var(defaults::ENV_BLOB_ROOT)
        .unwrap_or_else(|_| "./data/blobs".to_string());
    let webhook_token = std::env::var(defaults::ENV_WEBHOOK_TOKEN).ok();

    // Job store
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&database_url)
        .await?;
    PgJobStore::migrate(&pool).await?;
    let jobs = Arc::new(PgJobStore::new(pool));
    info!("Database connected and migrated");

    // Blob store
    let blobs = Arc::new(FilesystemBlobStore::new(&blob_root));
    blobs
        .validate()
        .await
        .map_err(|e| anyhow::anyhow!("Blob storage validation failed: {}", e))?;
    info!(blob_root = %blob_root, "Blob storage validated");

    // ASR provider
    let provider = HttpSpeechProvider::from_env().ok_or_else(|| {
        anyhow::anyhow!(
            "{} is not set; cannot reach the ASR provider",
            defaults::ENV_ASR_BASE_URL
        )
    })?;

    let service = Arc::new(TranscriptionService::new(
        jobs,
        blobs,
        Arc::new(provider),
        ServiceConfig::from_env(),
    ));

    if webhook_token.is_none() {
        info!("No webhook token configured; webhook authentication disabled");
    }
    let app = build_router(AppState::new(service, webhook_token));

    // Start server
    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
