mod analysis;
mod auth;
mod config;
mod db;
mod errors;
mod interview;
mod llm;
mod models;
mod pipeline;
mod routes;
mod state;
mod store;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::emotion::HttpEmotionClassifier;
use crate::analysis::ffmpeg::Ffmpeg;
use crate::analysis::transcribe::HttpTranscriber;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm::JsonGenerator;
use crate::pipeline::queue::PipelineQueue;
use crate::pipeline::PipelineContext;
use crate::routes::build_router;
use crate::state::AppState;

/// Timeout for the analysis-service HTTP calls. Transcription of a long
/// answer can take minutes on CPU.
const ANALYSIS_HTTP_TIMEOUT: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            let crate_target = env!("CARGO_PKG_NAME").replace('-', "_");
            EnvFilter::new(format!("{}={}", crate_target, &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Viva API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL
    let db = create_pool(&config.database_url).await?;

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized");

    // Initialize the provider-fallback LLM generator
    let llm = Arc::new(JsonGenerator::from_config(&config)?);
    info!(
        "LLM generator initialized (order: {})",
        llm.provider_names().join(" -> ")
    );

    // Analysis collaborators: ffmpeg subprocess + inference services
    let analysis_http = reqwest::Client::builder()
        .timeout(ANALYSIS_HTTP_TIMEOUT)
        .build()?;
    let ffmpeg = Arc::new(Ffmpeg);

    // Background answer-analysis pool
    let pipeline_ctx = Arc::new(PipelineContext {
        db: db.clone(),
        s3: s3.clone(),
        bucket: config.s3_bucket.clone(),
        llm: Arc::clone(&llm),
        audio: ffmpeg.clone(),
        frames: ffmpeg,
        transcriber: Arc::new(HttpTranscriber::new(
            analysis_http.clone(),
            config.whisper_url.clone(),
        )),
        emotion: Arc::new(HttpEmotionClassifier::new(
            analysis_http,
            config.emotion_url.clone(),
        )),
        gates: config.followup_gates.clone(),
    });
    let pipeline = PipelineQueue::start(config.pipeline_workers, config.pipeline_queue_cap, {
        let ctx = Arc::clone(&pipeline_ctx);
        move |job| pipeline::run(Arc::clone(&ctx), job)
    });
    info!(
        "Pipeline worker pool started ({} workers, queue capacity {})",
        config.pipeline_workers, config.pipeline_queue_cap
    );

    // Build app state and router
    let state = AppState {
        db,
        s3,
        llm,
        config: config.clone(),
        pipeline,
    };
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "viva-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
