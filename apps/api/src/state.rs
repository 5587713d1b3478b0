use std::sync::Arc;

use aws_sdk_s3::Client as S3Client;
use sqlx::PgPool;

use crate::config::Config;
use crate::llm::JsonGenerator;
use crate::pipeline::queue::PipelineQueue;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub s3: S3Client,
    pub llm: Arc<JsonGenerator>,
    pub config: Config,
    /// Handle to the background worker pool; upload handlers enqueue one
    /// analysis run per answer through it.
    pub pipeline: PipelineQueue,
}
