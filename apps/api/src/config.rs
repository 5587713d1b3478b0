use anyhow::{Context, Result};

/// Thresholds gating adaptive follow-up generation. A follow-up is only
/// attempted when the transcript is short or an axis score falls below its
/// ceiling; the common case is no attempt, which keeps LLM cost bounded.
#[derive(Debug, Clone)]
pub struct FollowupGates {
    pub min_transcript_words: usize,
    pub accuracy_below: i32,
    pub communication_below: i32,
}

impl Default for FollowupGates {
    fn default() -> Self {
        Self {
            min_transcript_words: 30,
            accuracy_below: 60,
            communication_below: 55,
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub jwt_secret: String,
    pub port: u16,
    pub rust_log: String,

    /// Preferred LLM provider name; moved to the front of the fallback order.
    pub ai_provider: Option<String>,
    /// Comma-separated provider fallback order. Defaults to groq,gemini,azure.
    pub ai_provider_order: Option<String>,
    pub groq_api_key: Option<String>,
    pub groq_model: String,
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub azure_openai_endpoint: Option<String>,
    pub azure_openai_key: Option<String>,
    pub azure_openai_deployment: Option<String>,
    pub azure_openai_api_version: String,

    /// Transcription service endpoint (accepts a multipart WAV, returns text).
    pub whisper_url: String,
    /// Per-frame emotion classification endpoint.
    pub emotion_url: String,

    pub followup_gates: FollowupGates,
    pub pipeline_workers: usize,
    pub pipeline_queue_cap: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let gates = FollowupGates {
            min_transcript_words: parse_env("FOLLOWUP_MIN_TRANSCRIPT_WORDS", 30)?,
            accuracy_below: parse_env("FOLLOWUP_ACCURACY_BELOW", 60)?,
            communication_below: parse_env("FOLLOWUP_COMMUNICATION_BELOW", 55)?,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            jwt_secret: require_env("JWT_SECRET")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),

            ai_provider: optional_env("AI_PROVIDER"),
            ai_provider_order: optional_env("AI_PROVIDER_ORDER"),
            groq_api_key: optional_env("GROQ_API_KEY"),
            groq_model: optional_env("GROQ_MODEL")
                .unwrap_or_else(|| "llama-3.1-8b-instant".to_string()),
            gemini_api_key: optional_env("GEMINI_API_KEY"),
            gemini_model: optional_env("GEMINI_MODEL")
                .unwrap_or_else(|| "gemini-2.0-flash".to_string()),
            azure_openai_endpoint: optional_env("AZURE_OPENAI_ENDPOINT"),
            azure_openai_key: optional_env("AZURE_OPENAI_KEY"),
            azure_openai_deployment: optional_env("AZURE_OPENAI_DEPLOYMENT"),
            azure_openai_api_version: optional_env("AZURE_OPENAI_API_VERSION")
                .unwrap_or_else(|| "2024-06-01".to_string()),

            whisper_url: require_env("WHISPER_URL")?,
            emotion_url: require_env("EMOTION_URL")?,

            followup_gates: gates,
            pipeline_workers: parse_env("PIPELINE_WORKERS", 4)?,
            pipeline_queue_cap: parse_env("PIPELINE_QUEUE_CAP", 64)?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_env(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("'{key}' has an invalid value")),
        None => Ok(default),
    }
}
