#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Answer lifecycle: uploaded → processing → completed | failed.
/// `skipped` is terminal from creation. Terminal states never regress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
    Skipped,
}

impl AnswerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnswerStatus::Uploaded => "uploaded",
            AnswerStatus::Processing => "processing",
            AnswerStatus::Completed => "completed",
            AnswerStatus::Failed => "failed",
            AnswerStatus::Skipped => "skipped",
        }
    }
}

/// Rubric score triple, each axis 0–100.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RubricScore {
    pub accuracy: i32,
    pub communication: i32,
    pub behavior: i32,
}

impl RubricScore {
    /// The forced score for skipped questions.
    pub const ZERO: RubricScore = RubricScore {
        accuracy: 0,
        communication: 0,
        behavior: 0,
    };
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnswerRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub question_id: Uuid,
    pub video_key: Option<String>,
    pub status: String,
    pub transcript: Option<String>,
    pub emotion: Option<String>,
    pub confidence: Option<String>,
    pub score: Option<Json<RubricScore>>,
    pub feedback: Option<String>,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub processing_started_at: Option<DateTime<Utc>>,
    pub processed_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}
