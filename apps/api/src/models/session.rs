#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;

/// Interview lifecycle: created → questions_generated → in_progress → completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Created,
    QuestionsGenerated,
    InProgress,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Created => "created",
            SessionStatus::QuestionsGenerated => "questions_generated",
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Completed => "completed",
        }
    }
}

/// AI analysis of the resume against the job description.
/// Produced once during setup, immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiContext {
    pub match_score: i32,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub resume_name: Option<String>,
    pub resume_key: Option<String>,
    pub resume_text: Option<String>,
    pub job_description: String,
    pub ai_context: Option<Json<AiContext>>,
    pub interviewer_voice: Option<String>,
    /// 0-based progress cursor; the next question is the one at order `index + 1`.
    pub current_question_index: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}
