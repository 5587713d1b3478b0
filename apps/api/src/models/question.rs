#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    Base,
    Followup,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Base => "base",
            QuestionKind::Followup => "followup",
        }
    }
}

/// One question belonging to an interview session.
///
/// `order` is 1-based and dense per session. Follow-ups carry
/// `parent_question_id` and `depth = 1`; chaining further is not allowed.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub order: i32,
    pub question_text: String,
    pub kind: String,
    pub parent_question_id: Option<Uuid>,
    pub depth: i32,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}
