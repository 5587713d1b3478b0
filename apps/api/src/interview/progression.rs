//! The interview-progression state machine, as seen by the HTTP layer.
//!
//! Every transition is a guarded conditional update in the store; a guard
//! that does not hold surfaces as `PreconditionFailed` with nothing mutated.

use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::session::SessionStatus;
use crate::store::{answers, questions, sessions};

pub const VOICES: [&str; 2] = ["male", "female"];

/// Result of a next-question lookup. Exhaustion is a normal outcome, not an
/// error: it is the signal that completes the session.
#[derive(Debug)]
pub enum NextQuestion {
    Question {
        number: i32,
        question_id: Uuid,
        question_text: String,
        voice: String,
    },
    Exhausted,
}

pub async fn start_interview(
    pool: &PgPool,
    session_id: Uuid,
    user_id: Uuid,
    voice: &str,
) -> Result<(), AppError> {
    if !VOICES.contains(&voice) {
        return Err(AppError::Validation("Invalid voice selection".to_string()));
    }
    sessions::get_owned(pool, session_id, user_id).await?;
    sessions::start(pool, session_id, user_id, voice).await?;
    info!(session_id = %session_id, %voice, "interview started");
    Ok(())
}

/// Looks up the question at `current_question_index + 1`. If none exists the
/// interview is over and the session transitions to completed.
pub async fn next_question(
    pool: &PgPool,
    session_id: Uuid,
    user_id: Uuid,
) -> Result<NextQuestion, AppError> {
    let session = sessions::get_owned(pool, session_id, user_id).await?;
    if session.status != SessionStatus::InProgress.as_str() {
        return Err(AppError::PreconditionFailed(
            "Interview not in progress".to_string(),
        ));
    }

    let order = session.current_question_index + 1;
    match questions::by_order(pool, session_id, order).await? {
        Some(question) => Ok(NextQuestion::Question {
            number: order,
            question_id: question.id,
            question_text: question.question_text,
            voice: session.interviewer_voice.unwrap_or_default(),
        }),
        None => {
            sessions::complete_exhausted(pool, session_id).await?;
            info!(session_id = %session_id, "interview completed, questions exhausted");
            Ok(NextQuestion::Exhausted)
        }
    }
}

/// Moves the cursor forward after an answer was recorded client-side.
pub async fn answer_complete(
    pool: &PgPool,
    session_id: Uuid,
    user_id: Uuid,
) -> Result<(), AppError> {
    sessions::advance(pool, session_id, user_id).await
}

/// Records a zero-scored skipped answer and advances past the question.
pub async fn skip_question(
    pool: &PgPool,
    session_id: Uuid,
    user_id: Uuid,
    question_id: Uuid,
) -> Result<(), AppError> {
    let session = sessions::get_owned(pool, session_id, user_id).await?;
    if session.status != SessionStatus::InProgress.as_str() {
        return Err(AppError::PreconditionFailed(
            "Interview not in progress".to_string(),
        ));
    }
    questions::get(pool, question_id, session_id).await?;

    answers::insert_skipped(pool, session_id, question_id).await?;
    sessions::advance(pool, session_id, user_id).await?;
    info!(session_id = %session_id, question_id = %question_id, "question skipped");
    Ok(())
}

pub async fn end_interview(pool: &PgPool, session_id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    sessions::end(pool, session_id, user_id).await?;
    info!(session_id = %session_id, "interview ended by candidate");
    Ok(())
}
