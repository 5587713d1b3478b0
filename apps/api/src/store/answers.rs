use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::answer::{AnswerRow, AnswerStatus, RubricScore};

/// Creates the answer record for a fresh upload. The (session, question)
/// pair is unique; a second upload for the same question is rejected.
pub async fn insert_uploaded(
    pool: &PgPool,
    session_id: Uuid,
    question_id: Uuid,
    video_key: &str,
) -> Result<AnswerRow, AppError> {
    sqlx::query_as::<_, AnswerRow>(
        r#"
        INSERT INTO answers (id, session_id, question_id, video_key, status)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(question_id)
    .bind(video_key)
    .bind(AnswerStatus::Uploaded.as_str())
    .fetch_one(pool)
    .await
    .map_err(|e| map_unique(e, "An answer was already recorded for this question"))
}

/// Creates a terminal skipped answer with the score forced to all-zero.
pub async fn insert_skipped(
    pool: &PgPool,
    session_id: Uuid,
    question_id: Uuid,
) -> Result<AnswerRow, AppError> {
    sqlx::query_as::<_, AnswerRow>(
        r#"
        INSERT INTO answers (id, session_id, question_id, status, score)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(question_id)
    .bind(AnswerStatus::Skipped.as_str())
    .bind(Json(RubricScore::ZERO))
    .fetch_one(pool)
    .await
    .map_err(|e| map_unique(e, "An answer was already recorded for this question"))
}

pub async fn get(
    pool: &PgPool,
    session_id: Uuid,
    question_id: Uuid,
) -> Result<Option<AnswerRow>, AppError> {
    let answer = sqlx::query_as::<_, AnswerRow>(
        "SELECT * FROM answers WHERE session_id = $1 AND question_id = $2",
    )
    .bind(session_id)
    .bind(question_id)
    .fetch_optional(pool)
    .await?;

    Ok(answer)
}

pub async fn list_for_session(pool: &PgPool, session_id: Uuid) -> Result<Vec<AnswerRow>, AppError> {
    let answers =
        sqlx::query_as::<_, AnswerRow>("SELECT * FROM answers WHERE session_id = $1")
            .bind(session_id)
            .fetch_all(pool)
            .await?;

    Ok(answers)
}

/// Claims the answer for processing: uploaded → processing in one guarded
/// statement. Returns false if the answer was not in the uploaded state,
/// which means another run already claimed it (or it is already terminal).
pub async fn claim_processing(
    pool: &PgPool,
    session_id: Uuid,
    question_id: Uuid,
) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE answers
        SET status = $1, processing_started_at = now()
        WHERE session_id = $2 AND question_id = $3 AND status = $4
        "#,
    )
    .bind(AnswerStatus::Processing.as_str())
    .bind(session_id)
    .bind(question_id)
    .bind(AnswerStatus::Uploaded.as_str())
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Persists the analysis results. Status intentionally stays `processing`:
/// readers must not treat a scored-but-not-completed answer as final.
pub async fn save_analysis(
    pool: &PgPool,
    session_id: Uuid,
    question_id: Uuid,
    transcript: &str,
    emotion: &str,
    confidence: &str,
    score: &RubricScore,
    feedback: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE answers
        SET transcript = $1,
            emotion = $2,
            confidence = $3,
            score = $4,
            feedback = $5,
            processed_at = now()
        WHERE session_id = $6 AND question_id = $7
        "#,
    )
    .bind(transcript)
    .bind(emotion)
    .bind(confidence)
    .bind(Json(score))
    .bind(feedback)
    .bind(session_id)
    .bind(question_id)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn mark_completed(
    pool: &PgPool,
    session_id: Uuid,
    question_id: Uuid,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE answers
        SET status = $1, completed_at = now()
        WHERE session_id = $2 AND question_id = $3 AND status = $4
        "#,
    )
    .bind(AnswerStatus::Completed.as_str())
    .bind(session_id)
    .bind(question_id)
    .bind(AnswerStatus::Processing.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn mark_failed(
    pool: &PgPool,
    session_id: Uuid,
    question_id: Uuid,
    error: &str,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE answers
        SET status = $1, error = $2
        WHERE session_id = $3 AND question_id = $4 AND status = $5
        "#,
    )
    .bind(AnswerStatus::Failed.as_str())
    .bind(error)
    .bind(session_id)
    .bind(question_id)
    .bind(AnswerStatus::Processing.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

fn map_unique(e: sqlx::Error, message: &str) -> AppError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::PreconditionFailed(message.to_string())
        }
        _ => AppError::Database(e),
    }
}
