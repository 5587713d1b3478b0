use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::session::{AiContext, SessionRow, SessionStatus};

pub async fn insert(
    pool: &PgPool,
    user_id: Uuid,
    resume_name: &str,
    resume_key: &str,
    resume_text: &str,
    job_description: &str,
) -> Result<SessionRow, AppError> {
    let session = sqlx::query_as::<_, SessionRow>(
        r#"
        INSERT INTO sessions
            (id, user_id, status, resume_name, resume_key, resume_text, job_description)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(SessionStatus::Created.as_str())
    .bind(resume_name)
    .bind(resume_key)
    .bind(resume_text)
    .bind(job_description)
    .fetch_one(pool)
    .await?;

    Ok(session)
}

/// Fetches a session, enforcing ownership.
pub async fn get_owned(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<SessionRow, AppError> {
    sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = $1 AND user_id = $2")
        .bind(id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Interview not found".to_string()))
}

/// Fetches a session without an ownership filter. Used by the background
/// pipeline, which is triggered after ownership was already checked.
pub async fn get(pool: &PgPool, id: Uuid) -> Result<SessionRow, AppError> {
    sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Interview not found".to_string()))
}

/// Stores the AI context and transitions created → questions_generated.
pub async fn save_ai_context(
    pool: &PgPool,
    id: Uuid,
    user_id: Uuid,
    ctx: &AiContext,
) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET ai_context = $1, status = $2
        WHERE id = $3 AND user_id = $4 AND status = $5
        "#,
    )
    .bind(Json(ctx))
    .bind(SessionStatus::QuestionsGenerated.as_str())
    .bind(id)
    .bind(user_id)
    .bind(SessionStatus::Created.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::PreconditionFailed(
            "AI setup already completed".to_string(),
        ));
    }
    Ok(())
}

/// Transitions questions_generated → in_progress, recording the interviewer
/// voice and resetting the progress cursor.
pub async fn start(pool: &PgPool, id: Uuid, user_id: Uuid, voice: &str) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET interviewer_voice = $1,
            current_question_index = 0,
            status = $2,
            started_at = now()
        WHERE id = $3 AND user_id = $4 AND status = $5
        "#,
    )
    .bind(voice)
    .bind(SessionStatus::InProgress.as_str())
    .bind(id)
    .bind(user_id)
    .bind(SessionStatus::QuestionsGenerated.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::PreconditionFailed(
            "Interview not ready to start".to_string(),
        ));
    }
    Ok(())
}

/// Advances the progress cursor by compare-and-swap: the observed index is
/// part of the guard, so of two concurrent advances from the same prior
/// state exactly one wins and the other observes a precondition failure.
/// The cursor can never jump by two.
pub async fn advance(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let session = get_owned(pool, id, user_id).await?;
    let observed = session.current_question_index;

    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET current_question_index = $1
        WHERE id = $2 AND user_id = $3 AND status = $4 AND current_question_index = $5
        "#,
    )
    .bind(observed + 1)
    .bind(id)
    .bind(user_id)
    .bind(SessionStatus::InProgress.as_str())
    .bind(observed)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::PreconditionFailed(
            "Unable to advance question".to_string(),
        ));
    }
    Ok(())
}

/// Marks the session completed once its questions are exhausted. A no-op if
/// the session already left in_progress (e.g. a concurrent explicit end).
pub async fn complete_exhausted(pool: &PgPool, id: Uuid) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE sessions SET status = $1, completed_at = now() WHERE id = $2 AND status = $3",
    )
    .bind(SessionStatus::Completed.as_str())
    .bind(id)
    .bind(SessionStatus::InProgress.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

/// Explicit end requested by the candidate.
pub async fn end(pool: &PgPool, id: Uuid, user_id: Uuid) -> Result<(), AppError> {
    let result = sqlx::query(
        r#"
        UPDATE sessions
        SET status = $1, completed_at = now()
        WHERE id = $2 AND user_id = $3 AND status = $4
        "#,
    )
    .bind(SessionStatus::Completed.as_str())
    .bind(id)
    .bind(user_id)
    .bind(SessionStatus::InProgress.as_str())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::PreconditionFailed(
            "Interview not in progress or already ended".to_string(),
        ));
    }
    Ok(())
}
