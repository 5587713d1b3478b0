use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::question::{QuestionKind, QuestionRow};

/// Replaces a session's question list with freshly generated base questions
/// at order 1..N. Only called during AI setup, before any answers exist.
pub async fn replace_for_session(
    pool: &PgPool,
    session_id: Uuid,
    texts: &[String],
) -> Result<usize, AppError> {
    sqlx::query("DELETE FROM questions WHERE session_id = $1")
        .bind(session_id)
        .execute(pool)
        .await?;

    for (idx, text) in texts.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO questions
                (id, session_id, "order", question_text, kind, parent_question_id, depth, created_by)
            VALUES ($1, $2, $3, $4, $5, NULL, 0, 'ai')
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind((idx + 1) as i32)
        .bind(text)
        .bind(QuestionKind::Base.as_str())
        .execute(pool)
        .await?;
    }

    Ok(texts.len())
}

pub async fn get(pool: &PgPool, id: Uuid, session_id: Uuid) -> Result<QuestionRow, AppError> {
    sqlx::query_as::<_, QuestionRow>("SELECT * FROM questions WHERE id = $1 AND session_id = $2")
        .bind(id)
        .bind(session_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))
}

/// The question at a given 1-based order, if any. Absence signals that the
/// interview is exhausted.
pub async fn by_order(
    pool: &PgPool,
    session_id: Uuid,
    order: i32,
) -> Result<Option<QuestionRow>, AppError> {
    let question = sqlx::query_as::<_, QuestionRow>(
        r#"SELECT * FROM questions WHERE session_id = $1 AND "order" = $2"#,
    )
    .bind(session_id)
    .bind(order)
    .fetch_optional(pool)
    .await?;

    Ok(question)
}

pub async fn list_ordered(pool: &PgPool, session_id: Uuid) -> Result<Vec<QuestionRow>, AppError> {
    let questions = sqlx::query_as::<_, QuestionRow>(
        r#"SELECT * FROM questions WHERE session_id = $1 ORDER BY "order" ASC"#,
    )
    .bind(session_id)
    .fetch_all(pool)
    .await?;

    Ok(questions)
}

/// The follow-up already attached to a parent question, if one exists.
pub async fn followup_for_parent(
    pool: &PgPool,
    session_id: Uuid,
    parent_id: Uuid,
) -> Result<Option<QuestionRow>, AppError> {
    let question = sqlx::query_as::<_, QuestionRow>(
        "SELECT * FROM questions WHERE session_id = $1 AND kind = $2 AND parent_question_id = $3",
    )
    .bind(session_id)
    .bind(QuestionKind::Followup.as_str())
    .bind(parent_id)
    .fetch_optional(pool)
    .await?;

    Ok(question)
}

/// Shifts every question after `order` down by one slot, opening the gap the
/// follow-up is inserted into. Must run before the insert.
pub async fn shift_after(pool: &PgPool, session_id: Uuid, order: i32) -> Result<u64, AppError> {
    let result = sqlx::query(
        r#"UPDATE questions SET "order" = "order" + 1 WHERE session_id = $1 AND "order" > $2"#,
    )
    .bind(session_id)
    .bind(order)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

pub async fn insert_followup(
    pool: &PgPool,
    session_id: Uuid,
    order: i32,
    text: &str,
    parent_id: Uuid,
) -> Result<QuestionRow, AppError> {
    let question = sqlx::query_as::<_, QuestionRow>(
        r#"
        INSERT INTO questions
            (id, session_id, "order", question_text, kind, parent_question_id, depth, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, 1, 'ai')
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(session_id)
    .bind(order)
    .bind(text)
    .bind(QuestionKind::Followup.as_str())
    .bind(parent_id)
    .fetch_one(pool)
    .await?;

    Ok(question)
}
