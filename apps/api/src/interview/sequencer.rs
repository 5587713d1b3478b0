//! Question ordering. This module is the only writer of `order` values and
//! follow-up linkage.

use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::models::question::{QuestionKind, QuestionRow};
use crate::store::questions;

/// True if `question` may anchor a follow-up: base kind at depth 0.
/// Follow-ups never parent further follow-ups.
pub fn can_parent_followup(question: &QuestionRow) -> bool {
    question.kind == QuestionKind::Base.as_str() && question.depth == 0
}

/// Inserts `text` as the follow-up to `parent`, directly after it.
///
/// Every question past the parent is shifted down by one first, then the
/// follow-up is inserted into the opened slot at `parent.order + 1`. Shift
/// before insert, so no two questions ever share an order value observably.
/// The caller must have verified that no follow-up exists for this parent.
pub async fn insert_followup(
    pool: &PgPool,
    parent: &QuestionRow,
    text: &str,
) -> Result<QuestionRow, AppError> {
    if parent.order <= 0 {
        return Err(AppError::Validation(format!(
            "parent question has corrupt order {}",
            parent.order
        )));
    }

    let shifted = questions::shift_after(pool, parent.session_id, parent.order).await?;
    let inserted = questions::insert_followup(
        pool,
        parent.session_id,
        parent.order + 1,
        text,
        parent.id,
    )
    .await?;

    info!(
        session_id = %parent.session_id,
        parent = %parent.id,
        order = inserted.order,
        shifted,
        "follow-up inserted"
    );
    Ok(inserted)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn question(kind: &str, depth: i32) -> QuestionRow {
        QuestionRow {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            order: 1,
            question_text: "Tell me about yourself.".to_string(),
            kind: kind.to_string(),
            parent_question_id: None,
            depth,
            created_by: "ai".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn base_questions_can_parent_followups() {
        assert!(can_parent_followup(&question("base", 0)));
    }

    #[test]
    fn followups_never_parent_followups() {
        assert!(!can_parent_followup(&question("followup", 1)));
    }

    #[test]
    fn depth_disqualifies_even_with_base_kind() {
        assert!(!can_parent_followup(&question("base", 1)));
    }
}
