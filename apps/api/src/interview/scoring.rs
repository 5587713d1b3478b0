//! Rubric scoring: a thin typed wrapper over the JSON generator.

use serde_json::Value;
use thiserror::Error;

use crate::interview::prompts::{JSON_ONLY_SYSTEM, SCORE_PROMPT_TEMPLATE};
use crate::llm::{JsonGenerator, LlmError};
use crate::models::answer::RubricScore;

const SCORE_TEMPERATURE: f32 = 0.2;

#[derive(Debug, Error)]
pub enum ScoreError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("malformed score response: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone)]
pub struct ScoredAnswer {
    pub score: RubricScore,
    pub feedback: String,
}

pub async fn score_answer(
    llm: &JsonGenerator,
    question: &str,
    transcript: &str,
    emotion: &str,
    confidence: &str,
) -> Result<ScoredAnswer, ScoreError> {
    let prompt = SCORE_PROMPT_TEMPLATE
        .replace("{question}", question)
        .replace("{transcript}", transcript)
        .replace("{emotion}", emotion)
        .replace("{confidence}", confidence);

    let value = llm
        .generate(JSON_ONLY_SYSTEM, &prompt, SCORE_TEMPERATURE)
        .await?;
    parse_scored_answer(&value)
}

/// Requires `accuracy`, `communication`, `behavior` as 0–100 integers and
/// `feedback` as a string. Missing keys are not defaulted; a malformed
/// response is a hard failure.
pub fn parse_scored_answer(value: &Value) -> Result<ScoredAnswer, ScoreError> {
    let score = RubricScore {
        accuracy: axis(value, "accuracy")?,
        communication: axis(value, "communication")?,
        behavior: axis(value, "behavior")?,
    };
    let feedback = value
        .get("feedback")
        .and_then(Value::as_str)
        .ok_or_else(|| ScoreError::Malformed("missing 'feedback'".to_string()))?
        .to_string();

    Ok(ScoredAnswer { score, feedback })
}

fn axis(value: &Value, key: &str) -> Result<i32, ScoreError> {
    let n = value
        .get(key)
        .and_then(Value::as_i64)
        .ok_or_else(|| ScoreError::Malformed(format!("missing integer '{key}'")))?;
    if !(0..=100).contains(&n) {
        return Err(ScoreError::Malformed(format!("'{key}' out of range: {n}")));
    }
    Ok(n as i32)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_a_complete_response() {
        let value = json!({
            "accuracy": 82,
            "communication": 75,
            "behavior": 90,
            "feedback": "Clear and structured answer."
        });
        let scored = parse_scored_answer(&value).unwrap();
        assert_eq!(scored.score.accuracy, 82);
        assert_eq!(scored.score.communication, 75);
        assert_eq!(scored.score.behavior, 90);
        assert_eq!(scored.feedback, "Clear and structured answer.");
    }

    #[test]
    fn missing_axis_is_a_hard_failure() {
        let value = json!({ "accuracy": 82, "behavior": 90, "feedback": "ok" });
        assert!(parse_scored_answer(&value).is_err());
    }

    #[test]
    fn missing_feedback_is_a_hard_failure() {
        let value = json!({ "accuracy": 82, "communication": 75, "behavior": 90 });
        assert!(parse_scored_answer(&value).is_err());
    }

    #[test]
    fn out_of_range_axis_is_rejected() {
        let value = json!({
            "accuracy": 182,
            "communication": 75,
            "behavior": 90,
            "feedback": "ok"
        });
        assert!(parse_scored_answer(&value).is_err());
    }

    #[test]
    fn non_integer_axis_is_rejected() {
        let value = json!({
            "accuracy": "eighty",
            "communication": 75,
            "behavior": 90,
            "feedback": "ok"
        });
        assert!(parse_scored_answer(&value).is_err());
    }
}
