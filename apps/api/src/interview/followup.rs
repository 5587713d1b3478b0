//! Adaptive follow-up gating and generation.

use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::config::FollowupGates;
use crate::interview::prompts::{clip, FOLLOWUP_PROMPT_TEMPLATE, JSON_ONLY_SYSTEM};
use crate::llm::{JsonGenerator, LlmError};
use crate::models::answer::RubricScore;

const FOLLOWUP_TEMPERATURE: f32 = 0.2;
const TRANSCRIPT_PROMPT_CHARS: usize = 2000;
const JD_PROMPT_CHARS: usize = 800;
const FEEDBACK_PROMPT_CHARS: usize = 600;

#[derive(Debug, Error)]
pub enum FollowupError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("decider response missing 'should_follow_up'")]
    Malformed,
}

/// Whether a follow-up is worth attempting at all. The first true condition
/// short-circuits; a pass on all three means no LLM call is made, which is
/// the common case.
pub fn needs_followup(transcript: &str, score: &RubricScore, gates: &FollowupGates) -> bool {
    let words = transcript.split_whitespace().count();
    words < gates.min_transcript_words
        || score.accuracy < gates.accuracy_below
        || score.communication < gates.communication_below
}

#[derive(Debug, Clone)]
pub struct FollowupDecision {
    pub should_follow_up: bool,
    pub follow_up_question: String,
    pub reason: String,
}

pub async fn decide_followup(
    llm: &JsonGenerator,
    question: &str,
    transcript: &str,
    score: &RubricScore,
    feedback: &str,
    job_description: &str,
    gaps: &[String],
) -> Result<FollowupDecision, FollowupError> {
    let score_line = format!(
        "accuracy={}, communication={}, behavior={}",
        score.accuracy, score.communication, score.behavior
    );
    let prompt = FOLLOWUP_PROMPT_TEMPLATE
        .replace("{jd_text}", clip(job_description, JD_PROMPT_CHARS))
        .replace("{gaps}", &gaps.join(", "))
        .replace("{question}", question)
        .replace("{transcript}", clip(transcript, TRANSCRIPT_PROMPT_CHARS))
        .replace("{score}", &score_line)
        .replace("{feedback}", clip(feedback, FEEDBACK_PROMPT_CHARS));

    let value = llm
        .generate(JSON_ONLY_SYSTEM, &prompt, FOLLOWUP_TEMPERATURE)
        .await?;
    let decision = parse_decision(&value).ok_or(FollowupError::Malformed)?;
    debug!(
        should_follow_up = decision.should_follow_up,
        "follow-up decision received"
    );
    Ok(decision)
}

/// Requires `should_follow_up`; `follow_up_question` and `reason` default to
/// empty. On a negative decision the question text is forced empty so the
/// sequencer can never receive a stray question.
pub fn parse_decision(value: &Value) -> Option<FollowupDecision> {
    let should_follow_up = value.get("should_follow_up")?.as_bool()?;
    let mut follow_up_question = value
        .get("follow_up_question")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    let reason = value
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    if !should_follow_up {
        follow_up_question.clear();
    }

    Some(FollowupDecision {
        should_follow_up,
        follow_up_question,
        reason,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn gates() -> FollowupGates {
        FollowupGates::default()
    }

    fn score(accuracy: i32, communication: i32) -> RubricScore {
        RubricScore {
            accuracy,
            communication,
            behavior: 80,
        }
    }

    fn long_answer() -> String {
        // Exactly 30 words: one past the short-transcript gate.
        vec!["word"; 30].join(" ")
    }

    #[test]
    fn short_transcript_triggers_followup() {
        assert!(needs_followup("too short", &score(90, 90), &gates()));
    }

    #[test]
    fn low_accuracy_triggers_followup() {
        assert!(needs_followup(&long_answer(), &score(59, 90), &gates()));
    }

    #[test]
    fn low_communication_triggers_followup() {
        assert!(needs_followup(&long_answer(), &score(90, 54), &gates()));
    }

    #[test]
    fn strong_answer_passes_all_gates() {
        assert!(!needs_followup(&long_answer(), &score(60, 55), &gates()));
    }

    #[test]
    fn negative_decision_forces_empty_question() {
        let value = json!({
            "should_follow_up": false,
            "follow_up_question": "What did you mean?",
            "reason": "answer was complete"
        });
        let decision = parse_decision(&value).unwrap();
        assert!(!decision.should_follow_up);
        assert_eq!(decision.follow_up_question, "");
        assert_eq!(decision.reason, "answer was complete");
    }

    #[test]
    fn missing_optional_fields_default_to_empty() {
        let value = json!({ "should_follow_up": true });
        let decision = parse_decision(&value).unwrap();
        assert!(decision.should_follow_up);
        assert_eq!(decision.follow_up_question, "");
        assert_eq!(decision.reason, "");
    }

    #[test]
    fn missing_flag_is_rejected() {
        let value = json!({ "follow_up_question": "And then?" });
        assert!(parse_decision(&value).is_none());
    }
}
