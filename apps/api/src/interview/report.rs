//! Report aggregation. Pure over the session's rows; recomputed on every
//! request, never cached.

use serde::Serialize;
use uuid::Uuid;

use crate::models::answer::{AnswerRow, AnswerStatus};
use crate::models::question::QuestionRow;
use crate::models::session::AiContext;

const HIRE_TECHNICAL_FLOOR: f64 = 75.0;
const HIRE_BEHAVIOR_FLOOR: f64 = 70.0;
const BORDERLINE_TECHNICAL_FLOOR: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Hire,
    Borderline,
    Reject,
}

#[derive(Debug, Clone, Serialize)]
pub struct AxisScores {
    pub technical: f64,
    pub communication: f64,
    pub behavior: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionFeedback {
    pub question_id: Uuid,
    pub accuracy: i32,
    pub communication: i32,
    pub behavior: i32,
    pub feedback: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Report {
    /// No questions attached yet; there is nothing to aggregate.
    Incomplete { message: String },
    /// At least one answer exists but is not scored yet. All-or-nothing:
    /// no partial report is ever returned.
    Processing { message: String },
    Completed {
        decision: Decision,
        scores: AxisScores,
        strengths: Vec<String>,
        gaps: Vec<String>,
        questions: Vec<QuestionFeedback>,
        summary: String,
    },
}

pub fn decide(technical: f64, behavior: f64) -> Decision {
    if technical >= HIRE_TECHNICAL_FLOOR && behavior >= HIRE_BEHAVIOR_FLOOR {
        Decision::Hire
    } else if technical >= BORDERLINE_TECHNICAL_FLOOR {
        Decision::Borderline
    } else {
        Decision::Reject
    }
}

fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Builds the report over all questions in ascending order.
///
/// The denominator is the total question count: a skipped or never-reached
/// question weighs the same zero for everyone. A present-but-unscored answer
/// makes the whole report `processing`.
pub fn build_report(
    ai_context: Option<&AiContext>,
    questions: &[QuestionRow],
    answers: &[AnswerRow],
) -> Report {
    if questions.is_empty() {
        return Report::Incomplete {
            message: "Interview answers not available yet".to_string(),
        };
    }

    let total = questions.len() as f64;
    let mut accuracy_sum: i64 = 0;
    let mut communication_sum: i64 = 0;
    let mut behavior_sum: i64 = 0;
    let mut feedback_rows = Vec::with_capacity(questions.len());

    for question in questions {
        let answer = answers.iter().find(|a| a.question_id == question.id);
        let (score, feedback) = match answer {
            None => (None, "No answer".to_string()),
            Some(a) if a.status == AnswerStatus::Skipped.as_str() => {
                (None, "Skipped".to_string())
            }
            Some(a) => match &a.score {
                None => {
                    return Report::Processing {
                        message: "Interview analysis is still in progress".to_string(),
                    }
                }
                Some(score) => (Some(score.0), a.feedback.clone().unwrap_or_default()),
            },
        };

        let score = score.unwrap_or_default();
        accuracy_sum += i64::from(score.accuracy);
        communication_sum += i64::from(score.communication);
        behavior_sum += i64::from(score.behavior);
        feedback_rows.push(QuestionFeedback {
            question_id: question.id,
            accuracy: score.accuracy,
            communication: score.communication,
            behavior: score.behavior,
            feedback,
        });
    }

    let technical = round1(accuracy_sum as f64 / total);
    let communication = round1(communication_sum as f64 / total);
    let behavior = round1(behavior_sum as f64 / total);

    let decision = decide(technical, behavior);
    let summary = match decision {
        Decision::Hire => "Strong technical foundation with confident communication.",
        Decision::Borderline => "Candidate shows partial fit and needs improvement.",
        Decision::Reject => "Candidate does not currently meet role expectations.",
    }
    .to_string();

    Report::Completed {
        decision,
        scores: AxisScores {
            technical,
            communication,
            behavior,
        },
        strengths: ai_context.map(|c| c.strengths.clone()).unwrap_or_default(),
        gaps: ai_context.map(|c| c.gaps.clone()).unwrap_or_default(),
        questions: feedback_rows,
        summary,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use sqlx::types::Json;

    use crate::models::answer::RubricScore;

    use super::*;

    fn question(order: i32) -> QuestionRow {
        QuestionRow {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            order,
            question_text: format!("Question {order}"),
            kind: "base".to_string(),
            parent_question_id: None,
            depth: 0,
            created_by: "ai".to_string(),
            created_at: Utc::now(),
        }
    }

    fn answer(question_id: Uuid, status: &str, score: Option<RubricScore>) -> AnswerRow {
        AnswerRow {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            question_id,
            video_key: None,
            status: status.to_string(),
            transcript: None,
            emotion: None,
            confidence: None,
            score: score.map(Json),
            feedback: Some("ok".to_string()),
            error: None,
            created_at: Utc::now(),
            processing_started_at: None,
            processed_at: None,
            completed_at: None,
        }
    }

    fn uniform(value: i32) -> RubricScore {
        RubricScore {
            accuracy: value,
            communication: value,
            behavior: value,
        }
    }

    #[test]
    fn skipped_and_unanswered_share_the_denominator() {
        // 5 questions: 3 scored at 80, 1 skipped, 1 never answered.
        let questions: Vec<QuestionRow> = (1..=5).map(question).collect();
        let mut answers = vec![
            answer(questions[0].id, "completed", Some(uniform(80))),
            answer(questions[1].id, "completed", Some(uniform(80))),
            answer(questions[2].id, "completed", Some(uniform(80))),
            answer(questions[3].id, "skipped", Some(RubricScore::ZERO)),
        ];
        answers[3].feedback = None;

        match build_report(None, &questions, &answers) {
            Report::Completed {
                scores, questions, ..
            } => {
                assert_eq!(scores.technical, 48.0);
                assert_eq!(questions[3].feedback, "Skipped");
                assert_eq!(questions[4].feedback, "No answer");
            }
            other => panic!("expected completed report, got {other:?}"),
        }
    }

    #[test]
    fn unscored_answer_makes_the_whole_report_processing() {
        let questions: Vec<QuestionRow> = (1..=2).map(question).collect();
        let answers = vec![
            answer(questions[0].id, "completed", Some(uniform(90))),
            answer(questions[1].id, "processing", None),
        ];
        assert!(matches!(
            build_report(None, &questions, &answers),
            Report::Processing { .. }
        ));
    }

    #[test]
    fn no_questions_is_incomplete() {
        assert!(matches!(
            build_report(None, &[], &[]),
            Report::Incomplete { .. }
        ));
    }

    #[test]
    fn hire_needs_both_floors() {
        assert_eq!(decide(76.0, 71.0), Decision::Hire);
        assert_eq!(decide(76.0, 69.0), Decision::Borderline);
    }

    #[test]
    fn borderline_needs_only_the_technical_floor() {
        assert_eq!(decide(65.0, 50.0), Decision::Borderline);
    }

    #[test]
    fn below_borderline_is_reject() {
        assert_eq!(decide(40.0, 90.0), Decision::Reject);
    }

    #[test]
    fn scores_round_to_one_decimal() {
        // 2 questions, accuracies 81 and 80 → 80.5.
        let questions: Vec<QuestionRow> = (1..=2).map(question).collect();
        let answers = vec![
            answer(questions[0].id, "completed", Some(uniform(81))),
            answer(questions[1].id, "completed", Some(uniform(80))),
        ];
        match build_report(None, &questions, &answers) {
            Report::Completed { scores, .. } => assert_eq!(scores.technical, 80.5),
            other => panic!("expected completed report, got {other:?}"),
        }
    }

    #[test]
    fn context_strengths_and_gaps_flow_through() {
        let questions = vec![question(1)];
        let answers = vec![answer(questions[0].id, "completed", Some(uniform(80)))];
        let ctx = AiContext {
            match_score: 70,
            strengths: vec!["Rust".to_string()],
            gaps: vec!["Kubernetes".to_string()],
        };
        match build_report(Some(&ctx), &questions, &answers) {
            Report::Completed {
                strengths, gaps, ..
            } => {
                assert_eq!(strengths, vec!["Rust"]);
                assert_eq!(gaps, vec!["Kubernetes"]);
            }
            other => panic!("expected completed report, got {other:?}"),
        }
    }
}
