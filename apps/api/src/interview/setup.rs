//! AI setup: resume-vs-JD analysis and base question seeding.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use crate::errors::AppError;
use crate::interview::prompts::{clip, JSON_ONLY_SYSTEM, SETUP_PROMPT_TEMPLATE};
use crate::llm::JsonGenerator;
use crate::models::session::{AiContext, SessionRow};
use crate::store::{questions, sessions};

const RESUME_PROMPT_CHARS: usize = 3000;
const JD_PROMPT_CHARS: usize = 1500;
const SETUP_TEMPERATURE: f32 = 0.2;

/// The full analysis result: match context plus the base question list.
#[derive(Debug, Deserialize)]
pub struct InterviewPlan {
    pub match_score: i32,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
    pub questions: Vec<String>,
}

/// Analyzes the resume against the job description. All four keys are
/// required; a response missing any of them is a hard failure.
pub async fn analyze_resume_and_jd(
    llm: &JsonGenerator,
    resume_text: &str,
    jd_text: &str,
) -> Result<InterviewPlan, AppError> {
    let prompt = SETUP_PROMPT_TEMPLATE
        .replace("{resume_text}", clip(resume_text, RESUME_PROMPT_CHARS))
        .replace("{jd_text}", clip(jd_text, JD_PROMPT_CHARS));

    let value = llm
        .generate(JSON_ONLY_SYSTEM, &prompt, SETUP_TEMPERATURE)
        .await
        .map_err(|e| AppError::Llm(format!("Resume analysis failed: {e}")))?;

    let plan: InterviewPlan = serde_json::from_value(value)
        .map_err(|e| AppError::Llm(format!("Malformed analysis response: {e}")))?;

    if plan.questions.is_empty() {
        return Err(AppError::Llm(
            "Analysis returned no questions".to_string(),
        ));
    }

    info!(
        match_score = plan.match_score,
        questions = plan.questions.len(),
        "resume analysis complete"
    );
    Ok(plan)
}

/// Runs AI setup for a session: persists the analysis context, transitions
/// created → questions_generated, and seeds the base questions at order 1..N.
pub async fn setup_interview(
    pool: &PgPool,
    llm: &JsonGenerator,
    session: &SessionRow,
) -> Result<usize, AppError> {
    let resume_text = session.resume_text.as_deref().unwrap_or_default();
    let plan = analyze_resume_and_jd(llm, resume_text, &session.job_description).await?;

    let ctx = AiContext {
        match_score: plan.match_score,
        strengths: plan.strengths,
        gaps: plan.gaps,
    };
    sessions::save_ai_context(pool, session.id, session.user_id, &ctx).await?;

    let count = questions::replace_for_session(pool, session.id, &plan.questions).await?;
    info!(session_id = %session.id, questions = count, "AI setup completed");
    Ok(count)
}
