//! The answer-analysis orchestrator. One run drives a single uploaded
//! answer through ingest → audio → transcript → emotion → score →
//! follow-up → completed, or to `failed` with the error recorded. Stages do
//! not retry; a run reaches a terminal status exactly once.

pub mod queue;

use std::path::Path;
use std::sync::Arc;

use sqlx::PgPool;
use tempfile::TempDir;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::analysis::{emotion, AudioExtractor, EmotionClassifier, FrameSampler, Transcriber};
use crate::config::FollowupGates;
use crate::interview::scoring::ScoredAnswer;
use crate::interview::{followup, scoring, sequencer};
use crate::llm::JsonGenerator;
use crate::models::question::QuestionRow;
use crate::store::{answers, questions, sessions};

use self::queue::AnswerJob;

/// Everything a pipeline run needs. Built once at startup and shared by the
/// worker pool.
pub struct PipelineContext {
    pub db: PgPool,
    pub s3: aws_sdk_s3::Client,
    pub bucket: String,
    pub llm: Arc<JsonGenerator>,
    pub audio: Arc<dyn AudioExtractor>,
    pub frames: Arc<dyn FrameSampler>,
    pub transcriber: Arc<dyn Transcriber>,
    pub emotion: Arc<dyn EmotionClassifier>,
    pub gates: FollowupGates,
}

#[derive(Debug, Error)]
enum StageError {
    #[error("ingest failed: {0}")]
    Ingest(String),

    #[error("audio extraction failed: {0}")]
    Extraction(String),

    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("scoring failed: {0}")]
    Scoring(String),

    #[error("database error: {0}")]
    Database(String),
}

/// Entry point for one run. Never panics the worker; every outcome lands on
/// the answer row as a terminal status.
pub async fn run(ctx: Arc<PipelineContext>, job: AnswerJob) {
    info!(
        session_id = %job.session_id,
        question_id = %job.question_id,
        "pipeline run started"
    );

    // Soft lock: uploaded → processing. Losing the claim means another run
    // already owns this answer (or it is already terminal).
    let claimed = match answers::claim_processing(&ctx.db, job.session_id, job.question_id).await {
        Ok(claimed) => claimed,
        Err(e) => {
            error!(error = %e, "could not claim answer for processing");
            return;
        }
    };
    if !claimed {
        warn!(
            session_id = %job.session_id,
            question_id = %job.question_id,
            "answer not in uploaded state, dropping run"
        );
        return;
    }

    // The working directory outlives the whole run and is removed when this
    // guard drops, on every exit path.
    let workdir = match TempDir::new() {
        Ok(workdir) => workdir,
        Err(e) => {
            let message = format!("ingest failed: could not create working directory: {e}");
            error!(error = %e, "pipeline run failed");
            if let Err(e) =
                answers::mark_failed(&ctx.db, job.session_id, job.question_id, &message).await
            {
                error!(error = %e, "could not record pipeline failure");
            }
            return;
        }
    };

    match process(&ctx, &job, workdir.path()).await {
        Ok(()) => {
            if let Err(e) = answers::mark_completed(&ctx.db, job.session_id, job.question_id).await
            {
                error!(error = %e, "could not finalize answer");
            } else {
                info!(
                    session_id = %job.session_id,
                    question_id = %job.question_id,
                    "pipeline run completed"
                );
            }
        }
        Err(stage) => {
            error!(error = %stage, "pipeline run failed");
            if let Err(e) =
                answers::mark_failed(&ctx.db, job.session_id, job.question_id, &stage.to_string())
                    .await
            {
                error!(error = %e, "could not record pipeline failure");
            }
        }
    }
}

async fn process(ctx: &PipelineContext, job: &AnswerJob, workdir: &Path) -> Result<(), StageError> {
    // 1. Working copy of the uploaded media.
    let video_path = workdir.join("answer-video");
    fetch_object(ctx, &job.video_key, &video_path)
        .await
        .map_err(StageError::Ingest)?;

    // 2. Mono 16 kHz audio.
    let audio_path = workdir.join("answer.wav");
    ctx.audio
        .extract(&video_path, &audio_path)
        .await
        .map_err(|e| StageError::Extraction(e.to_string()))?;

    // 3. Transcript.
    let transcript = ctx
        .transcriber
        .transcribe(&audio_path)
        .await
        .map_err(|e| StageError::Transcription(e.to_string()))?;

    // 4. Emotion mode over sampled frames; degrades to neutral/low rather
    // than failing the run.
    let frames_dir = workdir.join("frames");
    let (emotion_label, confidence) = emotion::analyze(
        ctx.frames.as_ref(),
        ctx.emotion.as_ref(),
        &video_path,
        &frames_dir,
    )
    .await;

    // 5. Rubric scoring against the question text. Results are persisted
    // while status stays `processing`; they are not final yet.
    let question = questions::get(&ctx.db, job.question_id, job.session_id)
        .await
        .map_err(|e| StageError::Scoring(format!("question lookup: {e}")))?;
    let scored = scoring::score_answer(
        ctx.llm.as_ref(),
        &question.question_text,
        &transcript,
        &emotion_label,
        &confidence,
    )
    .await
    .map_err(|e| StageError::Scoring(e.to_string()))?;

    answers::save_analysis(
        &ctx.db,
        job.session_id,
        job.question_id,
        &transcript,
        &emotion_label,
        &confidence,
        &scored.score,
        &scored.feedback,
    )
    .await
    .map_err(|e| StageError::Database(e.to_string()))?;

    // 6. Best-effort follow-up; a decline or error never fails the run.
    match try_followup(ctx, job, &question, &transcript, &scored).await {
        Ok(inserted) => info!(order = inserted.order, "follow-up inserted"),
        Err(skip) => info!(reason = %skip, "follow-up skipped"),
    }

    Ok(())
}

/// The ways a follow-up legitimately does not happen. Expected outcomes, not
/// failures.
#[derive(Debug, Error)]
enum FollowupSkip {
    #[error("current question is already a follow-up")]
    ParentIsFollowup,

    #[error("a follow-up already exists for this parent")]
    AlreadyExists,

    #[error("gate says not needed")]
    NotNeeded,

    #[error("model said no")]
    Declined,

    #[error("empty question")]
    EmptyQuestion,

    #[error("{0}")]
    Failed(String),
}

async fn try_followup(
    ctx: &PipelineContext,
    job: &AnswerJob,
    question: &QuestionRow,
    transcript: &str,
    scored: &ScoredAnswer,
) -> Result<QuestionRow, FollowupSkip> {
    if !sequencer::can_parent_followup(question) {
        return Err(FollowupSkip::ParentIsFollowup);
    }

    let existing = questions::followup_for_parent(&ctx.db, job.session_id, question.id)
        .await
        .map_err(|e| FollowupSkip::Failed(e.to_string()))?;
    if existing.is_some() {
        return Err(FollowupSkip::AlreadyExists);
    }

    if !followup::needs_followup(transcript, &scored.score, &ctx.gates) {
        return Err(FollowupSkip::NotNeeded);
    }

    let session = sessions::get(&ctx.db, job.session_id)
        .await
        .map_err(|e| FollowupSkip::Failed(e.to_string()))?;
    let gaps = session
        .ai_context
        .as_ref()
        .map(|c| c.0.gaps.clone())
        .unwrap_or_default();

    let decision = followup::decide_followup(
        ctx.llm.as_ref(),
        &question.question_text,
        transcript,
        &scored.score,
        &scored.feedback,
        &session.job_description,
        &gaps,
    )
    .await
    .map_err(|e| FollowupSkip::Failed(e.to_string()))?;

    if !decision.should_follow_up {
        return Err(FollowupSkip::Declined);
    }
    if decision.follow_up_question.is_empty() {
        return Err(FollowupSkip::EmptyQuestion);
    }

    sequencer::insert_followup(&ctx.db, question, &decision.follow_up_question)
        .await
        .map_err(|e| FollowupSkip::Failed(e.to_string()))
}

async fn fetch_object(ctx: &PipelineContext, key: &str, dest: &Path) -> Result<(), String> {
    let object = ctx
        .s3
        .get_object()
        .bucket(&ctx.bucket)
        .key(key)
        .send()
        .await
        .map_err(|e| format!("S3 download failed: {e}"))?;
    let data = object
        .body
        .collect()
        .await
        .map_err(|e| format!("S3 body read failed: {e}"))?;
    tokio::fs::write(dest, data.into_bytes())
        .await
        .map_err(|e| format!("could not write working copy: {e}"))
}
