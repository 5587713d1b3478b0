//! Interview HTTP handlers. Thin: validation, ownership checks, and
//! delegation into the interview services.

use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use bytes::Bytes;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::errors::AppError;
use crate::interview::progression::{self, NextQuestion};
use crate::interview::report::{build_report, Report};
use crate::interview::{resume, setup};
use crate::models::session::SessionStatus;
use crate::pipeline::queue::{AnswerJob, EnqueueError};
use crate::state::AppState;
use crate::store::{answers, questions, sessions};

/// POST /api/v1/interviews
/// Multipart: `resume` (file) + `job_description` (text).
pub async fn handle_create(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut resume_file: Option<(String, Bytes)> = None;
    let mut job_description: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "resume" => {
                let filename = field.file_name().unwrap_or("resume.pdf").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read resume: {e}")))?;
                resume_file = Some((filename, data));
            }
            "job_description" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read field: {e}")))?;
                job_description = Some(text);
            }
            _ => {}
        }
    }

    let (resume_name, resume_bytes) =
        resume_file.ok_or_else(|| AppError::Validation("Missing resume file".to_string()))?;
    let job_description = job_description
        .filter(|jd| !jd.trim().is_empty())
        .ok_or_else(|| AppError::Validation("Missing job_description".to_string()))?;

    let resume_text = resume::extract_text(&resume_name, &resume_bytes)?;
    if resume_text.is_empty() {
        warn!("resume text extraction returned empty text");
    }

    let resume_key = format!("resumes/{}/{}", user_id, Uuid::new_v4());
    put_object(&state, &resume_key, resume_bytes, "application/octet-stream").await?;

    let session = sessions::insert(
        &state.db,
        user_id,
        &resume_name,
        &resume_key,
        &resume_text,
        &job_description,
    )
    .await?;
    info!(session_id = %session.id, "interview created");

    Ok(Json(json!({
        "interview_id": session.id,
        "status": session.status
    })))
}

/// POST /api/v1/interviews/:id/setup-ai
pub async fn handle_setup_ai(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let session = sessions::get_owned(&state.db, id, user_id).await?;
    if session.status != SessionStatus::Created.as_str() {
        return Err(AppError::PreconditionFailed(
            "AI setup already completed".to_string(),
        ));
    }

    let count = setup::setup_interview(&state.db, state.llm.as_ref(), &session).await?;
    Ok(Json(json!({
        "message": "AI setup completed",
        "questions_count": count
    })))
}

#[derive(Deserialize)]
pub struct StartParams {
    pub voice: String,
}

/// POST /api/v1/interviews/:id/start?voice=male|female
pub async fn handle_start(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
    Query(params): Query<StartParams>,
) -> Result<Json<Value>, AppError> {
    progression::start_interview(&state.db, id, user_id, &params.voice).await?;
    Ok(Json(json!({
        "message": "Interview started",
        "voice": params.voice
    })))
}

/// GET /api/v1/interviews/:id/next-question
pub async fn handle_next_question(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    match progression::next_question(&state.db, id, user_id).await? {
        NextQuestion::Question {
            number,
            question_id,
            question_text,
            voice,
        } => Ok(Json(json!({
            "question_number": number,
            "question_id": question_id,
            "question_text": question_text,
            "voice": voice
        }))),
        NextQuestion::Exhausted => Ok(Json(json!({ "message": "Interview completed" }))),
    }
}

/// POST /api/v1/interviews/:id/answer-complete
pub async fn handle_answer_complete(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    progression::answer_complete(&state.db, id, user_id).await?;
    Ok(Json(json!({
        "message": "Answer recorded, moving to next question"
    })))
}

/// POST /api/v1/interviews/:id/questions/:question_id/skip
pub async fn handle_skip(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    progression::skip_question(&state.db, id, user_id, question_id).await?;
    Ok(Json(json!({ "message": "Question skipped" })))
}

/// POST /api/v1/interviews/:id/end
pub async fn handle_end(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    progression::end_interview(&state.db, id, user_id).await?;
    Ok(Json(json!({ "message": "Interview ended successfully" })))
}

/// POST /api/v1/interviews/:id/questions/:question_id/upload-video
/// Multipart: `video` (file). Stores the media and triggers one analysis run.
pub async fn handle_upload_video(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    sessions::get_owned(&state.db, id, user_id).await?;
    questions::get(&state.db, question_id, id).await?;

    let mut video: Option<(String, Bytes)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "video" {
            let filename = field.file_name().unwrap_or("answer.webm").to_string();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read video: {e}")))?;
            video = Some((filename, data));
        }
    }
    let (filename, data) =
        video.ok_or_else(|| AppError::Validation("Missing video file".to_string()))?;
    if data.is_empty() {
        return Err(AppError::Validation("Video file is empty".to_string()));
    }

    let ext = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "webm".to_string());
    let video_key = format!("videos/{id}/{question_id}/{}.{ext}", Uuid::new_v4());
    put_object(&state, &video_key, data, "video/webm").await?;

    answers::insert_uploaded(&state.db, id, question_id, &video_key).await?;

    state
        .pipeline
        .enqueue(AnswerJob {
            session_id: id,
            question_id,
            video_key,
        })
        .map_err(|e| match e {
            EnqueueError::AlreadyInFlight => AppError::PreconditionFailed(e.to_string()),
            EnqueueError::QueueFull | EnqueueError::Closed => {
                AppError::Internal(anyhow::anyhow!(e))
            }
        })?;

    info!(session_id = %id, question_id = %question_id, "video uploaded, analysis scheduled");
    Ok(Json(json!({
        "message": "Video uploaded successfully. Processing started."
    })))
}

/// GET /api/v1/interviews/:id/questions/:question_id/answer-status
pub async fn handle_answer_status(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path((id, question_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Value>, AppError> {
    sessions::get_owned(&state.db, id, user_id).await?;

    match answers::get(&state.db, id, question_id).await? {
        None => Ok(Json(json!({
            "status": "missing",
            "has_transcript": false,
            "has_score": false,
            "has_feedback": false
        }))),
        Some(answer) => Ok(Json(json!({
            "status": answer.status,
            "has_transcript": answer.transcript.is_some(),
            "has_score": answer.score.is_some(),
            "has_feedback": answer.feedback.is_some(),
            "error": answer.error
        }))),
    }
}

/// GET /api/v1/interviews/:id/report
pub async fn handle_report(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Report>, AppError> {
    let session = sessions::get_owned(&state.db, id, user_id).await?;
    let question_rows = questions::list_ordered(&state.db, id).await?;
    let answer_rows = answers::list_for_session(&state.db, id).await?;

    let report = build_report(
        session.ai_context.as_ref().map(|c| &c.0),
        &question_rows,
        &answer_rows,
    );
    Ok(Json(report))
}

async fn put_object(
    state: &AppState,
    key: &str,
    body: Bytes,
    content_type: &str,
) -> Result<(), AppError> {
    state
        .s3
        .put_object()
        .bucket(&state.config.s3_bucket)
        .key(key)
        .body(aws_sdk_s3::primitives::ByteStream::from(body))
        .content_type(content_type)
        .send()
        .await
        .map_err(|e| AppError::Storage(format!("S3 upload failed: {e}")))?;
    Ok(())
}
