pub mod health;
pub mod interviews;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/interviews", post(interviews::handle_create))
        .route(
            "/api/v1/interviews/:id/setup-ai",
            post(interviews::handle_setup_ai),
        )
        .route(
            "/api/v1/interviews/:id/start",
            post(interviews::handle_start),
        )
        .route(
            "/api/v1/interviews/:id/next-question",
            get(interviews::handle_next_question),
        )
        .route(
            "/api/v1/interviews/:id/answer-complete",
            post(interviews::handle_answer_complete),
        )
        .route("/api/v1/interviews/:id/end", post(interviews::handle_end))
        .route(
            "/api/v1/interviews/:id/report",
            get(interviews::handle_report),
        )
        .route(
            "/api/v1/interviews/:id/questions/:question_id/skip",
            post(interviews::handle_skip),
        )
        .route(
            "/api/v1/interviews/:id/questions/:question_id/upload-video",
            post(interviews::handle_upload_video),
        )
        .route(
            "/api/v1/interviews/:id/questions/:question_id/answer-status",
            get(interviews::handle_answer_status),
        )
        .with_state(state)
}
