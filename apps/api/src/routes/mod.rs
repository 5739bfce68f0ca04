pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::interview::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/generate_questions",
            post(handlers::handle_generate_questions).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route(
            "/generate_follow_up",
            post(handlers::handle_generate_follow_up),
        )
        .route("/generate_feedback", post(handlers::handle_generate_feedback))
        .route("/tts", post(handlers::handle_tts))
        .with_state(state)
}
