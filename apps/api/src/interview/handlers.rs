//! Axum route handlers for the interview API.

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Multipart, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::extractors::document::extract_text;
use crate::interview::prompts::{FEEDBACK_PROMPT, FOLLOW_UP_PROMPT, QUESTIONS_PROMPT};
use crate::interview::splitter::split_lines;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct QuestionsResponse {
    pub questions: Vec<String>,
    pub resume_text: String,
}

/// Fields are optional so a missing key is reported as a validation error
/// naming it, rather than a generic deserialization failure.
#[derive(Debug, Deserialize)]
pub struct FollowUpRequest {
    pub question: Option<String>,
    pub response: Option<String>,
    pub resume_text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct FollowUpResponse {
    pub follow_up_questions: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub interview_history: Value,
}

#[derive(Debug, Serialize)]
pub struct FeedbackResponse {
    pub feedback: String,
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /generate_questions
///
/// Multipart upload with a `file` field holding the resume PDF. Returns the
/// generated questions together with the extracted resume text.
pub async fn handle_generate_questions(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<QuestionsResponse>, AppError> {
    let mut multipart = multipart?;
    let mut document = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some("file") {
            document = Some(field.bytes().await?);
            break;
        }
    }
    let document = document.ok_or_else(|| AppError::Validation("No file uploaded".to_string()))?;

    let resume_text = extract_text(document).await?;
    let prompt = QUESTIONS_PROMPT.render(&[("resume_text", resume_text.as_str())])?;
    let raw = state.inference.infer(&prompt).await?;
    let questions = split_lines(&raw);

    info!(count = questions.len(), "Generated interview questions");
    Ok(Json(QuestionsResponse {
        questions,
        resume_text,
    }))
}

/// POST /generate_follow_up
pub async fn handle_generate_follow_up(
    State(state): State<AppState>,
    payload: Result<Json<FollowUpRequest>, JsonRejection>,
) -> Result<Json<FollowUpResponse>, AppError> {
    let Json(request) = payload?;

    let (Some(question), Some(response), Some(resume_text)) =
        (request.question, request.response, request.resume_text)
    else {
        return Err(AppError::Validation(
            "Missing \"question\", \"response\" or \"resume_text\" key in request data"
                .to_string(),
        ));
    };

    let prompt = FOLLOW_UP_PROMPT.render(&[
        ("question", question.as_str()),
        ("response", response.as_str()),
        ("resume_text", resume_text.as_str()),
    ])?;
    let raw = state.inference.infer(&prompt).await?;

    Ok(Json(FollowUpResponse {
        follow_up_questions: split_lines(&raw),
    }))
}

/// POST /generate_feedback
///
/// `interview_history` may be free text or any JSON structure; structured
/// history is handed to the model as pretty-printed JSON.
pub async fn handle_generate_feedback(
    State(state): State<AppState>,
    payload: Result<Json<FeedbackRequest>, JsonRejection>,
) -> Result<Json<FeedbackResponse>, AppError> {
    let Json(request) = payload?;
    let history = history_text(request.interview_history)?;

    let prompt = FEEDBACK_PROMPT.render(&[("interview_history", history.as_str())])?;
    let feedback = state.inference.infer(&prompt).await?;

    Ok(Json(FeedbackResponse { feedback }))
}

/// POST /tts
///
/// Returns MP3 bytes straight from memory.
pub async fn handle_tts(
    State(state): State<AppState>,
    payload: Result<Json<TtsRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload?;
    let text = request
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Validation("No text provided".to_string()))?;

    let audio = state
        .speech
        .synthesize(&text, &state.config.tts_lang)
        .await?;

    Ok(([(header::CONTENT_TYPE, "audio/mpeg")], audio).into_response())
}

fn history_text(history: Value) -> Result<String, AppError> {
    match history {
        Value::Null => Err(AppError::Validation(
            "Missing \"interview_history\" key in request data".to_string(),
        )),
        Value::String(text) => Ok(text),
        structured => serde_json::to_string_pretty(&structured)
            .map_err(|e| AppError::Internal(e.into())),
    }
}
