use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::orchestrator::AnswerOutcome;
use crate::interview::progress::Progress;
use crate::models::message::Message;
use crate::state::AppState;

#[derive(Serialize)]
pub struct StartInterviewResponse {
    pub question: String,
}

#[derive(Deserialize)]
pub struct SubmitAnswerRequest {
    pub answer: String,
}

/// POST /api/v1/sessions/:id/interview/start
pub async fn handle_start_interview(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<StartInterviewResponse>, AppError> {
    let question = state.interviews.start_interview(session_id).await?;
    Ok(Json(StartInterviewResponse { question }))
}

/// POST /api/v1/sessions/:id/interview/answers
pub async fn handle_submit_answer(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<SubmitAnswerRequest>,
) -> Result<Json<AnswerOutcome>, AppError> {
    let outcome = state
        .interviews
        .submit_answer(session_id, &req.answer)
        .await?;
    Ok(Json(outcome))
}

/// GET /api/v1/sessions/:id/interview/progress
pub async fn handle_get_progress(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Progress>, AppError> {
    Ok(Json(state.interviews.get_progress(session_id).await?))
}

/// GET /api/v1/sessions/:id/interview/messages
pub async fn handle_get_messages(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, AppError> {
    Ok(Json(state.interviews.get_transcript(session_id).await?))
}
