use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::feedback::FeedbackRow;
use crate::state::AppState;

/// POST /api/v1/sessions/:id/feedback
pub async fn handle_generate_feedback(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<FeedbackRow>, AppError> {
    Ok(Json(state.feedback.generate_feedback(session_id).await?))
}

/// GET /api/v1/sessions/:id/feedback
pub async fn handle_get_feedback(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<FeedbackRow>, AppError> {
    Ok(Json(state.feedback.get_feedback(session_id).await?))
}
