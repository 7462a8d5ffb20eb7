use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::session::SessionRow;
use crate::state::AppState;

const MAX_NAME_CHARS: usize = 200;

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub job_title: String,
    pub company_name: String,
}

#[derive(Deserialize)]
pub struct AttachTextRequest {
    pub text: String,
}

/// Trims `value` and enforces it is non-blank and at most `MAX_NAME_CHARS` long.
fn validate_name<'a>(value: &'a str, label: &str) -> Result<&'a str, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{label} is required")));
    }
    if value.chars().count() > MAX_NAME_CHARS {
        return Err(AppError::Validation(format!(
            "{label} must be at most {MAX_NAME_CHARS} characters"
        )));
    }
    Ok(value)
}

fn validate_document<'a>(value: &'a str, label: &str) -> Result<&'a str, AppError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{label} cannot be empty")));
    }
    Ok(value)
}

fn session_not_found(session_id: Uuid) -> AppError {
    AppError::NotFound(format!("Session {session_id} not found"))
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Result<(StatusCode, Json<SessionRow>), AppError> {
    let job_title = validate_name(&req.job_title, "Job title")?;
    let company_name = validate_name(&req.company_name, "Company name")?;

    let session = state
        .sessions
        .create_session(job_title, company_name)
        .await?;
    info!("Created session {} for {job_title} at {company_name}", session.id);

    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<SessionRow>, AppError> {
    let session = state
        .sessions
        .get_session(session_id)
        .await?
        .ok_or_else(|| session_not_found(session_id))?;
    Ok(Json(session))
}

/// PUT /api/v1/sessions/:id/cv
pub async fn handle_attach_cv(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<AttachTextRequest>,
) -> Result<Json<SessionRow>, AppError> {
    let text = validate_document(&req.text, "CV text")?;
    let session = state
        .sessions
        .update_cv_text(session_id, text)
        .await?
        .ok_or_else(|| session_not_found(session_id))?;
    Ok(Json(session))
}

/// PUT /api/v1/sessions/:id/job-description
pub async fn handle_attach_job_description(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(req): Json<AttachTextRequest>,
) -> Result<Json<SessionRow>, AppError> {
    let text = validate_document(&req.text, "Job description")?;
    let session = state
        .sessions
        .update_job_description(session_id, text)
        .await?
        .ok_or_else(|| session_not_found(session_id))?;
    Ok(Json(session))
}
