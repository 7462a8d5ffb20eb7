use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::feedback::prompts::build_feedback_prompt;
use crate::llm_client::AiClient;
use crate::models::feedback::FeedbackRow;
use crate::sessions::lock::SessionLocks;
use crate::store::{FeedbackStore, MessageStore, SessionStore, FEEDBACK_ALREADY_GENERATED};

/// One-shot evaluation of a finished (or abandoned) interview.
///
/// The per-session lock keeps two concurrent requests in one process from both
/// paying for a generation. The store's uniqueness check still decides which
/// insert wins across processes.
#[derive(Clone)]
pub struct FeedbackService {
    sessions: Arc<dyn SessionStore>,
    messages: Arc<dyn MessageStore>,
    feedback: Arc<dyn FeedbackStore>,
    ai: AiClient,
    locks: Arc<SessionLocks>,
}

impl FeedbackService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        messages: Arc<dyn MessageStore>,
        feedback: Arc<dyn FeedbackStore>,
        ai: AiClient,
        locks: Arc<SessionLocks>,
    ) -> Self {
        Self {
            sessions,
            messages,
            feedback,
            ai,
            locks,
        }
    }

    pub async fn generate_feedback(&self, session_id: Uuid) -> Result<FeedbackRow, AppError> {
        let session = self
            .sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))?;

        let _guard = self.locks.acquire(session_id).await;

        if self.feedback.has_feedback(session_id).await? {
            return Err(AppError::Validation(FEEDBACK_ALREADY_GENERATED.to_string()));
        }

        let transcript = self.messages.list(session_id).await?;
        if transcript.is_empty() {
            return Err(AppError::Validation(
                "Cannot generate feedback for an empty interview".to_string(),
            ));
        }

        let prompt = build_feedback_prompt(
            &session.job_title,
            session.cv_text.as_deref().unwrap_or_default(),
            session.job_description_text.as_deref().unwrap_or_default(),
            &transcript,
        );
        let feedback = self.ai.generate_feedback(&prompt).await?;

        let row = self.feedback.create_feedback(session_id, &feedback).await?;
        info!(
            "Feedback stored for session {session_id} (score {})",
            row.score
        );
        Ok(row)
    }

    pub async fn get_feedback(&self, session_id: Uuid) -> Result<FeedbackRow, AppError> {
        self.feedback
            .get_feedback(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("No feedback for session {session_id}")))
    }
}
