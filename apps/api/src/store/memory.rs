use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::feedback::{FeedbackRow, NewFeedback};
use crate::models::message::{Message, Role};
use crate::models::session::SessionRow;
use crate::store::{FeedbackStore, MessageStore, SessionStore, FEEDBACK_ALREADY_GENERATED};

#[derive(Default)]
struct MemoryState {
    sessions: HashMap<Uuid, SessionRow>,
    messages: HashMap<Uuid, Vec<Message>>,
    feedback: HashMap<Uuid, FeedbackRow>,
    next_message_id: i64,
}

impl MemoryState {
    fn push_message(&mut self, session_id: Uuid, role: Role, content: &str) -> Message {
        self.next_message_id += 1;
        let message = Message {
            id: self.next_message_id,
            session_id,
            role,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.messages
            .entry(session_id)
            .or_default()
            .push(message.clone());
        message
    }
}

/// Process-local store. Used when `DATABASE_URL` is unset, and by tests.
/// Contents are lost on restart.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session_not_found(session_id: Uuid) -> AppError {
        AppError::NotFound(format!("Session {session_id} not found"))
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn create_session(
        &self,
        job_title: &str,
        company_name: &str,
    ) -> Result<SessionRow, AppError> {
        let session = SessionRow {
            id: Uuid::new_v4(),
            job_title: job_title.to_string(),
            company_name: company_name.to_string(),
            cv_text: None,
            job_description_text: None,
            created_at: Utc::now(),
        };
        self.state().sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, session_id: Uuid) -> Result<Option<SessionRow>, AppError> {
        Ok(self.state().sessions.get(&session_id).cloned())
    }

    async fn update_cv_text(
        &self,
        session_id: Uuid,
        cv_text: &str,
    ) -> Result<Option<SessionRow>, AppError> {
        let mut state = self.state();
        Ok(state.sessions.get_mut(&session_id).map(|session| {
            session.cv_text = Some(cv_text.to_string());
            session.clone()
        }))
    }

    async fn update_job_description(
        &self,
        session_id: Uuid,
        job_description: &str,
    ) -> Result<Option<SessionRow>, AppError> {
        let mut state = self.state();
        Ok(state.sessions.get_mut(&session_id).map(|session| {
            session.job_description_text = Some(job_description.to_string());
            session.clone()
        }))
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn append(
        &self,
        session_id: Uuid,
        role: Role,
        content: &str,
    ) -> Result<Message, AppError> {
        let mut state = self.state();
        if !state.sessions.contains_key(&session_id) {
            return Err(Self::session_not_found(session_id));
        }
        Ok(state.push_message(session_id, role, content))
    }

    async fn append_turn(
        &self,
        session_id: Uuid,
        answer: &str,
        reply: &str,
    ) -> Result<(Message, Message), AppError> {
        let mut state = self.state();
        if !state.sessions.contains_key(&session_id) {
            return Err(Self::session_not_found(session_id));
        }
        let answer = state.push_message(session_id, Role::User, answer);
        let reply = state.push_message(session_id, Role::Assistant, reply);
        Ok((answer, reply))
    }

    async fn list(&self, session_id: Uuid) -> Result<Vec<Message>, AppError> {
        Ok(self
            .state()
            .messages
            .get(&session_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn get_feedback(&self, session_id: Uuid) -> Result<Option<FeedbackRow>, AppError> {
        Ok(self.state().feedback.get(&session_id).cloned())
    }

    async fn has_feedback(&self, session_id: Uuid) -> Result<bool, AppError> {
        Ok(self.state().feedback.contains_key(&session_id))
    }

    async fn create_feedback(
        &self,
        session_id: Uuid,
        feedback: &NewFeedback,
    ) -> Result<FeedbackRow, AppError> {
        let mut state = self.state();
        if !state.sessions.contains_key(&session_id) {
            return Err(Self::session_not_found(session_id));
        }
        if state.feedback.contains_key(&session_id) {
            return Err(AppError::Validation(FEEDBACK_ALREADY_GENERATED.to_string()));
        }

        let row = FeedbackRow {
            id: Uuid::new_v4(),
            session_id,
            score: feedback.score,
            strengths: feedback.strengths.clone(),
            weaknesses: feedback.weaknesses.clone(),
            cv_improvements: feedback.cv_improvements.clone(),
            created_at: Utc::now(),
        };
        state.feedback.insert(session_id, row.clone());
        Ok(row)
    }
}
