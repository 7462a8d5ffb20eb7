//! Storage seams for sessions, transcripts and feedback.
//!
//! The interview core depends only on these traits: ordered-append for messages,
//! key-value for sessions and feedback. `PgStore` backs production and
//! `MemoryStore` backs local runs without a database and the test suites.

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::feedback::{FeedbackRow, NewFeedback};
use crate::models::message::{Message, Role};
use crate::models::session::SessionRow;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub const FEEDBACK_ALREADY_GENERATED: &str =
    "Feedback has already been generated for this session";

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create_session(
        &self,
        job_title: &str,
        company_name: &str,
    ) -> Result<SessionRow, AppError>;

    async fn get_session(&self, session_id: Uuid) -> Result<Option<SessionRow>, AppError>;

    /// Returns `None` if the session does not exist.
    async fn update_cv_text(
        &self,
        session_id: Uuid,
        cv_text: &str,
    ) -> Result<Option<SessionRow>, AppError>;

    /// Returns `None` if the session does not exist.
    async fn update_job_description(
        &self,
        session_id: Uuid,
        job_description: &str,
    ) -> Result<Option<SessionRow>, AppError>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    async fn append(
        &self,
        session_id: Uuid,
        role: Role,
        content: &str,
    ) -> Result<Message, AppError>;

    /// Appends a candidate answer and the interviewer's reply as one unit: either
    /// both are stored, in that order, or neither is.
    async fn append_turn(
        &self,
        session_id: Uuid,
        answer: &str,
        reply: &str,
    ) -> Result<(Message, Message), AppError>;

    /// Oldest first.
    async fn list(&self, session_id: Uuid) -> Result<Vec<Message>, AppError>;
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    async fn get_feedback(&self, session_id: Uuid) -> Result<Option<FeedbackRow>, AppError>;

    async fn has_feedback(&self, session_id: Uuid) -> Result<bool, AppError>;

    /// Inserts the session's single feedback record.
    /// Fails with `AppError::Validation` if one already exists, including when a
    /// concurrent insert won the race.
    async fn create_feedback(
        &self,
        session_id: Uuid,
        feedback: &NewFeedback,
    ) -> Result<FeedbackRow, AppError>;
}
