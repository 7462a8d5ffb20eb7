use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A validated evaluation, ready to persist. Produced only by the feedback parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFeedback {
    /// 1 – 10
    pub score: i32,
    pub strengths: String,
    pub weaknesses: String,
    pub cv_improvements: String,
}

/// At most one per session; the `feedback` table enforces `UNIQUE(session_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct FeedbackRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub score: i32,
    pub strengths: String,
    pub weaknesses: String,
    pub cv_improvements: String,
    pub created_at: DateTime<Utc>,
}
