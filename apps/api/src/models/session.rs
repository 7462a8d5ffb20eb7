use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub job_title: String,
    pub company_name: String,
    pub cv_text: Option<String>,
    pub job_description_text: Option<String>,
    pub created_at: DateTime<Utc>,
}
