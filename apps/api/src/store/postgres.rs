use async_trait::async_trait;
use sqlx::{Executor, PgPool, Postgres};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::feedback::{FeedbackRow, NewFeedback};
use crate::models::message::{Message, MessageRow, Role};
use crate::models::session::SessionRow;
use crate::store::{FeedbackStore, MessageStore, SessionStore, FEEDBACK_ALREADY_GENERATED};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn to_message(row: MessageRow) -> Result<Message, AppError> {
    Message::try_from(row).map_err(|e| AppError::Internal(anyhow::anyhow!(e)))
}

async fn insert_message<'e, E>(
    executor: E,
    session_id: Uuid,
    role: Role,
    content: &str,
) -> Result<Message, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    // Append-only: INSERT, never UPDATE
    let row = sqlx::query_as::<_, MessageRow>(
        r#"
        INSERT INTO messages (session_id, role, content)
        VALUES ($1, $2, $3)
        RETURNING *
        "#,
    )
    .bind(session_id)
    .bind(role.as_str())
    .bind(content)
    .fetch_one(executor)
    .await?;
    to_message(row)
}

#[async_trait]
impl SessionStore for PgStore {
    async fn create_session(
        &self,
        job_title: &str,
        company_name: &str,
    ) -> Result<SessionRow, AppError> {
        let session = sqlx::query_as::<_, SessionRow>(
            r#"
            INSERT INTO sessions (id, job_title, company_name)
            VALUES ($1, $2, $3)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(job_title)
        .bind(company_name)
        .fetch_one(&self.pool)
        .await?;
        Ok(session)
    }

    async fn get_session(&self, session_id: Uuid) -> Result<Option<SessionRow>, AppError> {
        let session = sqlx::query_as::<_, SessionRow>("SELECT * FROM sessions WHERE id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn update_cv_text(
        &self,
        session_id: Uuid,
        cv_text: &str,
    ) -> Result<Option<SessionRow>, AppError> {
        let session = sqlx::query_as::<_, SessionRow>(
            "UPDATE sessions SET cv_text = $2 WHERE id = $1 RETURNING *",
        )
        .bind(session_id)
        .bind(cv_text)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn update_job_description(
        &self,
        session_id: Uuid,
        job_description: &str,
    ) -> Result<Option<SessionRow>, AppError> {
        let session = sqlx::query_as::<_, SessionRow>(
            "UPDATE sessions SET job_description_text = $2 WHERE id = $1 RETURNING *",
        )
        .bind(session_id)
        .bind(job_description)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn append(
        &self,
        session_id: Uuid,
        role: Role,
        content: &str,
    ) -> Result<Message, AppError> {
        insert_message(&self.pool, session_id, role, content).await
    }

    async fn append_turn(
        &self,
        session_id: Uuid,
        answer: &str,
        reply: &str,
    ) -> Result<(Message, Message), AppError> {
        let mut tx = self.pool.begin().await?;
        let answer = insert_message(&mut *tx, session_id, Role::User, answer).await?;
        let reply = insert_message(&mut *tx, session_id, Role::Assistant, reply).await?;
        tx.commit().await?;
        Ok((answer, reply))
    }

    async fn list(&self, session_id: Uuid) -> Result<Vec<Message>, AppError> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT * FROM messages WHERE session_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(to_message).collect()
    }
}

#[async_trait]
impl FeedbackStore for PgStore {
    async fn get_feedback(&self, session_id: Uuid) -> Result<Option<FeedbackRow>, AppError> {
        let feedback =
            sqlx::query_as::<_, FeedbackRow>("SELECT * FROM feedback WHERE session_id = $1")
                .bind(session_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(feedback)
    }

    async fn has_feedback(&self, session_id: Uuid) -> Result<bool, AppError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM feedback WHERE session_id = $1)")
                .bind(session_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn create_feedback(
        &self,
        session_id: Uuid,
        feedback: &NewFeedback,
    ) -> Result<FeedbackRow, AppError> {
        // UNIQUE(session_id) makes this exactly-once across processes
        let inserted = sqlx::query_as::<_, FeedbackRow>(
            r#"
            INSERT INTO feedback
                (id, session_id, score, strengths, weaknesses, cv_improvements)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (session_id) DO NOTHING
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(session_id)
        .bind(feedback.score)
        .bind(&feedback.strengths)
        .bind(&feedback.weaknesses)
        .bind(&feedback.cv_improvements)
        .fetch_optional(&self.pool)
        .await?;

        inserted.ok_or_else(|| AppError::Validation(FEEDBACK_ALREADY_GENERATED.to_string()))
    }
}
