//! Interview progression: a state machine over the session transcript.
//!
//! Nothing here is cached. Every call reloads the transcript and derives the
//! state from it, so a crash between two calls leaves nothing to reconcile.
//! Nothing is appended until the model has produced a usable reply. An answer
//! is stored in the same write as the message that follows it, so a failed
//! generation leaves the transcript exactly as it was.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::errors::AppError;
use crate::interview::progress::{answer_count, InterviewState, Progress, MAX_QUESTIONS};
use crate::interview::prompts::{build_follow_up_prompt, build_opening_prompt};
use crate::llm_client::AiClient;
use crate::models::message::{Message, Role};
use crate::models::session::SessionRow;
use crate::sessions::lock::SessionLocks;
use crate::store::{MessageStore, SessionStore};

pub const CLOSING_MESSAGE: &str = "Thanks for your answers! The interview is now complete.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerOutcome {
    pub is_complete: bool,
    pub next_question: Option<String>,
    pub question_count: usize,
}

#[derive(Clone)]
pub struct InterviewService {
    sessions: Arc<dyn SessionStore>,
    messages: Arc<dyn MessageStore>,
    ai: AiClient,
    locks: Arc<SessionLocks>,
}

impl InterviewService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        messages: Arc<dyn MessageStore>,
        ai: AiClient,
        locks: Arc<SessionLocks>,
    ) -> Self {
        Self {
            sessions,
            messages,
            ai,
            locks,
        }
    }

    /// Generates and stores the opening question.
    pub async fn start_interview(&self, session_id: Uuid) -> Result<String, AppError> {
        let session = self.load_session(session_id).await?;
        let _guard = self.locks.acquire(session_id).await;

        let cv_text = required_text(&session.cv_text, "CV")?;
        let jd_text = required_text(&session.job_description_text, "Job description")?;

        if !self.messages.list(session_id).await?.is_empty() {
            return Err(AppError::Validation(
                "Interview has already started".to_string(),
            ));
        }

        let prompt =
            build_opening_prompt(&session.job_title, &session.company_name, cv_text, jd_text);
        let question = self.ai.generate_question(&prompt).await?;

        self.messages
            .append(session_id, Role::Assistant, &question)
            .await?;
        info!("Interview started for session {session_id}");

        Ok(question)
    }

    /// Records the candidate's answer together with the next question, or with
    /// the closing message once `MAX_QUESTIONS` answers are in.
    pub async fn submit_answer(
        &self,
        session_id: Uuid,
        answer: &str,
    ) -> Result<AnswerOutcome, AppError> {
        let session = self.load_session(session_id).await?;

        let answer = answer.trim();
        if answer.is_empty() {
            return Err(AppError::Validation("Answer cannot be empty".to_string()));
        }

        let _guard = self.locks.acquire(session_id).await;
        let transcript = self.messages.list(session_id).await?;

        match InterviewState::from_transcript(&transcript) {
            InterviewState::NotStarted => {
                return Err(AppError::Validation(
                    "Interview has not been started".to_string(),
                ))
            }
            InterviewState::Complete => {
                return Err(AppError::Validation(
                    "Interview is already complete".to_string(),
                ))
            }
            InterviewState::AwaitingAnswer => {}
        }

        // Counts the pending answer, which is not stored yet
        let question_count = answer_count(&transcript) + 1;
        if question_count >= MAX_QUESTIONS {
            self.messages
                .append_turn(session_id, answer, CLOSING_MESSAGE)
                .await?;
            info!("Interview complete for session {session_id}");
            return Ok(AnswerOutcome {
                is_complete: true,
                next_question: None,
                question_count,
            });
        }

        let prompt = build_follow_up_prompt(
            &transcript,
            answer,
            session.cv_text.as_deref().unwrap_or_default(),
            session.job_description_text.as_deref().unwrap_or_default(),
            question_count,
            MAX_QUESTIONS,
        );
        let question = self.ai.generate_question(&prompt).await?;

        self.messages
            .append_turn(session_id, answer, &question)
            .await?;

        Ok(AnswerOutcome {
            is_complete: false,
            next_question: Some(question),
            question_count: question_count + 1,
        })
    }

    pub async fn get_progress(&self, session_id: Uuid) -> Result<Progress, AppError> {
        let transcript = self.get_transcript(session_id).await?;
        Ok(Progress::from_transcript(&transcript))
    }

    pub async fn get_transcript(&self, session_id: Uuid) -> Result<Vec<Message>, AppError> {
        self.load_session(session_id).await?;
        self.messages.list(session_id).await
    }

    async fn load_session(&self, session_id: Uuid) -> Result<SessionRow, AppError> {
        self.sessions
            .get_session(session_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {session_id} not found")))
    }
}

fn required_text<'a>(value: &'a Option<String>, label: &str) -> Result<&'a str, AppError> {
    match value.as_deref() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(AppError::Validation(format!(
            "{label} must be provided before starting the interview"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::retry::RetryPolicy;
    use crate::llm_client::router::ProviderRouter;
    use crate::llm_client::testing::{ok, permanent, ScriptedProvider};
    use crate::store::MemoryStore;

    struct Fixture {
        service: InterviewService,
        store: Arc<MemoryStore>,
        provider: Arc<ScriptedProvider>,
    }

    fn fixture(provider: Arc<ScriptedProvider>) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let router = ProviderRouter::new(vec![provider.clone()], RetryPolicy::default());
        let service = InterviewService::new(
            store.clone(),
            store.clone(),
            AiClient::new(Arc::new(router)),
            Arc::new(SessionLocks::new()),
        );
        Fixture {
            service,
            store,
            provider,
        }
    }

    async fn ready_session(store: &MemoryStore) -> Uuid {
        let session = store.create_session("Backend Engineer", "Acme").await.unwrap();
        store.update_cv_text(session.id, "Five years of Rust.").await.unwrap();
        store
            .update_job_description(session.id, "Build distributed systems.")
            .await
            .unwrap();
        session.id
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_requires_job_description() {
        let f = fixture(ScriptedProvider::always("p1", ok("Q")));
        let session = f.store.create_session("Engineer", "Acme").await.unwrap();
        f.store.update_cv_text(session.id, "cv").await.unwrap();
        f.store.update_job_description(session.id, "   ").await.unwrap();

        let err = f.service.start_interview(session.id).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert!(f.store.list(session.id).await.unwrap().is_empty());
        assert_eq!(f.provider.calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_unknown_session_is_not_found() {
        let f = fixture(ScriptedProvider::always("p1", ok("Q")));
        let err = f.service.start_interview(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_appends_cleaned_question() {
        let f = fixture(ScriptedProvider::always("p1", ok("Question: \"Why Rust?\"")));
        let id = ready_session(&f.store).await;

        let question = f.service.start_interview(id).await.unwrap();

        assert_eq!(question, "Why Rust?");
        let transcript = f.store.list(id).await.unwrap();
        assert_eq!(transcript.len(), 1);
        assert_eq!(transcript[0].role, Role::Assistant);
        assert!(f.provider.last_prompt().unwrap().contains("Backend Engineer at Acme"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_twice_is_rejected() {
        let f = fixture(ScriptedProvider::always("p1", ok("Q")));
        let id = ready_session(&f.store).await;

        f.service.start_interview(id).await.unwrap();
        let err = f.service.start_interview(id).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(f.store.list(id).await.unwrap().len(), 1);
        assert_eq!(f.provider.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_answer_before_start_is_rejected() {
        let f = fixture(ScriptedProvider::always("p1", ok("Q")));
        let id = ready_session(&f.store).await;

        let err = f.service.submit_answer(id, "hello").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_answer_is_rejected() {
        let f = fixture(ScriptedProvider::always("p1", ok("Q")));
        let id = ready_session(&f.store).await;
        f.service.start_interview(id).await.unwrap();

        let err = f.service.submit_answer(id, "  \n ").await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(f.store.list(id).await.unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_interview_completes_on_final_answer() {
        let f = fixture(ScriptedProvider::always("p1", ok("Next question?")));
        let id = ready_session(&f.store).await;
        f.service.start_interview(id).await.unwrap();

        for call in 1..MAX_QUESTIONS {
            let outcome = f.service.submit_answer(id, "An answer").await.unwrap();
            assert!(!outcome.is_complete);
            assert_eq!(outcome.next_question.as_deref(), Some("Next question?"));
            assert_eq!(outcome.question_count, call + 1);
        }

        let calls_before = f.provider.calls();
        let outcome = f.service.submit_answer(id, "Last answer").await.unwrap();

        assert_eq!(
            outcome,
            AnswerOutcome {
                is_complete: true,
                next_question: None,
                question_count: MAX_QUESTIONS,
            }
        );
        assert_eq!(f.provider.calls(), calls_before);

        let transcript = f.store.list(id).await.unwrap();
        assert_eq!(transcript.last().unwrap().content, CLOSING_MESSAGE);
        assert_eq!(answer_count(&transcript), MAX_QUESTIONS);

        let progress = f.service.get_progress(id).await.unwrap();
        assert!(progress.is_complete);
        assert_eq!(progress.question_count, MAX_QUESTIONS);

        let err = f.service.submit_answer(id, "One more").await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(answer_count(&f.store.list(id).await.unwrap()), MAX_QUESTIONS);
    }

    async fn contents(store: &MemoryStore, id: Uuid) -> Vec<String> {
        store
            .list(id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.content)
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_follow_up_leaves_transcript_unchanged() {
        let f = fixture(ScriptedProvider::scripted(
            "p1",
            vec![ok("Q1"), permanent("upstream rejected")],
            ok("Q2"),
        ));
        let id = ready_session(&f.store).await;
        f.service.start_interview(id).await.unwrap();

        let err = f.service.submit_answer(id, "first answer").await.unwrap_err();

        assert!(matches!(err, AppError::AiService(_)));
        assert_eq!(contents(&f.store, id).await, vec!["Q1"]);
        let progress = f.service.get_progress(id).await.unwrap();
        assert_eq!(progress.question_count, 0);

        let outcome = f
            .service
            .submit_answer(id, "a corrected answer")
            .await
            .unwrap();

        assert_eq!(outcome.next_question.as_deref(), Some("Q2"));
        assert_eq!(outcome.question_count, 2);
        assert_eq!(
            contents(&f.store, id).await,
            vec!["Q1", "a corrected answer", "Q2"]
        );
        assert!(f
            .provider
            .last_prompt()
            .unwrap()
            .contains("Candidate: a corrected answer"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_up_prompt_carries_transcript() {
        let f = fixture(ScriptedProvider::always("p1", ok("Q")));
        let id = ready_session(&f.store).await;
        f.service.start_interview(id).await.unwrap();

        f.service
            .submit_answer(id, "  I built a message broker.  ")
            .await
            .unwrap();

        let prompt = f.provider.last_prompt().unwrap();
        assert!(prompt.contains("Candidate: I built a message broker."));
        assert!(prompt.contains("QUESTION COUNT: 1 of 8"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_starts_generate_once() {
        let f = fixture(ScriptedProvider::always("p1", ok("Q")));
        let id = ready_session(&f.store).await;

        let (a, b) = tokio::join!(f.service.start_interview(id), f.service.start_interview(id));

        assert!(a.is_ok() != b.is_ok());
        assert_eq!(f.store.list(id).await.unwrap().len(), 1);
        assert_eq!(f.provider.calls(), 1);
    }
}
