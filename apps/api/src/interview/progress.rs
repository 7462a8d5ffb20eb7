use serde::Serialize;

use crate::models::message::{Message, Role};

/// Number of candidate answers that completes an interview.
pub const MAX_QUESTIONS: usize = 8;

/// Where a session stands, derived from its transcript alone.
///
/// Answers are only ever stored together with the reply that follows them, so a
/// started transcript always ends with an interviewer message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterviewState {
    NotStarted,
    AwaitingAnswer,
    /// `MAX_QUESTIONS` answers and the closing message are stored.
    Complete,
}

impl InterviewState {
    pub fn from_transcript(transcript: &[Message]) -> Self {
        if transcript.is_empty() {
            InterviewState::NotStarted
        } else if answer_count(transcript) >= MAX_QUESTIONS {
            InterviewState::Complete
        } else {
            InterviewState::AwaitingAnswer
        }
    }
}

pub fn answer_count(transcript: &[Message]) -> usize {
    transcript.iter().filter(|m| m.role == Role::User).count()
}

/// Progress snapshot. Never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub is_started: bool,
    pub is_complete: bool,
    pub question_count: usize,
    pub max_questions: usize,
}

impl Progress {
    pub fn from_transcript(transcript: &[Message]) -> Self {
        let state = InterviewState::from_transcript(transcript);
        Self {
            is_started: state != InterviewState::NotStarted,
            is_complete: state == InterviewState::Complete,
            question_count: answer_count(transcript),
            max_questions: MAX_QUESTIONS,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn transcript(roles: &[Role]) -> Vec<Message> {
        let session_id = Uuid::new_v4();
        roles
            .iter()
            .enumerate()
            .map(|(i, role)| Message {
                id: i as i64 + 1,
                session_id,
                role: *role,
                content: format!("message {i}"),
                created_at: Utc::now(),
            })
            .collect()
    }

    fn full_interview() -> Vec<Role> {
        let mut roles = Vec::new();
        for _ in 0..MAX_QUESTIONS {
            roles.push(Role::Assistant);
            roles.push(Role::User);
        }
        roles.push(Role::Assistant);
        roles
    }

    #[test]
    fn test_empty_transcript_is_not_started() {
        let progress = Progress::from_transcript(&[]);
        assert!(!progress.is_started);
        assert!(!progress.is_complete);
        assert_eq!(progress.question_count, 0);
        assert_eq!(progress.max_questions, 8);
    }

    #[test]
    fn test_counts_answers_only() {
        let messages = transcript(&[Role::Assistant, Role::User, Role::Assistant]);
        let progress = Progress::from_transcript(&messages);
        assert!(progress.is_started);
        assert_eq!(progress.question_count, 1);
        assert_eq!(
            InterviewState::from_transcript(&messages),
            InterviewState::AwaitingAnswer
        );
    }

    #[test]
    fn test_complete_after_closing_message() {
        let messages = transcript(&full_interview());
        let progress = Progress::from_transcript(&messages);
        assert!(progress.is_complete);
        assert_eq!(progress.question_count, MAX_QUESTIONS);
    }

    #[test]
    fn test_one_short_of_max_is_in_progress() {
        let mut roles = full_interview();
        roles.truncate(roles.len() - 2);
        let messages = transcript(&roles);
        assert_eq!(
            InterviewState::from_transcript(&messages),
            InterviewState::AwaitingAnswer
        );
        assert_eq!(Progress::from_transcript(&messages).question_count, MAX_QUESTIONS - 1);
    }
}
