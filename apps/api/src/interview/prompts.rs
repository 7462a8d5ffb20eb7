// Prompt templates for the Interview module.
// Reuses cross-cutting fragments from llm_client::prompts.

use crate::llm_client::prompts::{clip, QUESTION_ONLY_INSTRUCTION};
use crate::models::message::{Message, Role};

const OPENING_CONTEXT_CHARS: usize = 2000;
const FOLLOW_UP_CONTEXT_CHARS: usize = 1500;

/// Opening question prompt.
/// Replace: {job_title}, {company_name}, {cv_text}, {jd_text}, {output_instruction}
pub const OPENING_PROMPT_TEMPLATE: &str = r#"You are an experienced technical interviewer conducting an interview for the position of {job_title} at {company_name}.

CANDIDATE'S CV:
{cv_text}

JOB DESCRIPTION:
{jd_text}

Your task: ask the FIRST question of the interview.

The question should:
1. Be tailored to BOTH the candidate's background AND the job requirements
2. Be appropriate for the seniority level of the role
3. Be specific, not generic

{output_instruction}"#;

/// Follow-up question prompt.
/// Replace: {transcript}, {cv_text}, {jd_text}, {question_count}, {max_questions},
///          {output_instruction}
pub const FOLLOW_UP_PROMPT_TEMPLATE: &str = r#"You are conducting a job interview for a candidate.

CONVERSATION SO FAR:
{transcript}

CANDIDATE'S CV (for context):
{cv_text}

JOB REQUIREMENTS (for context):
{jd_text}

QUESTION COUNT: {question_count} of {max_questions}

Based on the conversation so far, ask ONE follow-up question.

The question should:
1. Build on their previous answer
2. Dive deeper into relevant areas
3. Assess skills mentioned in the job description
4. Be natural and conversational

{output_instruction}"#;

pub fn build_opening_prompt(
    job_title: &str,
    company_name: &str,
    cv_text: &str,
    jd_text: &str,
) -> String {
    OPENING_PROMPT_TEMPLATE
        .replace("{job_title}", job_title)
        .replace("{company_name}", company_name)
        .replace("{cv_text}", clip(cv_text, OPENING_CONTEXT_CHARS))
        .replace("{jd_text}", clip(jd_text, OPENING_CONTEXT_CHARS))
        .replace("{output_instruction}", QUESTION_ONLY_INSTRUCTION)
}

/// `pending_answer` is the candidate's latest answer, not yet stored.
pub fn build_follow_up_prompt(
    transcript: &[Message],
    pending_answer: &str,
    cv_text: &str,
    jd_text: &str,
    question_count: usize,
    max_questions: usize,
) -> String {
    FOLLOW_UP_PROMPT_TEMPLATE
        .replace("{cv_text}", clip(cv_text, FOLLOW_UP_CONTEXT_CHARS))
        .replace("{jd_text}", clip(jd_text, FOLLOW_UP_CONTEXT_CHARS))
        .replace("{question_count}", &question_count.to_string())
        .replace("{max_questions}", &max_questions.to_string())
        .replace("{output_instruction}", QUESTION_ONLY_INSTRUCTION)
        // Last: candidate text may itself contain placeholder-like braces
        .replace(
            "{transcript}",
            &format!(
                "{}\n\n{}",
                format_transcript(transcript),
                speaker_line(Role::User, pending_answer)
            ),
        )
}

/// Renders a transcript as alternating `Interviewer:` / `Candidate:` paragraphs.
pub fn format_transcript(transcript: &[Message]) -> String {
    transcript
        .iter()
        .map(|m| speaker_line(m.role, &m.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn speaker_line(role: Role, content: &str) -> String {
    match role {
        Role::Assistant => format!("Interviewer: {content}"),
        Role::User => format!("Candidate: {content}"),
    }
}
