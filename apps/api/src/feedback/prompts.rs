// Prompt templates for the Feedback module.

use crate::interview::prompts::format_transcript;
use crate::llm_client::prompts::{clip, JSON_ONLY_INSTRUCTION};
use crate::llm_client::parser::{MAX_SCORE, MIN_SCORE};
use crate::models::message::Message;

const CV_CONTEXT_CHARS: usize = 2000;

/// Interview evaluation prompt.
/// Replace: {job_title}, {jd_text}, {cv_text}, {transcript}, {min_score}, {max_score},
///          {output_instruction}
pub const FEEDBACK_PROMPT_TEMPLATE: &str = r#"You are an expert interview analyst. Analyze this job interview and provide comprehensive feedback.

JOB TITLE: {job_title}

JOB REQUIREMENTS:
{jd_text}

CANDIDATE'S CV:
{cv_text}

INTERVIEW TRANSCRIPT:
{transcript}

Provide a thorough analysis covering:

1. OVERALL PERFORMANCE SCORE ({min_score}-{max_score}):
   - Consider relevance of answers, communication clarity, technical depth, and alignment with the job requirements

2. STRENGTHS (3-5 specific points):
   - Skills the candidate demonstrated effectively, with examples from their answers

3. AREAS FOR IMPROVEMENT (3-5 specific points):
   - Where answers lacked depth or skills needed more demonstration

4. CV IMPROVEMENT SUGGESTIONS:
   - How to tailor the CV for THIS role: what to highlight, what is missing, specific wording

Return a JSON object with this EXACT schema (no extra fields):
{
  "score": <integer>,
  "strengths": "<string>",
  "weaknesses": "<string>",
  "cv_improvements": "<string>"
}

Be constructive, specific, and actionable. Use bullet points inside the strings for lists.

{output_instruction}"#;

pub fn build_feedback_prompt(
    job_title: &str,
    cv_text: &str,
    jd_text: &str,
    transcript: &[Message],
) -> String {
    FEEDBACK_PROMPT_TEMPLATE
        .replace("{job_title}", job_title)
        .replace("{min_score}", &MIN_SCORE.to_string())
        .replace("{max_score}", &MAX_SCORE.to_string())
        .replace("{output_instruction}", JSON_ONLY_INSTRUCTION)
        .replace("{cv_text}", clip(cv_text, CV_CONTEXT_CHARS))
        .replace("{jd_text}", jd_text)
        .replace("{transcript}", &format_transcript(transcript))
}
