// Shared prompt fragments and prompt-building utilities.
// Each module that needs LLM calls defines its own prompts.rs alongside it.
// This file contains the cross-cutting pieces.

/// Output contract for plain-question generation.
pub const QUESTION_ONLY_INSTRUCTION: &str = "\
    Return ONLY the question text. \
    Do NOT prefix it with a label such as 'Question:'. \
    Do NOT wrap it in quotes, JSON, or markdown. \
    Ask exactly one question.";

/// Output contract for structured generation.
pub const JSON_ONLY_INSTRUCTION: &str = "\
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Ensure all strings are properly escaped.";

/// Truncates free text (CVs, job descriptions) to `max_chars` characters.
pub fn clip(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
