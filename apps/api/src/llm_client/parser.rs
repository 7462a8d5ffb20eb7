//! Response validation and parsing of free-form model text.
//!
//! Providers give no format guarantee, so nothing here trusts the raw text:
//! - plain-question mode strips labels and quotes and rejects empty results
//! - structured mode finds the first balanced JSON value and schema-checks it

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::feedback::NewFeedback;

/// Leading labels models like to prepend to a question. Compared case-insensitively.
const QUESTION_LABELS: &[&str] = &[
    "question:",
    "follow-up:",
    "here's a question:",
    "here’s a question:",
];

const QUOTE_CHARS: &[char] = &['"', '\'', '“', '”', '‘', '’'];

/// The exact key set a feedback object must carry.
pub const FEEDBACK_KEYS: [&str; 4] = ["score", "strengths", "weaknesses", "cv_improvements"];

pub const MIN_SCORE: i64 = 1;
pub const MAX_SCORE: i64 = 10;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("model returned an empty question")]
    EmptyGeneration,

    #[error("no JSON structure found in model output")]
    NoStructureFound,

    #[error("malformed JSON in model output: {0}")]
    MalformedJson(String),

    /// The model produced valid JSON but broke a content constraint.
    #[error("schema violation: {0}")]
    SchemaViolation(String),
}

/// Extracts a clean question string.
///
/// `Question: "What is X?"` → `What is X?`
pub fn extract_question(raw: &str) -> Result<String, ParseError> {
    let text = strip_label(raw.trim());
    let text = strip_quotes(text).trim();

    if text.is_empty() {
        return Err(ParseError::EmptyGeneration);
    }
    Ok(text.to_string())
}

fn strip_label(text: &str) -> &str {
    for label in QUESTION_LABELS {
        let matches = text
            .get(..label.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(label));
        if matches {
            return text[label.len()..].trim_start();
        }
    }
    text
}

/// Removes one layer of surrounding quotes. Both ends must be quote characters.
fn strip_quotes(text: &str) -> &str {
    let mut chars = text.chars();
    match (chars.next(), chars.next_back()) {
        (Some(first), Some(last))
            if QUOTE_CHARS.contains(&first) && QUOTE_CHARS.contains(&last) =>
        {
            chars.as_str()
        }
        _ => text,
    }
}

/// Extracts the first JSON object or array from model output.
pub fn extract_json(raw: &str) -> Result<Value, ParseError> {
    let cleaned = strip_fences(raw);
    let candidate = first_balanced(&cleaned).ok_or(ParseError::NoStructureFound)?;
    serde_json::from_str(candidate).map_err(|e| ParseError::MalformedJson(e.to_string()))
}

/// Strips ```json / ``` fence markers wherever they appear.
fn strip_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
}

/// Returns the first balanced `{...}` or `[...]` substring.
///
/// Brackets inside JSON strings are ignored. A mismatched closer ends the
/// candidate early so the JSON parser can report it as malformed.
fn first_balanced(text: &str) -> Option<&str> {
    let start = text.find(|c: char| c == '{' || c == '[')?;
    let mut expected_closers: Vec<char> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => expected_closers.push('}'),
            '[' => expected_closers.push(']'),
            '}' | ']' => {
                let end = start + offset + c.len_utf8();
                if expected_closers.pop() != Some(c) || expected_closers.is_empty() {
                    return Some(&text[start..end]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Parses and validates a feedback object.
pub fn parse_feedback(raw: &str) -> Result<NewFeedback, ParseError> {
    let Value::Object(map) = extract_json(raw)? else {
        return Err(ParseError::SchemaViolation(
            "expected a JSON object".to_string(),
        ));
    };

    let missing: Vec<&str> = FEEDBACK_KEYS
        .iter()
        .copied()
        .filter(|key| !map.contains_key(*key))
        .collect();
    let unexpected: Vec<&str> = map
        .keys()
        .map(String::as_str)
        .filter(|key| !FEEDBACK_KEYS.contains(key))
        .collect();
    if !missing.is_empty() || !unexpected.is_empty() {
        return Err(ParseError::SchemaViolation(format!(
            "feedback keys mismatch (missing: {missing:?}, unexpected: {unexpected:?})"
        )));
    }

    let score = &map["score"];
    let score = score
        .as_i64()
        .filter(|s| (MIN_SCORE..=MAX_SCORE).contains(s))
        .ok_or_else(|| {
            ParseError::SchemaViolation(format!(
                "score must be an integer between {MIN_SCORE} and {MAX_SCORE}, got {score}"
            ))
        })?;

    Ok(NewFeedback {
        score: score as i32,
        strengths: text_field(&map, "strengths")?,
        weaknesses: text_field(&map, "weaknesses")?,
        cv_improvements: text_field(&map, "cv_improvements")?,
    })
}

/// Accepts a string, or an array of strings joined one per line.
fn text_field(map: &Map<String, Value>, key: &str) -> Result<String, ParseError> {
    match &map[key] {
        Value::String(text) => Ok(text.trim().to_string()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                item.as_str().map(str::trim).ok_or_else(|| {
                    ParseError::SchemaViolation(format!("{key} must contain only strings"))
                })
            })
            .collect::<Result<Vec<_>, _>>()
            .map(|lines| lines.join("\n")),
        other => Err(ParseError::SchemaViolation(format!(
            "{key} must be a string, got {other}"
        ))),
    }
}
