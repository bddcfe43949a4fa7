//! Lenient parsing of model responses
//!
//! Handles:
//! - Zero, one or many ```json fenced blocks (unparsable blocks are dropped)
//! - Unfenced JSON embedded in prose (first `{` to last `}`)

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("No JSON found in response: {preview}")]
    NoJson { preview: String },

    #[error("Failed to parse response JSON: {source}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
        preview: String,
    },

    #[error("Response JSON is not an object")]
    NotAnObject,
}

/// Structured content recovered from one response
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedResponse {
    /// Every fenced block that parsed, in order of appearance
    Fenced(Vec<Value>),
    /// No fenced block parsed; the bracket span did
    Raw(Value),
}

impl ParsedResponse {
    /// Collapse into one JSON value (a single chunk, or an array of chunks)
    pub fn into_value(self) -> Value {
        match self {
            ParsedResponse::Fenced(mut chunks) if chunks.len() == 1 => chunks.remove(0),
            ParsedResponse::Fenced(chunks) => Value::Array(chunks),
            ParsedResponse::Raw(value) => value,
        }
    }
}

/// Bodies of every ```json fenced block, unterminated blocks excluded
pub fn extract_fenced_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find("```") {
        let after_fence = &rest[open + 3..];
        let line_end = after_fence.find('\n').unwrap_or(after_fence.len());
        let info = after_fence[..line_end].trim();
        let body_start = (line_end + 1).min(after_fence.len());
        let body = &after_fence[body_start..];

        let Some(close) = body.find("```") else {
            break;
        };

        if info.eq_ignore_ascii_case("json") {
            blocks.push(body[..close].trim());
        }
        rest = &body[close + 3..];
    }

    blocks
}

/// Slice from the first `{` to the last `}`, if both exist in that order
pub fn extract_bracket_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a response: fenced blocks first, bracket span as fallback
pub fn parse_response(text: &str) -> Result<ParsedResponse, ParseError> {
    let chunks: Vec<Value> = extract_fenced_blocks(text)
        .into_iter()
        .filter_map(|block| serde_json::from_str(block).ok())
        .collect();

    if !chunks.is_empty() {
        return Ok(ParsedResponse::Fenced(chunks));
    }

    let span = extract_bracket_span(text).ok_or_else(|| ParseError::NoJson {
        preview: preview(text),
    })?;

    let value: Value = serde_json::from_str(span).map_err(|source| ParseError::InvalidJson {
        source,
        preview: preview(span),
    })?;

    if !value.is_object() {
        return Err(ParseError::NotAnObject);
    }
    Ok(ParsedResponse::Raw(value))
}

fn preview(text: &str) -> String {
    text.chars().take(200).collect()
}
