//! Structured-data recovery from free-form model output.
//!
//! Models wrap JSON in prose, code fences, or both, even when asked not
//! to. [`extract`] tries, in order, and stops at the first success:
//!
//! 1. the whole trimmed text,
//! 2. the text with code-fence markers removed,
//! 3. a bracket-balanced span found by scanning the cleaned text.
//!
//! The scan skips characters inside JSON string literals, so a `}` inside
//! a quoted value does not end the payload early.

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::AgentError;

/// Maximum characters of input echoed in an extraction error message.
const PREVIEW_CHARS: usize = 200;

/// Recovers a JSON value embedded in `text`.
///
/// # Errors
///
/// Returns [`AgentError::Extraction`] if no strategy yields valid JSON.
pub fn extract(text: &str) -> Result<Value, AgentError> {
    let trimmed = text.trim();

    let verbatim_err = match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let cleaned = strip_fences(trimmed);
    if let Ok(value) = serde_json::from_str::<Value>(cleaned.trim()) {
        return Ok(value);
    }

    if let Some(value) = scan_balanced(&cleaned) {
        return Ok(value);
    }

    let preview: String = trimmed.chars().take(PREVIEW_CHARS).collect();
    Err(AgentError::Extraction {
        message: format!(
            "no JSON payload found ({verbatim_err}); length: {} bytes, preview: {preview:?}",
            trimmed.len()
        ),
        content: text.to_string(),
    })
}

/// Recovers a JSON value from `text` and deserializes it into `T`.
///
/// # Errors
///
/// Returns [`AgentError::Extraction`] if no JSON is found or it does not
/// match `T`.
pub fn extract_as<T: DeserializeOwned>(text: &str) -> Result<T, AgentError> {
    let value = extract(text)?;
    serde_json::from_value(value).map_err(|e| AgentError::Extraction {
        message: format!("payload does not match expected shape: {e}"),
        content: text.to_string(),
    })
}

/// Removes markdown code-fence lines and inline fence markers.
fn strip_fences(text: &str) -> String {
    text.replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
}

/// Finds the first bracket-balanced span that parses as JSON.
///
/// The first `{` or `[` fixes the bracket kind. If the balanced span at
/// that position does not parse, scanning resumes at the next opener.
fn scan_balanced(text: &str) -> Option<Value> {
    let mut from = 0;
    while let Some(offset) = text[from..].find(['{', '[']) {
        let start = from + offset;
        if let Some(end) = balanced_end(text, start)
            && let Ok(value) = serde_json::from_str::<Value>(&text[start..=end])
        {
            return Some(value);
        }
        from = start + 1;
    }
    None
}

/// Returns the byte index of the bracket that closes the one at `start`.
fn balanced_end(text: &str, start: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            _ if b == open => depth += 1,
            _ if b == close => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
