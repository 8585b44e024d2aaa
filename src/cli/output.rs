//! Output formatting.

use std::fmt::Write;

use serde::Serialize;

use crate::agent::Answer;
use crate::agent::thought::ThoughtStatus;
use crate::error::{CommandError, Result};

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name, defaulting to [`OutputFormat::Text`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }
}

/// Serializes `value` as pretty JSON with a trailing newline.
///
/// # Errors
///
/// Returns [`CommandError::OutputFormat`] if serialization fails.
pub fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map(|s| s + "\n")
        .map_err(|e| CommandError::OutputFormat(e.to_string()).into())
}

/// Renders an answer as text: the answer, then a one-line summary of how
/// it was produced.
#[must_use]
pub fn format_answer(answer: &Answer) -> String {
    let mut output = answer.text.trim_end().to_string();
    output.push_str("\n\n---\n");

    let failed = answer
        .thoughts
        .iter()
        .filter(|t| t.status == ThoughtStatus::Failed)
        .count();
    let mut meta = format!(
        "intent: {} ({}) | steps: {}",
        answer.intent,
        answer.path,
        answer.steps_executed
    );
    if failed > 0 {
        let _ = write!(meta, " ({failed} failed)");
    }
    if answer.scanned {
        meta.push_str(" | scanned");
    }
    let _ = writeln!(meta, " | {:.1}s", answer.elapsed.as_secs_f64());
    output.push_str(&meta);
    output
}
