//! Context windowing scan pass.
//!
//! Before synthesis over a long document, the cheap model copies out the
//! passages the question needs, so the expensive call sees a short,
//! relevant context instead of a blind prefix.

use async_trait::async_trait;
use tracing::info;

use super::config::AgentConfig;
use super::models::ModelTarget;
use super::prompt::build_scan_prompt;
use super::traits::{Agent, CallTarget};
use crate::core::document::{bounded_prefix, paragraph_markers};
use crate::error::AgentError;

/// Sentinel the scan model answers when the whole document is relevant.
pub const ALL_RELEVANT: &str = "ALL_RELEVANT";
/// Sentinel the scan model answers when nothing is relevant.
pub const NOT_FOUND: &str = "NOT_FOUND";

/// What the scan pass found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Verbatim passages copied from the document.
    Excerpt(String),
    /// The whole document is relevant.
    AllRelevant,
    /// Nothing in the document answers the question.
    NotFound,
}

impl ScanOutcome {
    /// Interprets scan output.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Extraction`] when the output is empty.
    pub fn parse(content: &str) -> Result<Self, AgentError> {
        let trimmed = content.trim().trim_matches('`').trim();
        if trimmed.is_empty() {
            return Err(AgentError::Extraction {
                message: "scan returned no text".to_string(),
                content: content.to_string(),
            });
        }
        if trimmed.starts_with(ALL_RELEVANT) {
            return Ok(Self::AllRelevant);
        }
        if trimmed.starts_with(NOT_FOUND) {
            return Ok(Self::NotFound);
        }
        Ok(Self::Excerpt(trimmed.to_string()))
    }

    /// Returns the synthesis context for this outcome.
    ///
    /// `NotFound` yields the sentinel itself; the synthesizer prompt tells
    /// the model to report that the document does not contain the answer.
    #[must_use]
    pub fn into_context(self, document: &str, all_relevant_chars: usize) -> String {
        match self {
            Self::Excerpt(text) => text,
            Self::AllRelevant => bounded_prefix(document, all_relevant_chars).to_string(),
            Self::NotFound => NOT_FOUND.to_string(),
        }
    }
}

/// Agent that selects relevant passages with the cheap model.
pub struct ScanAgent {
    max_tokens: u32,
    system_prompt: String,
}

impl ScanAgent {
    /// Creates a new scan agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            max_tokens: config.scan_max_tokens,
            system_prompt,
        }
    }

    /// Scans `document` for passages that answer `query`.
    ///
    /// # Errors
    ///
    /// Propagates provider failures and empty output; callers fall back
    /// to a document prefix.
    pub async fn scan(
        &self,
        target: &CallTarget<'_>,
        query: &str,
        document: &str,
    ) -> Result<ScanOutcome, AgentError> {
        let response = self
            .execute(target, &build_scan_prompt(query, document))
            .await?;
        let outcome = ScanOutcome::parse(&response.content)?;
        match &outcome {
            ScanOutcome::Excerpt(text) => info!(
                chars = text.len(),
                paragraphs = paragraph_markers(text).len(),
                "scan selected passages"
            ),
            other => info!(outcome = ?other, "scan finished"),
        }
        Ok(outcome)
    }
}

#[async_trait]
impl Agent for ScanAgent {
    fn name(&self) -> &'static str {
        "scanner"
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn model_target(&self) -> ModelTarget {
        ModelTarget::Cheap
    }

    fn temperature(&self) -> f32 {
        0.0
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
