//! Synthesizer agent.
//!
//! Combines the tagged step results and the working context into the
//! final answer. The answer's shape follows what the reader asked for:
//! an explicit request for markdown or structure gets a structured note,
//! an explicit request for a casual summary gets plain prose.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::info;

use super::config::AgentConfig;
use super::message::ChatMessage;
use super::prompt::build_synthesizer_prompt;
use super::traits::{Agent, CallTarget};
use crate::core::Intent;
use crate::error::AgentError;

/// Explicit requests for markdown or structured output.
static MARKDOWN_REQUEST: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(markdown|obsidian|headings?|headers?|bullet(ed)?[\s-]*(points?|list)|tables?|structured|outline|study notes|notes? format)\b",
    )
    .ok()
});

/// Explicit requests for a conversational answer.
static CONVERSATIONAL_REQUEST: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(conversational(ly)?|casual(ly)?|in plain (words|english|terms)|in simple terms|like (you'?re|you are) (talking|explaining)|in a (few|couple of) (sentences|paragraphs)|just tell me)\b",
    )
    .ok()
});

fn matches(re: &LazyLock<Option<Regex>>, text: &str) -> bool {
    re.as_ref().is_some_and(|r| r.is_match(text))
}

/// How the final answer should be shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Structured markdown note with headings.
    MarkdownNote,
    /// Flowing conversational prose, no headings.
    Conversational,
    /// No explicit request; the model decides.
    Balanced,
}

impl ResponseShape {
    /// Detects the requested shape from the query.
    ///
    /// `summary_obsidian` always produces a markdown note. Otherwise an
    /// explicit markdown request wins over a conversational one.
    #[must_use]
    pub fn detect(query: &str, intent: Intent) -> Self {
        if intent == Intent::SummaryObsidian || matches(&MARKDOWN_REQUEST, query) {
            Self::MarkdownNote
        } else if matches(&CONVERSATIONAL_REQUEST, query) {
            Self::Conversational
        } else {
            Self::Balanced
        }
    }

    /// Response-shaping instruction appended to the synthesizer prompt.
    #[must_use]
    pub const fn instructions(self) -> &'static str {
        match self {
            Self::MarkdownNote => {
                "Format the answer as a markdown note: a `#` title, a one-paragraph summary, \
                 `##` sections for key points, evidence and open questions, and bullet lists \
                 where they help. Cite paragraph markers where available."
            }
            Self::Conversational => {
                "Answer conversationally in a few short paragraphs of plain prose. \
                 No headings, no bullet lists, no tables."
            }
            Self::Balanced => {
                "Lead with a direct answer, then support it. Use light structure \
                 (short paragraphs, an occasional list) only where it aids clarity."
            }
        }
    }
}

/// Agent that synthesizes step results into the final answer.
pub struct SynthesizerAgent {
    max_tokens: u32,
    system_prompt: String,
}

impl SynthesizerAgent {
    /// Creates a new synthesizer agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            max_tokens: config.synthesizer_max_tokens,
            system_prompt,
        }
    }

    /// Produces the final answer.
    ///
    /// # Errors
    ///
    /// Propagates provider failures.
    pub async fn synthesize(
        &self,
        target: &CallTarget<'_>,
        query: &str,
        context: &str,
        step_results: &[String],
        shape: ResponseShape,
        history: &[ChatMessage],
    ) -> Result<String, AgentError> {
        let prompt = build_synthesizer_prompt(query, context, step_results, shape.instructions());
        let response = self.execute_with_history(target, history, &prompt).await?;
        info!(
            shape = ?shape,
            chars = response.content.len(),
            finish_reason = response.finish_reason.as_deref().unwrap_or("unknown"),
            "synthesis complete"
        );
        Ok(response.content.trim().to_string())
    }
}

#[async_trait]
impl Agent for SynthesizerAgent {
    fn name(&self) -> &'static str {
        "synthesizer"
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        false
    }

    fn temperature(&self) -> f32 {
        0.1
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
