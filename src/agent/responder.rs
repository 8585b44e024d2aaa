//! Fast-path responder.
//!
//! Answers `chat`, `explain_compact` and `summary_3lines` intents with a
//! single style-constrained call over a bounded document prefix and the
//! most recent conversation turns. Never plans.

use async_trait::async_trait;
use tracing::info;
use unicode_segmentation::UnicodeSegmentation;

use super::config::AgentConfig;
use super::message::ChatMessage;
use super::prompt::{BREVITY_DIRECTIVE, PromptSet, build_fast_prompt};
use super::traits::{Agent, CallTarget};
use crate::core::Intent;
use crate::core::document::bounded_prefix;
use crate::error::AgentError;

/// Answer returned when a fast-path call fails.
pub const FAST_PATH_FALLBACK: &str =
    "Sorry, I couldn't get an answer from the model just now. Please try again.";

/// Number of bullet lines in a `summary_3lines` answer.
const SUMMARY_LINES: usize = 3;

/// One fast-path style: a system prompt plus sampling settings.
struct StyleAgent {
    name: &'static str,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
}

#[async_trait]
impl Agent for StyleAgent {
    fn name(&self) -> &'static str {
        self.name
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        self.temperature
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

/// Single-call responder for fast-path intents.
pub struct FastPathResponder {
    chat: StyleAgent,
    explain: StyleAgent,
    summary: StyleAgent,
    excerpt_chars: usize,
    history_turns: usize,
}

impl FastPathResponder {
    /// Creates a responder from configuration and prompts.
    ///
    /// The brevity directive is appended to every style when the active
    /// provider is listed in [`AgentConfig::verbose_providers`].
    #[must_use]
    pub fn new(config: &AgentConfig, prompts: &PromptSet) -> Self {
        let brevity = config.is_verbose_provider();
        let style = |name, prompt: &str, temperature| StyleAgent {
            name,
            system_prompt: if brevity {
                format!("{prompt}\n\n{BREVITY_DIRECTIVE}")
            } else {
                prompt.to_string()
            },
            temperature,
            max_tokens: config.fast_max_tokens,
        };

        Self {
            chat: style("chat", &prompts.chat, 0.7),
            explain: style("explain", &prompts.explain, 0.5),
            summary: style("summary", &prompts.summary, 0.2),
            excerpt_chars: config.fast_excerpt_chars,
            history_turns: config.max_history_turns,
        }
    }

    /// Produces a fast-path answer for `intent`.
    ///
    /// `excerpt_source` is the selection when one is anchored, otherwise
    /// the full document; only a bounded prefix of it is sent.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidQuery`] for heavy-path intents and
    /// propagates provider failures.
    pub async fn respond(
        &self,
        target: &CallTarget<'_>,
        intent: Intent,
        query: &str,
        excerpt_source: &str,
        history: &[ChatMessage],
    ) -> Result<String, AgentError> {
        let agent = match intent {
            Intent::Chat => &self.chat,
            Intent::ExplainCompact => &self.explain,
            Intent::Summary3Lines => &self.summary,
            Intent::SummaryObsidian | Intent::DeepAnalysis => {
                return Err(AgentError::InvalidQuery {
                    message: format!("intent '{intent}' is not handled on the fast path"),
                });
            }
        };

        let excerpt = bounded_prefix(excerpt_source, self.excerpt_chars);
        let recent = recent_turns(history, self.history_turns);
        let response = agent
            .execute_with_history(target, recent, &build_fast_prompt(query, excerpt))
            .await?;

        info!(intent = %intent, chars = response.content.len(), "fast path answered");

        Ok(if intent == Intent::Summary3Lines {
            normalize_three_lines(&response.content)
        } else {
            response.content.trim().to_string()
        })
    }
}

/// Returns the last `n` turns of `history`.
pub(crate) fn recent_turns(history: &[ChatMessage], n: usize) -> &[ChatMessage] {
    &history[history.len().saturating_sub(n)..]
}

/// Strips a leading list marker (`-`, `*`, `•`, `1.`, `1)`) from `line`.
///
/// Returns `None` if the line is not a list item.
fn strip_bullet(line: &str) -> Option<&str> {
    for marker in ["- ", "* ", "• ", "– "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest.trim());
        }
    }
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return Some(rest.trim());
        }
    }
    None
}

/// Coerces model output into exactly three `- ` bullet lines.
///
/// Bullet lines are preferred. When the model produced fewer than three,
/// plain lines are promoted (skipping headings and `...:` preambles), and
/// as a last resort the text is split into sentences. If the text holds
/// fewer than three sentences, every sentence is kept.
#[must_use]
pub fn normalize_three_lines(text: &str) -> String {
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with("```"))
        .collect();

    let bullets: Vec<&str> = lines.iter().filter_map(|&l| strip_bullet(l)).collect();

    let items: Vec<String> = if bullets.len() >= SUMMARY_LINES {
        bullets.iter().map(|s| (*s).to_string()).collect()
    } else {
        let plain: Vec<String> = lines
            .iter()
            .filter(|l| !l.starts_with('#') && !l.ends_with(':'))
            .map(|&l| strip_bullet(l).unwrap_or(l).to_string())
            .collect();
        if plain.len() >= SUMMARY_LINES {
            plain
        } else {
            plain
                .join(" ")
                .unicode_sentences()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        }
    };

    items
        .iter()
        .take(SUMMARY_LINES)
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}
