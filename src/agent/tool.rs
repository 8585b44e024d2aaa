//! Heavy-path analysis tools.
//!
//! A tool is a directive, not a function call: each [`ToolKind`] selects a
//! system prompt that steers one plan step, and the step's output is
//! tagged so later steps and the synthesizer can tell results apart.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::prompt::build_step_prompt;
use super::traits::{Agent, CallTarget};
use crate::error::AgentError;

/// The analysis a plan step performs.
///
/// Unknown labels deserialize to [`ToolKind::Analyze`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum ToolKind {
    /// Answer as the authors would.
    SimulateAuthor,
    /// Pull exact figures, definitions and quotes.
    ExtractData,
    /// Situate the work in its field.
    Contextualize,
    /// Find weaknesses and unsupported claims.
    Critique,
    /// Propose explanations or follow-up work.
    Hypothesize,
    /// General close reading.
    #[default]
    Analyze,
}

impl ToolKind {
    /// All tools, in the order the planner prompt lists them.
    pub const ALL: [Self; 6] = [
        Self::SimulateAuthor,
        Self::ExtractData,
        Self::Contextualize,
        Self::Critique,
        Self::Hypothesize,
        Self::Analyze,
    ];

    /// Parses a tool label (case-insensitive, `-` and `_` interchangeable).
    ///
    /// Unknown labels map to [`ToolKind::Analyze`].
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "simulate_author" | "author" => Self::SimulateAuthor,
            "extract_data" | "extract" => Self::ExtractData,
            "contextualize" | "context" => Self::Contextualize,
            "critique" => Self::Critique,
            "hypothesize" | "hypothesis" => Self::Hypothesize,
            _ => Self::Analyze,
        }
    }

    /// Returns the wire label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SimulateAuthor => "simulate_author",
            Self::ExtractData => "extract_data",
            Self::Contextualize => "contextualize",
            Self::Critique => "critique",
            Self::Hypothesize => "hypothesize",
            Self::Analyze => "analyze",
        }
    }

    /// Tag prefixed to this tool's step result.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::SimulateAuthor => "AUTHOR",
            Self::ExtractData => "DATA",
            Self::Contextualize => "CONTEXT",
            Self::Critique => "CRITIQUE",
            Self::Hypothesize => "HYPOTHESIS",
            Self::Analyze => "ANALYSIS",
        }
    }

    /// Progress message shown while the step runs.
    #[must_use]
    pub fn progress_message(&self, goal: &str) -> String {
        let verb = match self {
            Self::SimulateAuthor => "Taking the authors' view",
            Self::ExtractData => "Extracting data",
            Self::Contextualize => "Placing in context",
            Self::Critique => "Critiquing",
            Self::Hypothesize => "Forming hypotheses",
            Self::Analyze => "Analyzing",
        };
        format!("{verb}: {goal}")
    }

    /// System prompt that steers a step using this tool.
    #[must_use]
    pub const fn directive(&self) -> &'static str {
        match self {
            Self::SimulateAuthor => {
                "You are the author of this document. Answer the goal in the first person, \
                 defending and extending the work using only what the document supports. \
                 Be candid about limits the author would concede."
            }
            Self::ExtractData => {
                "You extract facts. List the exact figures, definitions, results and short \
                 quotes from the excerpt that bear on the goal. Keep paragraph markers like \
                 [P12] next to each item. Do not interpret."
            }
            Self::Contextualize => {
                "You place the document in context. Explain which prior work, assumptions and \
                 field conventions the goal depends on, and where this document departs from them."
            }
            Self::Critique => {
                "You are a rigorous peer reviewer. Identify weaknesses, confounds, missing \
                 controls and claims that outrun the evidence. Rank issues by severity and \
                 cite the passage behind each one."
            }
            Self::Hypothesize => {
                "You generate hypotheses. Propose explanations, predictions or follow-up \
                 experiments that address the goal, and state what evidence would confirm \
                 or refute each one."
            }
            Self::Analyze => {
                "You are a careful close reader. Address the goal directly using the excerpt \
                 and the previous steps, and note what the excerpt leaves unresolved."
            }
        }
    }
}

impl From<String> for ToolKind {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Agent that runs one plan step with a tool directive.
pub struct ToolAgent {
    kind: ToolKind,
    max_tokens: u32,
}

impl ToolAgent {
    /// Creates a step agent for `kind`.
    #[must_use]
    pub const fn new(kind: ToolKind, max_tokens: u32) -> Self {
        Self { kind, max_tokens }
    }

    /// Runs the step and returns its tagged result (`[TAG] text`).
    ///
    /// # Errors
    ///
    /// Propagates provider failures.
    pub async fn run(
        &self,
        target: &CallTarget<'_>,
        goal: &str,
        excerpt: &str,
        prior_results: &[String],
    ) -> Result<String, AgentError> {
        let response = self
            .execute(target, &build_step_prompt(goal, excerpt, prior_results))
            .await?;
        debug!(tool = %self.kind, chars = response.content.len(), "step finished");
        Ok(format!("[{}] {}", self.kind.tag(), response.content.trim()))
    }
}

#[async_trait]
impl Agent for ToolAgent {
    fn name(&self) -> &'static str {
        self.kind.as_str()
    }

    fn system_prompt(&self) -> &str {
        self.kind.directive()
    }

    fn temperature(&self) -> f32 {
        match self.kind {
            ToolKind::Hypothesize | ToolKind::SimulateAuthor => 0.6,
            ToolKind::ExtractData => 0.0,
            _ => 0.3,
        }
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
