//! Query intents and their handling path.
//!
//! Each [`Intent`] is permanently bound to either the fast single-call
//! path or the heavy plan/execute/synthesize path. The binding is a
//! property of the type, not of configuration.

use serde::{Deserialize, Serialize};

/// What the reader is asking for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// Conversational exchange about the document.
    Chat,
    /// Short analogy-first explanation of a concept.
    ExplainCompact,
    /// Three-bullet summary.
    #[serde(rename = "summary_3lines")]
    Summary3Lines,
    /// Structured markdown note suitable for a knowledge base.
    SummaryObsidian,
    /// Multi-step analysis of the document. The router's fallback.
    #[default]
    DeepAnalysis,
}

/// How an intent is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePath {
    /// One style-constrained provider call.
    Fast,
    /// Planner, sequential tool steps, synthesis.
    Heavy,
}

impl Intent {
    /// All intents, in the order the router prompt lists them.
    pub const ALL: [Self; 5] = [
        Self::Chat,
        Self::ExplainCompact,
        Self::Summary3Lines,
        Self::SummaryObsidian,
        Self::DeepAnalysis,
    ];

    /// Parses an intent label (case-insensitive, `-` and `_` interchangeable).
    ///
    /// Returns `None` for labels outside the closed set; callers decide
    /// the default.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().trim_matches('"').to_lowercase().replace('-', "_");
        match normalized.as_str() {
            "chat" => Some(Self::Chat),
            "explain_compact" => Some(Self::ExplainCompact),
            "summary_3lines" | "summary_3_lines" => Some(Self::Summary3Lines),
            "summary_obsidian" => Some(Self::SummaryObsidian),
            "deep_analysis" => Some(Self::DeepAnalysis),
            _ => None,
        }
    }

    /// Returns the wire label used in prompts and JSON.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::ExplainCompact => "explain_compact",
            Self::Summary3Lines => "summary_3lines",
            Self::SummaryObsidian => "summary_obsidian",
            Self::DeepAnalysis => "deep_analysis",
        }
    }

    /// Returns the handling path this intent is bound to.
    #[must_use]
    pub const fn path(self) -> ResponsePath {
        match self {
            Self::Chat | Self::ExplainCompact | Self::Summary3Lines => ResponsePath::Fast,
            Self::SummaryObsidian | Self::DeepAnalysis => ResponsePath::Heavy,
        }
    }

    /// Returns `true` if this intent is handled by the fast path.
    #[must_use]
    pub const fn is_fast(self) -> bool {
        matches!(self.path(), ResponsePath::Fast)
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::fmt::Display for ResponsePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fast => f.write_str("fast"),
            Self::Heavy => f.write_str("heavy"),
        }
    }
}
