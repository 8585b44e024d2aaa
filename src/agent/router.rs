//! Intent router.
//!
//! One deterministic call on the cheap model decides whether a query is
//! answered on the fast path or the heavy path. The router never fails:
//! any error or unrecognized answer routes to [`Intent::DeepAnalysis`].

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use super::config::AgentConfig;
use super::extract::extract;
use super::models::ModelTarget;
use super::prompt::build_router_prompt;
use super::traits::{Agent, CallTarget};
use crate::core::Intent;

/// Agent that classifies a query into an [`Intent`].
pub struct IntentRouter {
    max_tokens: u32,
    system_prompt: String,
}

impl IntentRouter {
    /// Creates a new router with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            max_tokens: config.router_max_tokens,
            system_prompt,
        }
    }

    /// Classifies `query`, defaulting to [`Intent::DeepAnalysis`] on any failure.
    pub async fn classify(&self, target: &CallTarget<'_>, query: &str) -> Intent {
        let response = match self.execute(target, &build_router_prompt(query)).await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "intent classification failed, defaulting to deep_analysis");
                return Intent::default();
            }
        };

        match Self::parse_intent(&response.content) {
            Some(intent) => {
                info!(intent = %intent, "query classified");
                intent
            }
            None => {
                warn!(
                    content = %response.content,
                    "unrecognized intent, defaulting to deep_analysis"
                );
                Intent::default()
            }
        }
    }

    /// Reads an intent from router output.
    ///
    /// Accepts `{"intent": "..."}`, a JSON string, or a bare label.
    fn parse_intent(content: &str) -> Option<Intent> {
        match extract(content) {
            Ok(Value::Object(map)) => map.get("intent").and_then(Value::as_str).and_then(Intent::parse),
            Ok(Value::String(label)) => Intent::parse(&label),
            Ok(_) => None,
            Err(_) => Intent::parse(content),
        }
    }
}

#[async_trait]
impl Agent for IntentRouter {
    fn name(&self) -> &'static str {
        "router"
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn model_target(&self) -> ModelTarget {
        ModelTarget::Cheap
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn temperature(&self) -> f32 {
        0.0
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(r#"{"intent": "chat"}"#, Some(Intent::Chat) ; "json object")]
    #[test_case("```json\n{\"intent\":\"summary_3lines\"}\n```", Some(Intent::Summary3Lines) ; "fenced")]
    #[test_case(r#""explain_compact""#, Some(Intent::ExplainCompact) ; "json string")]
    #[test_case("summary_obsidian", Some(Intent::SummaryObsidian) ; "bare label")]
    #[test_case(r#"{"intent": "poetry"}"#, None ; "unknown label")]
    #[test_case(r#"{"label": "chat"}"#, None ; "wrong key")]
    #[test_case("I think this is a chat question", None ; "prose")]
    fn test_parse_intent(content: &str, expected: Option<Intent>) {
        assert_eq!(IntentRouter::parse_intent(content), expected);
    }

    #[test]
    fn test_agent_properties() {
        use super::super::prompt::ROUTER_SYSTEM_PROMPT;
        let config = AgentConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        let router = IntentRouter::new(&config, ROUTER_SYSTEM_PROMPT.to_string());
        assert_eq!(router.name(), "router");
        assert_eq!(router.model_target(), ModelTarget::Cheap);
        assert!(router.temperature().abs() < f32::EPSILON);
        assert!(router.json_mode());
    }
}
