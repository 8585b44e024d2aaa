//! Anthropic Messages API provider.
//!
//! System messages travel in the dedicated `system` field. The API rejects
//! an empty `messages` array, so a system-only conversation is sent as a
//! single user turn instead. Turns must alternate and open with a user
//! turn, so leading assistant turns are dropped and same-role neighbours
//! merged.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{http_client, join_url, status_error, transport_error};
use crate::agent::message::{
    ChatMessage, ChatRequest, ChatResponse, Role, alternating_turns, split_system,
};
use crate::agent::provider::LlmProvider;
use crate::core::ProviderId;
use crate::error::AgentError;

/// Default API root.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
/// API version header value.
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The API requires `max_tokens`; used when the request leaves it unset.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic Claude provider.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicProvider {
    /// Creates a provider for the given key and optional base URL.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if the HTTP client cannot be built.
    pub fn new(
        api_key: impl Into<String>,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        Ok(Self {
            client: http_client(ProviderId::Anthropic, timeout)?,
            api_key: api_key.into(),
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).to_string(),
        })
    }

    fn build_request(request: &ChatRequest) -> MessagesRequest {
        let (system, turns) = split_system(&request.messages);
        let turns = alternating_turns(turns);
        let (system, turns) = match (system, turns.is_empty()) {
            (Some(text), true) => (None, vec![ChatMessage { role: Role::User, content: text }]),
            (system, _) => (system, turns),
        };

        MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            system,
            messages: turns
                .into_iter()
                .map(|m| WireMessage {
                    role: if m.role == Role::Assistant {
                        "assistant"
                    } else {
                        "user"
                    },
                    content: m.content,
                })
                .collect(),
            temperature: request.temperature,
        }
    }
}

impl std::fmt::Debug for AnthropicProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Anthropic
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let body = Self::build_request(request);
        debug!(
            model = %body.model,
            turns = body.messages.len(),
            has_system = body.system.is_some(),
            "sending anthropic messages request"
        );

        let response = self
            .client
            .post(join_url(&self.base_url, "messages"))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(ProviderId::Anthropic, &e))?;

        if !response.status().is_success() {
            return Err(status_error(ProviderId::Anthropic, response).await);
        }

        let parsed: MessagesResponse = response.json().await.map_err(|e| {
            error!(error = %e, "failed to parse anthropic response");
            AgentError::provider(ProviderId::Anthropic, format!("malformed response: {e}"))
        })?;

        let content: String = parsed
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();
        if content.is_empty() {
            return Err(AgentError::provider(
                ProviderId::Anthropic,
                "no text content in response",
            ));
        }

        Ok(ChatResponse {
            content,
            usage: parsed.usage,
            finish_reason: parsed.stop_reason.map(|r| r.to_lowercase()),
        })
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
    usage: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}
