//! Google Gemini `generateContent` provider.
//!
//! Gemini differs from the other vendors in three ways that the adapter
//! hides from callers:
//!
//! - System messages go into `systemInstruction`; assistant turns use the
//!   role `model`. A conversation with only system content is sent as one
//!   user turn, since the API requires at least one content entry. Turns
//!   are reshaped to alternate and to open with a user turn.
//! - Every harm category is explicitly set to `BLOCK_NONE`. Documents under
//!   analysis routinely quote material the default filters reject.
//! - A response with no candidates or no text is a block, reported as
//!   [`AgentError::ContentBlocked`] with the vendor's reason.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use super::{http_client, join_url, status_error, transport_error};
use crate::agent::message::{ChatRequest, ChatResponse, Role, alternating_turns, split_system};
use crate::agent::provider::LlmProvider;
use crate::core::ProviderId;
use crate::error::AgentError;

/// Default API root.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Harm categories relaxed on every request.
const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// Reason reported when the vendor gives none.
const EMPTY_RESPONSE: &str = "EMPTY_RESPONSE";

/// Google Gemini provider.
pub struct GeminiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GeminiProvider {
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
            client: http_client(ProviderId::Gemini, timeout)?,
            api_key: api_key.into(),
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).to_string(),
        })
    }

    const fn role_to_gemini(role: Role) -> &'static str {
        match role {
            Role::Assistant => "model",
            Role::System | Role::User => "user",
        }
    }

    fn build_request(request: &ChatRequest) -> GenerateContentRequest {
        let (system, turns) = split_system(&request.messages);

        let mut contents: Vec<Content> = alternating_turns(turns)
            .into_iter()
            .map(|m| Content {
                role: Self::role_to_gemini(m.role).to_string(),
                parts: vec![Part { text: m.content }],
            })
            .collect();

        let system_instruction = match system {
            Some(text) if contents.is_empty() => {
                contents.push(Content {
                    role: "user".to_string(),
                    parts: vec![Part { text }],
                });
                None
            }
            Some(text) => Some(SystemInstruction {
                parts: vec![Part { text }],
            }),
            None => None,
        };

        GenerateContentRequest {
            contents,
            system_instruction,
            safety_settings: SAFETY_CATEGORIES
                .into_iter()
                .map(|category| SafetySetting {
                    category,
                    threshold: "BLOCK_NONE",
                })
                .collect(),
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
                response_mime_type: request.json_mode.then_some("application/json"),
            },
        }
    }

    /// Normalizes a parsed response, turning empty output into a block.
    fn into_chat_response(parsed: GenerateContentResponse) -> Result<ChatResponse, AgentError> {
        let block_reason = parsed
            .prompt_feedback
            .as_ref()
            .and_then(|f| f.block_reason.clone());

        let Some(candidate) = parsed.candidates.into_iter().next() else {
            let reason = block_reason.unwrap_or_else(|| EMPTY_RESPONSE.to_string());
            warn!(reason = %reason, "gemini returned no candidates");
            return Err(AgentError::ContentBlocked {
                provider: ProviderId::Gemini,
                reason,
            });
        };

        let text: String = candidate
            .content
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let reason = block_reason
                .or_else(|| candidate.finish_reason.clone())
                .unwrap_or_else(|| EMPTY_RESPONSE.to_string());
            warn!(reason = %reason, "gemini returned an empty candidate");
            return Err(AgentError::ContentBlocked {
                provider: ProviderId::Gemini,
                reason,
            });
        }

        Ok(ChatResponse {
            content: text,
            usage: parsed.usage_metadata,
            finish_reason: candidate.finish_reason.map(|r| r.to_lowercase()),
        })
    }
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let body = Self::build_request(request);
        debug!(
            model = %request.model,
            contents = body.contents.len(),
            has_system_instruction = body.system_instruction.is_some(),
            "sending gemini generateContent request"
        );

        let url = join_url(
            &self.base_url,
            &format!("models/{}:generateContent", request.model),
        );
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error(ProviderId::Gemini, &e))?;

        if !response.status().is_success() {
            return Err(status_error(ProviderId::Gemini, response).await);
        }

        let parsed: GenerateContentResponse = response.json().await.map_err(|e| {
            error!(error = %e, "failed to parse gemini response");
            AgentError::provider(ProviderId::Gemini, format!("malformed response: {e}"))
        })?;

        Self::into_chat_response(parsed)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction>,
    safety_settings: Vec<SafetySetting>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
struct SystemInstruction {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<&'static str>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    usage_metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}
