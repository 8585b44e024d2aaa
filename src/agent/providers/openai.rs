//! `OpenAI` provider implementation using the `async-openai` crate.
//!
//! Supports any `OpenAI`-compatible API (`OpenAI`, Azure, local proxies)
//! via the base URL override in [`AgentConfig`](crate::agent::AgentConfig).

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, ResponseFormat,
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use tracing::{debug, error};

use super::http_client;
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, Role};
use crate::agent::provider::LlmProvider;
use crate::core::ProviderId;
use crate::error::AgentError;

/// `OpenAI`-compatible LLM provider.
///
/// The client's built-in retry loop is switched off so that each call
/// is exactly one outbound request.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
}

impl OpenAiProvider {
    /// Creates a new provider for the given key and optional base URL.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if the HTTP client cannot be built.
    pub fn new(
        api_key: &str,
        base_url: Option<&str>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let mut openai_config = OpenAIConfig::new().with_api_key(api_key);

        if let Some(base_url) = base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        let no_retry = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();

        Ok(Self {
            client: Client::with_config(openai_config)
                .with_http_client(http_client(ProviderId::OpenAi, timeout)?)
                .with_backoff(no_retry),
        })
    }

    /// Converts our message type to the `OpenAI` SDK type.
    fn convert_message(msg: &ChatMessage) -> ChatCompletionRequestMessage {
        match msg.role {
            Role::System => {
                ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(msg.content.clone()),
                    name: None,
                })
            }
            Role::User => ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(msg.content.clone()),
                name: None,
            }),
            Role::Assistant => {
                #[allow(deprecated)]
                ChatCompletionRequestMessage::Assistant(ChatCompletionRequestAssistantMessage {
                    content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                        msg.content.clone(),
                    )),
                    name: None,
                    tool_calls: None,
                    refusal: None,
                    audio: None,
                    function_call: None,
                })
            }
        }
    }

    /// Builds an `OpenAI` chat completion request from our generic request.
    fn build_request(request: &ChatRequest) -> CreateChatCompletionRequest {
        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
            response_format: request.json_mode.then_some(ResponseFormat::JsonObject),
            ..Default::default()
        }
    }

    fn map_error(e: OpenAIError) -> AgentError {
        error!(error = %e, "openai request failed");
        match e {
            OpenAIError::ApiError(api) => AgentError::Provider {
                provider: ProviderId::OpenAi,
                message: api.message.clone(),
                vendor_detail: api.r#type.clone(),
            },
            other => AgentError::provider(ProviderId::OpenAi, other.to_string()),
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("client", &"<async-openai::Client>")
            .finish()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let openai_request = Self::build_request(request);
        debug!(
            model = %openai_request.model,
            messages = openai_request.messages.len(),
            json_mode = request.json_mode,
            "sending openai chat completion"
        );

        let response = self
            .client
            .chat()
            .create(openai_request)
            .await
            .map_err(Self::map_error)?;

        let Some(choice) = response.choices.first() else {
            return Err(AgentError::provider(
                ProviderId::OpenAi,
                "response contained no choices",
            ));
        };

        let finish_reason = choice
            .finish_reason
            .as_ref()
            .map(|fr| format!("{fr:?}").to_lowercase());
        let Some(content) = choice
            .message
            .content
            .clone()
            .filter(|c| !c.trim().is_empty())
        else {
            error!(finish_reason = ?finish_reason, "openai returned no message content");
            return Err(AgentError::Provider {
                provider: ProviderId::OpenAi,
                message: "response contained no message content".to_string(),
                vendor_detail: choice.message.refusal.clone().or(finish_reason),
            });
        };
        let usage = response
            .usage
            .as_ref()
            .and_then(|u| serde_json::to_value(u).ok());

        Ok(ChatResponse {
            content,
            usage,
            finish_reason,
        })
    }
}
