//! Agent trait definition.
//!
//! Every pipeline role (router, responder, planner, tool steps, scanner,
//! synthesizer) implements this trait, which gives the orchestrator a
//! uniform way to run them against the active provider.

use async_trait::async_trait;

use super::client::ProviderHub;
use super::message::{ChatMessage, Role, SendOptions, system_message, user_message};
use super::models::ModelTarget;
use crate::core::ProviderId;
use crate::error::AgentError;

/// Where an agent's calls go: the hub, the active provider and the
/// user-selected model.
#[derive(Debug, Clone, Copy)]
pub struct CallTarget<'a> {
    /// Adapter registry.
    pub hub: &'a ProviderHub,
    /// Active provider.
    pub provider: ProviderId,
    /// User-selected model, if any.
    pub model: Option<&'a str>,
}

impl CallTarget<'_> {
    /// Resolves the model id for the given tier.
    #[must_use]
    pub fn model_for(&self, target: ModelTarget) -> String {
        self.hub.catalog().pick(self.provider, self.model, target)
    }
}

/// Response from an agent execution.
#[derive(Debug, Clone)]
pub struct AgentResponse {
    /// The agent's text output.
    pub content: String,
    /// Vendor usage statistics, passed through.
    pub usage: Option<serde_json::Value>,
    /// Why the model stopped generating (e.g. `"stop"`, `"length"`).
    pub finish_reason: Option<String>,
}

/// Trait implemented by all agents in the system.
///
/// Agents encapsulate a specific role with a fixed system prompt, model
/// tier and sampling configuration. The orchestrator calls
/// [`Agent::execute`] to run the agent against a [`CallTarget`].
#[async_trait]
pub trait Agent: Send + Sync {
    /// Agent name for logging and identification.
    fn name(&self) -> &'static str;

    /// System prompt that defines the agent's role and behavior.
    fn system_prompt(&self) -> &str;

    /// Which model tier this agent runs on.
    fn model_target(&self) -> ModelTarget {
        ModelTarget::Primary
    }

    /// Whether to request JSON-formatted output.
    fn json_mode(&self) -> bool {
        false
    }

    /// Sampling temperature (0.0 = deterministic, higher = more creative).
    fn temperature(&self) -> f32 {
        0.0
    }

    /// Maximum tokens for the response.
    fn max_tokens(&self) -> u32 {
        2048
    }

    /// Executes the agent with a single user message.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute(
        &self,
        target: &CallTarget<'_>,
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        self.execute_with_history(target, &[], user_msg).await
    }

    /// Executes the agent with prior conversation turns before the user message.
    ///
    /// System messages in `history` are dropped; the agent's own system
    /// prompt always comes first.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] on API failures.
    async fn execute_with_history(
        &self,
        target: &CallTarget<'_>,
        history: &[ChatMessage],
        user_msg: &str,
    ) -> Result<AgentResponse, AgentError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(system_message(self.system_prompt()));
        messages.extend(history.iter().filter(|m| m.role != Role::System).cloned());
        messages.push(user_message(user_msg));

        let options = SendOptions {
            temperature: Some(self.temperature()),
            max_tokens: Some(self.max_tokens()),
            json_mode: self.json_mode(),
        };
        let model = target.model_for(self.model_target());

        tracing::debug!(
            agent = self.name(),
            provider = %target.provider,
            model = %model,
            messages = messages.len(),
            "executing agent"
        );

        let response = target
            .hub
            .send(target.provider, &model, messages, &options)
            .await?;

        Ok(AgentResponse {
            content: response.content,
            usage: response.usage,
            finish_reason: response.finish_reason,
        })
    }
}
