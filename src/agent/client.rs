//! Provider registry and dispatch.
//!
//! [`ProviderHub`] maps provider ids to concrete [`LlmProvider`]
//! implementations, enforces model naming rules and turns an absent
//! credential into [`AgentError::MissingCredential`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::agent::config::AgentConfig;
use crate::agent::message::{ChatMessage, ChatRequest, ChatResponse, SendOptions};
use crate::agent::models::{ModelCatalog, ModelPolicy};
use crate::agent::provider::LlmProvider;
use crate::agent::providers::{AnthropicProvider, GeminiProvider, OpenAiProvider};
use crate::core::ProviderId;
use crate::error::AgentError;

/// Creates an [`LlmProvider`] for `provider` from configuration.
///
/// # Supported Providers
///
/// - `openai` (default), via `async-openai`
/// - `anthropic`, Messages API
/// - `gemini`, `generateContent`
///
/// # Errors
///
/// Returns [`AgentError::MissingCredential`] when no key is configured for
/// `provider`, or [`AgentError::Config`] if the HTTP client cannot be built.
pub fn create_provider(
    provider: ProviderId,
    config: &AgentConfig,
) -> Result<Arc<dyn LlmProvider>, AgentError> {
    let key = config
        .credentials
        .get(provider)
        .ok_or(AgentError::MissingCredential { provider })?;
    let base_url = config.base_url(provider);

    Ok(match provider {
        ProviderId::OpenAi => Arc::new(OpenAiProvider::new(key, base_url, config.timeout)?),
        ProviderId::Anthropic => Arc::new(AnthropicProvider::new(key, base_url, config.timeout)?),
        ProviderId::Gemini => Arc::new(GeminiProvider::new(key, base_url, config.timeout)?),
    })
}

/// Read-only registry of provider adapters.
///
/// Shared across invocations; holds no per-call state.
#[derive(Clone)]
pub struct ProviderHub {
    providers: HashMap<ProviderId, Arc<dyn LlmProvider>>,
    catalog: ModelCatalog,
    policy: ModelPolicy,
}

impl ProviderHub {
    /// Creates an empty hub.
    #[must_use]
    pub fn new(catalog: ModelCatalog, policy: ModelPolicy) -> Self {
        Self {
            providers: HashMap::new(),
            catalog,
            policy,
        }
    }

    /// Builds a hub with an adapter for every provider that has a credential.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if an adapter cannot be constructed.
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        let mut hub = Self::new(config.catalog.clone(), config.model_policy);
        for provider in config.credentials.providers() {
            hub = hub.register(create_provider(provider, config)?);
        }
        debug!(providers = ?hub.registered(), "provider hub ready");
        Ok(hub)
    }

    /// Registers (or replaces) the adapter for its provider id.
    #[must_use]
    pub fn register(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.providers.insert(provider.id(), provider);
        self
    }

    /// Providers with a registered adapter, in display order.
    #[must_use]
    pub fn registered(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|p| self.providers.contains_key(p))
            .collect()
    }

    /// Returns the model catalog.
    #[must_use]
    pub const fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }

    /// Fails unless an adapter is registered for `provider`.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::MissingCredential`].
    pub fn ensure_credential(&self, provider: ProviderId) -> Result<(), AgentError> {
        if self.providers.contains_key(&provider) {
            Ok(())
        } else {
            Err(AgentError::MissingCredential { provider })
        }
    }

    /// Sends one chat request to `provider`.
    ///
    /// The model id is checked against the provider's naming rule first;
    /// under [`ModelPolicy::Substitute`] a non-conforming id is replaced by
    /// the provider default.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::MissingCredential`] if no adapter is
    /// registered, [`AgentError::InvalidModel`] under
    /// [`ModelPolicy::Reject`], or whatever the adapter returns.
    pub async fn send(
        &self,
        provider: ProviderId,
        model: &str,
        messages: Vec<ChatMessage>,
        options: &SendOptions,
    ) -> Result<ChatResponse, AgentError> {
        let adapter = self
            .providers
            .get(&provider)
            .ok_or(AgentError::MissingCredential { provider })?;
        let model = self.catalog.resolve(provider, model, self.policy)?;
        let request = ChatRequest::new(model, messages, options);

        let start = Instant::now();
        let response = adapter.chat(&request).await?;
        debug!(
            provider = %provider,
            model = %request.model,
            chars = response.content.len(),
            elapsed_ms = start.elapsed().as_millis(),
            "provider call completed"
        );
        Ok(response)
    }
}

impl std::fmt::Debug for ProviderHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderHub")
            .field("providers", &self.registered())
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
