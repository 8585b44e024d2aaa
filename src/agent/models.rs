//! Per-provider model tables.
//!
//! Each provider has a default model, an optional cheaper model used for
//! classification and scanning, and optionally a naming prefix that valid
//! model ids must carry.

use tracing::warn;

use crate::core::ProviderId;
use crate::error::AgentError;

/// What to do when a requested model id breaks the provider's naming rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelPolicy {
    /// Silently use the provider's default model instead.
    #[default]
    Substitute,
    /// Fail with [`AgentError::InvalidModel`].
    Reject,
}

/// Which model tier a call should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTarget {
    /// The configured (or default) model.
    Primary,
    /// The provider's cheap model, falling back to the primary model.
    Cheap,
}

/// Model table for one provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderModels {
    /// Model used when none is configured.
    pub default: String,
    /// Cheaper model for classification and scanning, if the provider has one.
    pub cheap: Option<String>,
    /// Prefix every valid model id must start with.
    pub required_prefix: Option<String>,
}

impl ProviderModels {
    /// Creates a model table.
    #[must_use]
    pub fn new(default: &str, cheap: Option<&str>, required_prefix: Option<&str>) -> Self {
        Self {
            default: default.to_string(),
            cheap: cheap.map(str::to_string),
            required_prefix: required_prefix.map(str::to_string),
        }
    }

    /// Returns `true` if `model` satisfies the naming rule.
    #[must_use]
    pub fn accepts(&self, model: &str) -> bool {
        self.required_prefix
            .as_deref()
            .is_none_or(|prefix| model.starts_with(prefix))
    }
}

/// Default and cheap models for every provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCatalog {
    openai: ProviderModels,
    anthropic: ProviderModels,
    gemini: ProviderModels,
}

impl Default for ModelCatalog {
    fn default() -> Self {
        Self {
            openai: ProviderModels::new("gpt-4o", Some("gpt-4o-mini"), None),
            anthropic: ProviderModels::new(
                "claude-sonnet-4-20250514",
                Some("claude-3-5-haiku-latest"),
                Some("claude-"),
            ),
            gemini: ProviderModels::new("gemini-2.0-flash", Some("gemini-2.0-flash-lite"), None),
        }
    }
}

impl ModelCatalog {
    /// Returns the table for `provider`.
    #[must_use]
    pub const fn get(&self, provider: ProviderId) -> &ProviderModels {
        match provider {
            ProviderId::OpenAi => &self.openai,
            ProviderId::Anthropic => &self.anthropic,
            ProviderId::Gemini => &self.gemini,
        }
    }

    /// Replaces the table for `provider`.
    #[must_use]
    pub fn with(mut self, provider: ProviderId, models: ProviderModels) -> Self {
        match provider {
            ProviderId::OpenAi => self.openai = models,
            ProviderId::Anthropic => self.anthropic = models,
            ProviderId::Gemini => self.gemini = models,
        }
        self
    }

    /// Returns `true` if `provider` has a cheap model.
    #[must_use]
    pub const fn has_cheap(&self, provider: ProviderId) -> bool {
        self.get(provider).cheap.is_some()
    }

    /// Picks the model id to request for a call.
    ///
    /// `configured` is the user-selected model (if any); it is used for
    /// [`ModelTarget::Primary`] and as the fallback for
    /// [`ModelTarget::Cheap`] when the provider has no cheap model.
    #[must_use]
    pub fn pick(
        &self,
        provider: ProviderId,
        configured: Option<&str>,
        target: ModelTarget,
    ) -> String {
        let models = self.get(provider);
        match (target, models.cheap.as_deref()) {
            (ModelTarget::Cheap, Some(cheap)) => cheap.to_string(),
            _ => configured.map_or_else(|| models.default.clone(), str::to_string),
        }
    }

    /// Validates `model` against the provider's naming rule.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidModel`] when the id breaks the rule and
    /// `policy` is [`ModelPolicy::Reject`].
    pub fn resolve(
        &self,
        provider: ProviderId,
        model: &str,
        policy: ModelPolicy,
    ) -> Result<String, AgentError> {
        let models = self.get(provider);
        if models.accepts(model) {
            return Ok(model.to_string());
        }
        match policy {
            ModelPolicy::Substitute => {
                warn!(
                    provider = %provider,
                    requested = model,
                    substitute = %models.default,
                    "model id does not match provider naming, using default"
                );
                Ok(models.default.clone())
            }
            ModelPolicy::Reject => Err(AgentError::InvalidModel {
                provider,
                model: model.to_string(),
            }),
        }
    }
}
