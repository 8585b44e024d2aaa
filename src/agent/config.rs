//! Agent configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use super::models::{ModelCatalog, ModelPolicy};
use crate::core::ProviderId;
use crate::error::AgentError;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 120;
/// Default document prefix sent on the fast path.
const DEFAULT_FAST_EXCERPT_CHARS: usize = 12_000;
/// Default document prefix sent with each heavy-path step.
const DEFAULT_STEP_EXCERPT_CHARS: usize = 8_000;
/// Default working context when no scan or selection narrows it.
const DEFAULT_SYNTHESIS_EXCERPT_CHARS: usize = 30_000;
/// Documents longer than this are scanned before planning. Matches the
/// synthesis window so nothing past it is dropped unread.
const DEFAULT_SCAN_THRESHOLD_CHARS: usize = DEFAULT_SYNTHESIS_EXCERPT_CHARS;
/// Context used when the scan reports the whole document as relevant.
const DEFAULT_ALL_RELEVANT_CHARS: usize = 60_000;
/// Default number of prior conversation turns forwarded to the model.
const DEFAULT_MAX_HISTORY_TURNS: usize = 6;
/// Default router max tokens.
const DEFAULT_ROUTER_MAX_TOKENS: u32 = 64;
/// Default fast-path max tokens.
const DEFAULT_FAST_MAX_TOKENS: u32 = 1024;
/// Default planner max tokens.
const DEFAULT_PLANNER_MAX_TOKENS: u32 = 512;
/// Default per-step max tokens.
const DEFAULT_STEP_MAX_TOKENS: u32 = 1024;
/// Default synthesizer max tokens.
const DEFAULT_SYNTHESIZER_MAX_TOKENS: u32 = 4096;
/// Default scan max tokens.
const DEFAULT_SCAN_MAX_TOKENS: u32 = 4096;

/// One credential per provider.
///
/// The `Debug` impl never prints key material.
#[derive(Clone, Default)]
pub struct Credentials {
    keys: HashMap<ProviderId, String>,
}

impl Credentials {
    /// Creates an empty credential map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` for `provider`. Blank keys are ignored.
    pub fn insert(&mut self, provider: ProviderId, key: impl Into<String>) {
        let key = key.into();
        if !key.trim().is_empty() {
            self.keys.insert(provider, key);
        }
    }

    /// Returns the credential for `provider`, if one is registered.
    #[must_use]
    pub fn get(&self, provider: ProviderId) -> Option<&str> {
        self.keys.get(&provider).map(String::as_str)
    }

    /// Returns `true` if a credential is registered for `provider`.
    #[must_use]
    pub fn contains(&self, provider: ProviderId) -> bool {
        self.keys.contains_key(&provider)
    }

    /// Providers with a registered credential, in display order.
    #[must_use]
    pub fn providers(&self) -> Vec<ProviderId> {
        ProviderId::ALL
            .into_iter()
            .filter(|p| self.contains(*p))
            .collect()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.providers()).finish()
    }
}

/// Configuration for the agent system.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Provider that answers queries.
    pub provider: ProviderId,
    /// User-selected model id; `None` uses the catalog default.
    pub model: Option<String>,
    /// API keys by provider.
    pub credentials: Credentials,
    /// Base URL overrides by provider (for proxies or compatible APIs).
    pub base_urls: HashMap<ProviderId, String>,
    /// Default and cheap model tables.
    pub catalog: ModelCatalog,
    /// Handling of model ids that break a provider's naming rule.
    pub model_policy: ModelPolicy,
    /// Providers whose fast-path prompts get an extra brevity directive.
    pub verbose_providers: Vec<ProviderId>,
    /// Request timeout.
    pub timeout: Duration,
    /// Document prefix (graphemes) used on the fast path.
    pub fast_excerpt_chars: usize,
    /// Document prefix (graphemes) sent with each heavy-path step.
    pub step_excerpt_chars: usize,
    /// Working context prefix when neither a selection nor a scan applies.
    pub synthesis_excerpt_chars: usize,
    /// Documents longer than this are scanned with the cheap model. The
    /// scan also runs for any document longer than `synthesis_excerpt_chars`.
    pub scan_threshold_chars: usize,
    /// Context prefix used when the scan answers `ALL_RELEVANT`.
    pub all_relevant_chars: usize,
    /// Prior conversation turns forwarded to the model.
    pub max_history_turns: usize,
    /// Maximum tokens for the router.
    pub router_max_tokens: u32,
    /// Maximum tokens for fast-path responses.
    pub fast_max_tokens: u32,
    /// Maximum tokens for the planner.
    pub planner_max_tokens: u32,
    /// Maximum tokens per heavy-path step.
    pub step_max_tokens: u32,
    /// Maximum tokens for the synthesizer.
    pub synthesizer_max_tokens: u32,
    /// Maximum tokens for the scan pass.
    pub scan_max_tokens: u32,
    /// Directory containing prompt template files.
    ///
    /// When set, system prompts are loaded from markdown files in this
    /// directory, falling back to compiled-in defaults for missing files.
    pub prompt_dir: Option<PathBuf>,
}

impl AgentConfig {
    /// Creates a new builder for `AgentConfig`.
    #[must_use]
    pub fn builder() -> AgentConfigBuilder {
        AgentConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnsupportedProvider`] if `PAPERQA_PROVIDER`
    /// names an unknown vendor.
    pub fn from_env() -> Result<Self, AgentError> {
        Self::builder().from_env().build()
    }

    /// Returns the base URL override for `provider`.
    #[must_use]
    pub fn base_url(&self, provider: ProviderId) -> Option<&str> {
        self.base_urls.get(&provider).map(String::as_str)
    }

    /// Returns `true` if fast-path prompts for the active provider need
    /// the brevity directive.
    #[must_use]
    pub fn is_verbose_provider(&self) -> bool {
        self.verbose_providers.contains(&self.provider)
    }
}

/// Builder for [`AgentConfig`].
#[derive(Debug, Clone, Default)]
pub struct AgentConfigBuilder {
    provider: Option<String>,
    model: Option<String>,
    credentials: Credentials,
    base_urls: HashMap<ProviderId, String>,
    catalog: Option<ModelCatalog>,
    model_policy: Option<ModelPolicy>,
    verbose_providers: Option<Vec<ProviderId>>,
    timeout: Option<Duration>,
    fast_excerpt_chars: Option<usize>,
    step_excerpt_chars: Option<usize>,
    synthesis_excerpt_chars: Option<usize>,
    scan_threshold_chars: Option<usize>,
    all_relevant_chars: Option<usize>,
    max_history_turns: Option<usize>,
    router_max_tokens: Option<u32>,
    fast_max_tokens: Option<u32>,
    planner_max_tokens: Option<u32>,
    step_max_tokens: Option<u32>,
    synthesizer_max_tokens: Option<u32>,
    scan_max_tokens: Option<u32>,
    prompt_dir: Option<PathBuf>,
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AgentConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.provider.is_none() {
            self.provider = env_nonempty("PAPERQA_PROVIDER");
        }
        if self.model.is_none() {
            self.model = env_nonempty("PAPERQA_MODEL");
        }
        let keys = [
            (ProviderId::OpenAi, env_nonempty("OPENAI_API_KEY")),
            (ProviderId::Anthropic, env_nonempty("ANTHROPIC_API_KEY")),
            (
                ProviderId::Gemini,
                env_nonempty("GEMINI_API_KEY").or_else(|| env_nonempty("GOOGLE_API_KEY")),
            ),
        ];
        for (provider, key) in keys {
            if let Some(key) = key
                && !self.credentials.contains(provider)
            {
                self.credentials.insert(provider, key);
            }
        }
        let urls = [
            (ProviderId::OpenAi, "OPENAI_BASE_URL"),
            (ProviderId::Anthropic, "ANTHROPIC_BASE_URL"),
            (ProviderId::Gemini, "GEMINI_BASE_URL"),
        ];
        for (provider, var) in urls {
            if let Some(url) = env_nonempty(var) {
                self.base_urls.entry(provider).or_insert(url);
            }
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = env_nonempty("PAPERQA_PROMPT_DIR").map(PathBuf::from);
        }
        if self.timeout.is_none() {
            self.timeout = env_nonempty("PAPERQA_TIMEOUT_SECS")
                .and_then(|v| v.parse().ok())
                .map(Duration::from_secs);
        }
        self
    }

    /// Sets the provider by name (`openai`, `anthropic`, `gemini`).
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the model id.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Registers an API key for `provider`.
    #[must_use]
    pub fn api_key(mut self, provider: ProviderId, key: impl Into<String>) -> Self {
        self.credentials.insert(provider, key);
        self
    }

    /// Sets a base URL override for `provider`.
    #[must_use]
    pub fn base_url(mut self, provider: ProviderId, url: impl Into<String>) -> Self {
        self.base_urls.insert(provider, url.into());
        self
    }

    /// Replaces the model catalog.
    #[must_use]
    pub fn catalog(mut self, catalog: ModelCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Sets the model naming policy.
    #[must_use]
    pub const fn model_policy(mut self, policy: ModelPolicy) -> Self {
        self.model_policy = Some(policy);
        self
    }

    /// Sets the providers that get the fast-path brevity directive.
    #[must_use]
    pub fn verbose_providers(mut self, providers: Vec<ProviderId>) -> Self {
        self.verbose_providers = Some(providers);
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Sets the fast-path document prefix.
    #[must_use]
    pub const fn fast_excerpt_chars(mut self, n: usize) -> Self {
        self.fast_excerpt_chars = Some(n);
        self
    }

    /// Sets the per-step document prefix.
    #[must_use]
    pub const fn step_excerpt_chars(mut self, n: usize) -> Self {
        self.step_excerpt_chars = Some(n);
        self
    }

    /// Sets the default working context prefix.
    #[must_use]
    pub const fn synthesis_excerpt_chars(mut self, n: usize) -> Self {
        self.synthesis_excerpt_chars = Some(n);
        self
    }

    /// Sets the document length above which the scan pass runs.
    #[must_use]
    pub const fn scan_threshold_chars(mut self, n: usize) -> Self {
        self.scan_threshold_chars = Some(n);
        self
    }

    /// Sets the context prefix used for `ALL_RELEVANT` scans.
    #[must_use]
    pub const fn all_relevant_chars(mut self, n: usize) -> Self {
        self.all_relevant_chars = Some(n);
        self
    }

    /// Sets how many prior turns are forwarded.
    #[must_use]
    pub const fn max_history_turns(mut self, n: usize) -> Self {
        self.max_history_turns = Some(n);
        self
    }

    /// Sets the router max tokens.
    #[must_use]
    pub const fn router_max_tokens(mut self, n: u32) -> Self {
        self.router_max_tokens = Some(n);
        self
    }

    /// Sets the fast-path max tokens.
    #[must_use]
    pub const fn fast_max_tokens(mut self, n: u32) -> Self {
        self.fast_max_tokens = Some(n);
        self
    }

    /// Sets the planner max tokens.
    #[must_use]
    pub const fn planner_max_tokens(mut self, n: u32) -> Self {
        self.planner_max_tokens = Some(n);
        self
    }

    /// Sets the per-step max tokens.
    #[must_use]
    pub const fn step_max_tokens(mut self, n: u32) -> Self {
        self.step_max_tokens = Some(n);
        self
    }

    /// Sets the synthesizer max tokens.
    #[must_use]
    pub const fn synthesizer_max_tokens(mut self, n: u32) -> Self {
        self.synthesizer_max_tokens = Some(n);
        self
    }

    /// Sets the scan pass max tokens.
    #[must_use]
    pub const fn scan_max_tokens(mut self, n: u32) -> Self {
        self.scan_max_tokens = Some(n);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`AgentConfig`].
    ///
    /// Missing credentials are not an error here; they surface when the
    /// provider is first addressed.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::UnsupportedProvider`] for unknown provider
    /// names and [`AgentError::Config`] for zero-sized windows or timeouts.
    pub fn build(self) -> Result<AgentConfig, AgentError> {
        let provider = match self.provider {
            Some(name) => ProviderId::parse(&name)
                .ok_or(AgentError::UnsupportedProvider { name })?,
            None => ProviderId::OpenAi,
        };

        let config = AgentConfig {
            provider,
            model: self.model.filter(|m| !m.trim().is_empty()),
            credentials: self.credentials,
            base_urls: self.base_urls,
            catalog: self.catalog.unwrap_or_default(),
            model_policy: self.model_policy.unwrap_or_default(),
            verbose_providers: self
                .verbose_providers
                .unwrap_or_else(|| vec![ProviderId::Gemini]),
            timeout: self
                .timeout
                .unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
            fast_excerpt_chars: self
                .fast_excerpt_chars
                .unwrap_or(DEFAULT_FAST_EXCERPT_CHARS),
            step_excerpt_chars: self
                .step_excerpt_chars
                .unwrap_or(DEFAULT_STEP_EXCERPT_CHARS),
            synthesis_excerpt_chars: self
                .synthesis_excerpt_chars
                .unwrap_or(DEFAULT_SYNTHESIS_EXCERPT_CHARS),
            scan_threshold_chars: self
                .scan_threshold_chars
                .unwrap_or(DEFAULT_SCAN_THRESHOLD_CHARS),
            all_relevant_chars: self
                .all_relevant_chars
                .unwrap_or(DEFAULT_ALL_RELEVANT_CHARS),
            max_history_turns: self.max_history_turns.unwrap_or(DEFAULT_MAX_HISTORY_TURNS),
            router_max_tokens: self.router_max_tokens.unwrap_or(DEFAULT_ROUTER_MAX_TOKENS),
            fast_max_tokens: self.fast_max_tokens.unwrap_or(DEFAULT_FAST_MAX_TOKENS),
            planner_max_tokens: self
                .planner_max_tokens
                .unwrap_or(DEFAULT_PLANNER_MAX_TOKENS),
            step_max_tokens: self.step_max_tokens.unwrap_or(DEFAULT_STEP_MAX_TOKENS),
            synthesizer_max_tokens: self
                .synthesizer_max_tokens
                .unwrap_or(DEFAULT_SYNTHESIZER_MAX_TOKENS),
            scan_max_tokens: self.scan_max_tokens.unwrap_or(DEFAULT_SCAN_MAX_TOKENS),
            prompt_dir: self.prompt_dir,
        };

        let windows = [
            ("fast_excerpt_chars", config.fast_excerpt_chars),
            ("step_excerpt_chars", config.step_excerpt_chars),
            ("synthesis_excerpt_chars", config.synthesis_excerpt_chars),
            ("all_relevant_chars", config.all_relevant_chars),
        ];
        if let Some((name, _)) = windows.iter().find(|(_, v)| *v == 0) {
            return Err(AgentError::Config {
                message: format!("{name} must be greater than zero"),
            });
        }
        if config.timeout.is_zero() {
            return Err(AgentError::Config {
                message: "timeout must be greater than zero".to_string(),
            });
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = AgentConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, ProviderId::OpenAi);
        assert!(config.model.is_none());
        assert_eq!(config.fast_excerpt_chars, DEFAULT_FAST_EXCERPT_CHARS);
        assert_eq!(config.max_history_turns, DEFAULT_MAX_HISTORY_TURNS);
        assert_eq!(config.verbose_providers, vec![ProviderId::Gemini]);
        assert_eq!(config.model_policy, ModelPolicy::Substitute);
    }

    #[test]
    fn test_default_scan_threshold_covers_synthesis_window() {
        let config = AgentConfig::builder()
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(config.scan_threshold_chars <= config.synthesis_excerpt_chars);
    }

    #[test]
    fn test_builder_missing_credential_is_not_a_build_error() {
        let config = AgentConfig::builder()
            .provider("anthropic")
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert!(!config.credentials.contains(ProviderId::Anthropic));
    }

    #[test]
    fn test_builder_unknown_provider() {
        let result = AgentConfig::builder().provider("mistral").build();
        assert!(matches!(
            result,
            Err(AgentError::UnsupportedProvider { name }) if name == "mistral"
        ));
    }

    #[test]
    fn test_builder_rejects_zero_window() {
        let result = AgentConfig::builder().step_excerpt_chars(0).build();
        assert!(matches!(result, Err(AgentError::Config { .. })));
    }

    #[test]
    fn test_builder_custom_values() {
        let config = AgentConfig::builder()
            .provider("gemini")
            .model("gemini-1.5-pro")
            .api_key(ProviderId::Gemini, "g-key")
            .base_url(ProviderId::Gemini, "http://localhost:9000")
            .timeout(Duration::from_secs(30))
            .max_history_turns(2)
            .build()
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(config.provider, ProviderId::Gemini);
        assert_eq!(config.model.as_deref(), Some("gemini-1.5-pro"));
        assert_eq!(config.credentials.get(ProviderId::Gemini), Some("g-key"));
        assert_eq!(
            config.base_url(ProviderId::Gemini),
            Some("http://localhost:9000")
        );
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.is_verbose_provider());
    }

    #[test]
    fn test_credentials_ignore_blank_and_hide_keys() {
        let mut creds = Credentials::new();
        creds.insert(ProviderId::OpenAi, "  ");
        creds.insert(ProviderId::Anthropic, "sk-secret");
        assert!(!creds.contains(ProviderId::OpenAi));
        let debug = format!("{creds:?}");
        assert!(debug.contains("Anthropic"));
        assert!(!debug.contains("sk-secret"));
    }
}
