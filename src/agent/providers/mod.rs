//! LLM provider implementations.
//!
//! Each module contains a concrete [`LlmProvider`](super::provider::LlmProvider)
//! implementation for one vendor.

pub mod anthropic;
pub mod gemini;
pub mod openai;

use std::time::Duration;

use tracing::error;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use crate::core::ProviderId;
use crate::error::AgentError;

/// Builds the HTTP client shared by the reqwest-based adapters.
pub(crate) fn http_client(
    provider: ProviderId,
    timeout: Duration,
) -> Result<reqwest::Client, AgentError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AgentError::Config {
            message: format!("failed to build {provider} HTTP client: {e}"),
        })
}

/// Maps a transport error from `send()` to [`AgentError::Provider`].
pub(crate) fn transport_error(provider: ProviderId, e: &reqwest::Error) -> AgentError {
    error!(provider = %provider, error = %e, "request failed before a response arrived");
    AgentError::provider(provider, format!("network error: {e}"))
}

/// Converts a non-success response into [`AgentError::Provider`],
/// keeping the vendor's error body as detail.
pub(crate) async fn status_error(provider: ProviderId, response: reqwest::Response) -> AgentError {
    let status = response.status();
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "unknown error".to_string());
    error!(
        provider = %provider,
        status = %status,
        error = %body,
        "provider returned error status"
    );
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(serde_json::Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP {status}"));
    AgentError::Provider {
        provider,
        message: format!("API error ({status}): {message}"),
        vendor_detail: Some(body),
    }
}

/// Joins a base URL and a path without doubling the separator.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://x/v1/", "/messages"), "http://x/v1/messages");
        assert_eq!(join_url("http://x/v1", "messages"), "http://x/v1/messages");
    }
}
