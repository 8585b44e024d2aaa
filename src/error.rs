//! Error types for paper-qa.
//!
//! [`AgentError`] covers the orchestration core; [`CommandError`] covers
//! the CLI layer. [`Error`] unifies both for the binary.

use thiserror::Error as ThisError;

use crate::core::ProviderId;

/// Result alias used by the CLI layer.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error.
#[derive(Debug, ThisError)]
pub enum Error {
    /// Failure inside the orchestration core.
    #[error(transparent)]
    Agent(#[from] AgentError),

    /// Failure in a CLI command.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// I/O failure (reading documents, writing prompt templates).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the orchestration core.
#[derive(Debug, ThisError)]
pub enum AgentError {
    /// No credential is registered for the addressed provider.
    ///
    /// Never retried; the caller should prompt for configuration.
    #[error("no credential configured for provider '{provider}'")]
    MissingCredential {
        /// Provider that was addressed.
        provider: ProviderId,
    },

    /// The vendor call failed or returned a shape that could not be normalized.
    #[error("{provider} request failed: {message}")]
    Provider {
        /// Provider that failed.
        provider: ProviderId,
        /// Human-readable failure description.
        message: String,
        /// Raw vendor error payload, when one was returned.
        vendor_detail: Option<String>,
    },

    /// The vendor refused to produce content (safety block or empty candidates).
    #[error("{provider} blocked the response: {reason}")]
    ContentBlocked {
        /// Provider that blocked the response.
        provider: ProviderId,
        /// Vendor block reason (e.g. `SAFETY`).
        reason: String,
    },

    /// The model id does not follow the provider's naming convention and
    /// substitution is disabled.
    #[error("model '{model}' is not a valid {provider} model")]
    InvalidModel {
        /// Provider the model was requested for.
        provider: ProviderId,
        /// Rejected model id.
        model: String,
    },

    /// No structured payload could be recovered from model output.
    #[error("structured data extraction failed: {message}")]
    Extraction {
        /// Why extraction failed.
        message: String,
        /// The text extraction was attempted on.
        content: String,
    },

    /// Unknown provider name in configuration.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Name that failed to parse.
        name: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {message}")]
    Config {
        /// What was wrong.
        message: String,
    },

    /// Rejected query input.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// What was wrong.
        message: String,
    },
}

impl AgentError {
    /// Builds a [`AgentError::Provider`] without vendor detail.
    pub(crate) fn provider(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::Provider {
            provider,
            message: message.into(),
            vendor_detail: None,
        }
    }

    /// Returns the provider this error is attributed to, if any.
    #[must_use]
    pub const fn provider_id(&self) -> Option<ProviderId> {
        match self {
            Self::MissingCredential { provider }
            | Self::Provider { provider, .. }
            | Self::ContentBlocked { provider, .. }
            | Self::InvalidModel { provider, .. } => Some(*provider),
            _ => None,
        }
    }
}

/// Errors raised by CLI commands.
#[derive(Debug, ThisError)]
pub enum CommandError {
    /// A command argument was invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A command failed while executing.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be formatted.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),
}
