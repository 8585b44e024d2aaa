//! Pluggable LLM provider trait.
//!
//! Implementations translate the provider-agnostic [`ChatRequest`] and
//! [`ChatResponse`] into one vendor's wire format. New vendors are added
//! by implementing this trait, not by branching existing call sites.

use async_trait::async_trait;

use super::message::{ChatRequest, ChatResponse};
use crate::core::ProviderId;
use crate::error::AgentError;

/// Trait for LLM provider backends.
///
/// Each call is a single outbound request. Implementations must not retry;
/// retry policy belongs to the caller.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Which vendor this adapter speaks to.
    fn id(&self) -> ProviderId;

    /// Executes a chat completion request.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Provider`] on transport failures or responses
    /// that cannot be normalized, and [`AgentError::ContentBlocked`] when
    /// the vendor refuses to produce content.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError>;
}
