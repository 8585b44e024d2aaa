//! Provider-agnostic message types for LLM communication.
//!
//! These types decouple the pipeline from any vendor wire format. Role
//! alternation rules are vendor-specific and are enforced by the adapters,
//! not by callers.

use serde::{Deserialize, Serialize};

/// Role of a chat message participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions.
    System,
    /// User input.
    User,
    /// Assistant response.
    Assistant,
}

/// A single chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender.
    pub role: Role,
    /// Message content.
    pub content: String,
}

/// Per-call sampling options.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SendOptions {
    /// Sampling temperature; `None` uses the vendor default.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Ask the vendor for JSON-formatted output where supported.
    pub json_mode: bool,
}

/// A chat completion request (provider-agnostic).
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Model identifier, already resolved against the model catalog.
    pub model: String,
    /// Ordered conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature (0.0–2.0).
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
    /// Request JSON-formatted output.
    pub json_mode: bool,
}

impl ChatRequest {
    /// Builds a request from a resolved model, messages and options.
    #[must_use]
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>, options: &SendOptions) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            json_mode: options.json_mode,
        }
    }
}

/// A chat completion response (provider-agnostic).
#[derive(Debug, Clone, Default)]
pub struct ChatResponse {
    /// Generated text content.
    pub content: String,
    /// Vendor usage statistics, passed through without interpretation.
    pub usage: Option<serde_json::Value>,
    /// Finish reason reported by the vendor, lowercased.
    pub finish_reason: Option<String>,
}

/// Creates a system message.
#[must_use]
pub fn system_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::System,
        content: content.to_string(),
    }
}

/// Creates a user message.
#[must_use]
pub fn user_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::User,
        content: content.to_string(),
    }
}

/// Creates an assistant message.
#[must_use]
pub fn assistant_message(content: &str) -> ChatMessage {
    ChatMessage {
        role: Role::Assistant,
        content: content.to_string(),
    }
}

/// Splits system messages out of a conversation.
///
/// Multiple system messages are joined with a blank line. Returns the
/// joined system text (if any) and the remaining turns in order.
#[must_use]
pub fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<ChatMessage>) {
    let system: Vec<&str> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();
    let turns = messages
        .iter()
        .filter(|m| m.role != Role::System)
        .cloned()
        .collect();
    let system = if system.is_empty() {
        None
    } else {
        Some(system.join("\n\n"))
    };
    (system, turns)
}

/// Reshapes non-system turns into a strictly alternating list that starts
/// with a user turn.
///
/// Leading assistant turns are dropped and consecutive turns from the same
/// role are merged with a blank line. A list made only of assistant turns
/// collapses into a single user turn so no content is lost.
#[must_use]
pub fn alternating_turns(turns: Vec<ChatMessage>) -> Vec<ChatMessage> {
    let first_user = turns.iter().position(|m| m.role == Role::User);
    let Some(first_user) = first_user else {
        let content: Vec<String> = turns.into_iter().map(|m| m.content).collect();
        return if content.is_empty() {
            Vec::new()
        } else {
            vec![user_message(&content.join("\n\n"))]
        };
    };

    let mut merged: Vec<ChatMessage> = Vec::with_capacity(turns.len() - first_user);
    for turn in turns.into_iter().skip(first_user) {
        match merged.last_mut() {
            Some(last) if last.role == turn.role => {
                last.content.push_str("\n\n");
                last.content.push_str(&turn.content);
            }
            _ => merged.push(turn),
        }
    }
    merged
}
