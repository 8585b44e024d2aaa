//! Core value types shared by the agent pipeline and the CLI.

pub mod document;
pub mod intent;
pub mod provider;

pub use intent::{Intent, ResponsePath};
pub use provider::ProviderId;
