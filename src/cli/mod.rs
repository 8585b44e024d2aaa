//! CLI layer for paper-qa.
//!
//! Provides the command-line interface using clap, with commands for
//! asking and classifying questions, recovering JSON from model output
//! and scaffolding prompt templates.

pub mod commands;
pub mod output;
pub mod parser;

pub use commands::execute;
pub use output::OutputFormat;
pub use parser::{Cli, Commands};
