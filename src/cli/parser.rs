//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// paper-qa: ask questions about a long document.
///
/// Routes each question to a quick single-call answer or a multi-step
/// analysis (plan, tool steps, synthesis) against OpenAI, Anthropic or
/// Gemini.
#[derive(Parser, Debug)]
#[command(name = "paper-qa")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose (debug) logging on stderr.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a question about a document.
    ///
    /// The question is classified first. Chat, compact explanations and
    /// three-line summaries get one quick call; everything else runs the
    /// plan/execute/synthesize pipeline, logging each step as it runs.
    #[command(after_help = r#"Examples:
  paper-qa ask paper.txt "Summarize this in 3 lines"
  paper-qa ask paper.txt "What are the hidden assumptions?" --provider anthropic
  paper-qa ask paper.txt "Explain this table" --selection "Table 2: ..."
  paper-qa ask paper.txt "Make an Obsidian note" --annotate --format json
  OPENAI_API_KEY=sk-... paper-qa -v ask paper.txt "Critique the method"
"#)]
    Ask {
        /// Document file (UTF-8 text).
        file: PathBuf,

        /// The question.
        query: String,

        /// LLM provider (openai, anthropic, gemini).
        #[arg(short, long)]
        provider: Option<String>,

        /// Model id for the provider.
        #[arg(short, long)]
        model: Option<String>,

        /// Anchor the question to this passage instead of the whole document.
        #[arg(short, long)]
        selection: Option<String>,

        /// JSON file with earlier turns: `[{"role": "user", "content": "..."}]`.
        #[arg(long)]
        history: Option<PathBuf>,

        /// Prefix each paragraph with a `[P<n>]` marker before asking.
        #[arg(long)]
        annotate: bool,

        /// Directory containing custom prompt templates.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// Classify a question without answering it.
    ///
    /// Prints the routed intent and whether it is handled on the fast
    /// or heavy path.
    Classify {
        /// The question.
        query: String,

        /// LLM provider (openai, anthropic, gemini).
        #[arg(short, long)]
        provider: Option<String>,

        /// Model id for the provider.
        #[arg(short, long)]
        model: Option<String>,

        /// Directory containing custom prompt templates.
        #[arg(long)]
        prompt_dir: Option<PathBuf>,
    },

    /// Recover a JSON payload from free-form model output.
    ///
    /// Reads the file, or stdin when no file is given.
    #[command(after_help = r#"Examples:
  paper-qa extract reply.txt
  echo 'Sure! ```json {"a": 1} ```' | paper-qa extract
"#)]
    Extract {
        /// Input file (defaults to stdin).
        file: Option<PathBuf>,
    },

    /// Write default prompt templates to a directory.
    ///
    /// Existing files are never overwritten.
    #[command(after_help = r#"Examples:
  paper-qa init-prompts                       # ~/.config/paper-qa/prompts
  paper-qa init-prompts --dir ./my-prompts
"#)]
    InitPrompts {
        /// Target directory.
        #[arg(short, long)]
        dir: Option<PathBuf>,
    },
}
