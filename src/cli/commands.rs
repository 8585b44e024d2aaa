//! CLI command implementations.
//!
//! Each command returns its output as a string; the binary prints it.
//! Async pipeline calls are bridged through a per-command tokio runtime.

use std::io::Read;
use std::path::{Path, PathBuf};

use serde_json::json;
use tracing::{info, warn};

use crate::agent::config::AgentConfig;
use crate::agent::extract::extract;
use crate::agent::message::ChatMessage;
use crate::agent::orchestrator::{Orchestrator, QueryRequest};
use crate::agent::prompt::PromptSet;
use crate::agent::thought::{AgentThought, ThoughtStatus};
use crate::cli::output::{OutputFormat, format_answer, to_json};
use crate::cli::parser::{Cli, Commands};
use crate::core::document::annotate_paragraphs;
use crate::error::{CommandError, Result};
use crate::io::read_file;

/// Options for the `ask` command.
#[derive(Debug)]
pub struct AskParams<'a> {
    /// Document file.
    pub file: &'a Path,
    /// The question.
    pub query: &'a str,
    /// Anchored selection.
    pub selection: Option<&'a str>,
    /// Conversation history file.
    pub history: Option<&'a Path>,
    /// Insert paragraph markers before asking.
    pub annotate: bool,
}

/// Provider overrides shared by `ask` and `classify`.
#[derive(Debug, Default)]
pub struct ProviderParams<'a> {
    /// Provider name.
    pub provider: Option<&'a str>,
    /// Model id.
    pub model: Option<&'a str>,
    /// Prompt template directory.
    pub prompt_dir: Option<&'a Path>,
}

/// Executes the parsed CLI command.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::Ask {
            file,
            query,
            provider,
            model,
            selection,
            history,
            annotate,
            prompt_dir,
        } => {
            let params = AskParams {
                file,
                query,
                selection: selection.as_deref(),
                history: history.as_deref(),
                annotate: *annotate,
            };
            let provider = ProviderParams {
                provider: provider.as_deref(),
                model: model.as_deref(),
                prompt_dir: prompt_dir.as_deref(),
            };
            cmd_ask(&params, &provider, format)
        }
        Commands::Classify {
            query,
            provider,
            model,
            prompt_dir,
        } => {
            let provider = ProviderParams {
                provider: provider.as_deref(),
                model: model.as_deref(),
                prompt_dir: prompt_dir.as_deref(),
            };
            cmd_classify(query, &provider, format)
        }
        Commands::Extract { file } => cmd_extract(file.as_deref(), format),
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
    }
}

/// Builds agent configuration: CLI flags, then environment, then defaults.
fn build_config(params: &ProviderParams<'_>) -> Result<AgentConfig> {
    let mut builder = AgentConfig::builder();
    if let Some(provider) = params.provider {
        builder = builder.provider(provider);
    }
    if let Some(model) = params.model {
        builder = builder.model(model);
    }
    if let Some(dir) = params.prompt_dir {
        builder = builder.prompt_dir(dir);
    }
    Ok(builder.from_env().build()?)
}

fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

fn load_history(path: &Path) -> Result<Vec<ChatMessage>> {
    let text = read_file(path)?;
    serde_json::from_str(&text).map_err(|e| {
        CommandError::InvalidArgument(format!(
            "history file {} is not a JSON message list: {e}",
            path.display()
        ))
        .into()
    })
}

/// Logs one progress snapshot.
fn log_thought(thought: &AgentThought) {
    match thought.status {
        ThoughtStatus::Failed => warn!(
            id = %thought.id,
            tool = %thought.tool,
            reason = thought.result.as_deref().unwrap_or_default(),
            "{}",
            thought.message
        ),
        status => info!(
            id = %thought.id,
            tool = %thought.tool,
            status = ?status,
            result = thought.result.as_deref().unwrap_or_default(),
            "{}",
            thought.message
        ),
    }
}

fn cmd_ask(
    params: &AskParams<'_>,
    provider: &ProviderParams<'_>,
    format: OutputFormat,
) -> Result<String> {
    let mut document = read_file(params.file)?;
    if params.annotate {
        document = annotate_paragraphs(&document);
    }

    let mut request = QueryRequest::new(params.query, document);
    if let Some(path) = params.history {
        request = request.with_history(load_history(path)?);
    }
    if let Some(selection) = params.selection {
        request = request.with_selection(selection);
    }

    let config = build_config(provider)?;
    let orchestrator = Orchestrator::new(config)?;

    let rt = runtime()?;
    let answer = rt.block_on(orchestrator.classify_and_respond(&request, &log_thought))?;

    match format {
        OutputFormat::Text => Ok(format_answer(&answer)),
        OutputFormat::Json => to_json(&answer),
    }
}

fn cmd_classify(query: &str, provider: &ProviderParams<'_>, format: OutputFormat) -> Result<String> {
    let config = build_config(provider)?;
    let orchestrator = Orchestrator::new(config)?;

    let rt = runtime()?;
    let intent = rt.block_on(orchestrator.classify(query))?;

    match format {
        OutputFormat::Text => Ok(format!("{intent} ({})\n", intent.path())),
        OutputFormat::Json => to_json(&json!({
            "intent": intent,
            "path": intent.path(),
        })),
    }
}

fn cmd_extract(file: Option<&Path>, format: OutputFormat) -> Result<String> {
    let text = if let Some(path) = file {
        read_file(path)?
    } else {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    };

    let value = extract(&text)?;
    match format {
        OutputFormat::Text => to_json(&value),
        OutputFormat::Json => serde_json::to_string(&value)
            .map(|s| s + "\n")
            .map_err(|e| CommandError::OutputFormat(e.to_string()).into()),
    }
}

fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine home directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let names: Vec<&str> = written
                .iter()
                .filter_map(|p| p.file_name().and_then(|n| n.to_str()))
                .collect();
            Ok(format!(
                "Wrote {} prompt template(s) to: {}\n  {}\n\nEdit these files to customize the system prompts.\n",
                written.len(),
                target_dir.display(),
                names.join("\n  ")
            ))
        }
        OutputFormat::Json => to_json(&json!({
            "directory": target_dir,
            "written": written,
        })),
    }
}
