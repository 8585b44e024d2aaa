//! Query orchestrator.
//!
//! Coordinates the full pipeline for one question: classify → either a
//! single fast-path call, or plan → sequential tool steps → (scan) →
//! synthesize, reporting progress as it goes.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::client::ProviderHub;
use super::config::AgentConfig;
use super::message::ChatMessage;
use super::planner::PlannerAgent;
use super::prompt::PromptSet;
use super::responder::{FAST_PATH_FALLBACK, FastPathResponder, recent_turns};
use super::router::IntentRouter;
use super::scanner::{NOT_FOUND, ScanAgent, ScanOutcome};
use super::synthesizer::{ResponseShape, SynthesizerAgent};
use super::thought::{AgentThought, ProgressSink, ThoughtLog};
use super::tool::ToolAgent;
use super::traits::CallTarget;
use crate::core::document::{bounded_prefix, exceeds};
use crate::core::{Intent, ResponsePath};
use crate::error::AgentError;

/// Answer returned when the heavy path fails.
pub const HEAVY_PATH_FALLBACK: &str = "I wasn't able to finish analyzing the document for this question. \
     Please try again, or ask a narrower question.";

/// Id and tool label of the thought emitted when synthesis fails.
const SYNTHESIZE_THOUGHT: &str = "synthesize";

/// Longest query accepted, in bytes.
const MAX_QUERY_LEN: usize = 10_000;

/// Grapheme budget for the result label shown on a completed step.
const RESULT_LABEL_CHARS: usize = 80;

/// One question about one document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// The reader's question.
    pub query: String,
    /// Full document text.
    pub document: String,
    /// Earlier conversation turns, oldest first.
    #[serde(default)]
    pub history: Vec<ChatMessage>,
    /// Text the reader anchored the question to, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection: Option<String>,
}

impl QueryRequest {
    /// Creates a request with no history and no selection.
    #[must_use]
    pub fn new(query: impl Into<String>, document: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            document: document.into(),
            history: Vec::new(),
            selection: None,
        }
    }

    /// Sets the conversation history.
    #[must_use]
    pub fn with_history(mut self, history: Vec<ChatMessage>) -> Self {
        self.history = history;
        self
    }

    /// Anchors the question to a selection.
    #[must_use]
    pub fn with_selection(mut self, selection: impl Into<String>) -> Self {
        self.selection = Some(selection.into());
        self
    }

    /// The selection, ignoring blank ones.
    #[must_use]
    pub fn anchored_selection(&self) -> Option<&str> {
        self.selection.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Where an invocation is (or ended) in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum PipelineState {
    /// Building the plan.
    Planning,
    /// Running plan step `step` of `total` (1-based).
    Executing {
        /// Current step.
        step: usize,
        /// Plan length.
        total: usize,
    },
    /// Writing the final answer.
    Synthesizing,
    /// Finished with a model-produced answer.
    Done,
    /// Finished with a fallback answer.
    Failed,
}

/// Result of one orchestration call.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    /// Answer text (a fallback text when `state` is `Failed`).
    pub text: String,
    /// Routed intent.
    pub intent: Intent,
    /// Path the intent was handled on.
    pub path: ResponsePath,
    /// Final pipeline state.
    pub state: PipelineState,
    /// Latest snapshot of every thought, in creation order.
    pub thoughts: Vec<AgentThought>,
    /// Plan steps attempted (completed or failed).
    pub steps_executed: usize,
    /// Whether a scan pass selected the synthesis context.
    pub scanned: bool,
    /// Total elapsed time.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

impl Answer {
    /// Returns `true` if the answer is a fallback text.
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.state == PipelineState::Failed
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_duration<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}

/// How a fast- or heavy-path run ended.
struct PathOutcome {
    text: String,
    state: PipelineState,
    steps_executed: usize,
    scanned: bool,
}

/// Document text the heavy path works from.
struct WorkingContext {
    /// Context handed to the synthesizer.
    synthesis: String,
    /// Bounded excerpt handed to the planner and every step.
    steps: String,
    /// Whether a scan produced the context.
    scanned: bool,
}

impl PathOutcome {
    fn failed(steps_executed: usize, scanned: bool) -> Self {
        Self {
            text: HEAVY_PATH_FALLBACK.to_string(),
            state: PipelineState::Failed,
            steps_executed,
            scanned,
        }
    }
}

/// Orchestrates question answering over one document.
///
/// Holds only read-only state, so one instance can serve concurrent
/// invocations.
pub struct Orchestrator {
    hub: ProviderHub,
    config: AgentConfig,
    router: IntentRouter,
    responder: FastPathResponder,
    planner: PlannerAgent,
    scanner: ScanAgent,
    synthesizer: SynthesizerAgent,
}

impl Orchestrator {
    /// Creates an orchestrator with adapters for every configured credential.
    ///
    /// Loads prompt templates from [`AgentConfig::prompt_dir`], falling
    /// back to compiled-in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::Config`] if an adapter cannot be constructed.
    pub fn new(config: AgentConfig) -> Result<Self, AgentError> {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        let hub = ProviderHub::from_config(&config)?;
        Ok(Self::with_hub(config, hub, &prompts))
    }

    /// Creates an orchestrator over an existing hub and prompt set.
    #[must_use]
    pub fn with_hub(config: AgentConfig, hub: ProviderHub, prompts: &PromptSet) -> Self {
        Self {
            router: IntentRouter::new(&config, prompts.router.clone()),
            responder: FastPathResponder::new(&config, prompts),
            planner: PlannerAgent::new(&config, prompts.planner.clone()),
            scanner: ScanAgent::new(&config, prompts.scan.clone()),
            synthesizer: SynthesizerAgent::new(&config, prompts.synthesizer.clone()),
            hub,
            config,
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }

    fn target(&self) -> CallTarget<'_> {
        CallTarget {
            hub: &self.hub,
            provider: self.config.provider,
            model: self.config.model.as_deref(),
        }
    }

    /// Classifies `query` without answering it.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidQuery`] for an empty or oversized
    /// query and [`AgentError::MissingCredential`] when the active
    /// provider has no credential. Classification itself never fails.
    pub async fn classify(&self, query: &str) -> Result<Intent, AgentError> {
        validate_query(query)?;
        self.hub.ensure_credential(self.config.provider)?;
        Ok(self.router.classify(&self.target(), query).await)
    }

    /// Answers one question.
    ///
    /// Provider failures never escape: the fast path answers
    /// [`FAST_PATH_FALLBACK`] and the heavy path [`HEAVY_PATH_FALLBACK`],
    /// with `state` set to [`PipelineState::Failed`].
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvalidQuery`] for an empty or oversized
    /// query and [`AgentError::MissingCredential`] before any provider
    /// call when the active provider has no credential.
    pub async fn classify_and_respond(
        &self,
        request: &QueryRequest,
        progress: &dyn ProgressSink,
    ) -> Result<Answer, AgentError> {
        let start = Instant::now();
        validate_query(&request.query)?;
        self.hub.ensure_credential(self.config.provider)?;

        let target = self.target();
        let intent = self.router.classify(&target, &request.query).await;
        let path = intent.path();
        let mut log = ThoughtLog::new(progress);

        let run = match path {
            ResponsePath::Fast => self.run_fast(&target, intent, request).await,
            ResponsePath::Heavy => self.run_heavy(&target, intent, request, &mut log).await,
        };

        info!(
            intent = %intent,
            state = ?run.state,
            steps = run.steps_executed,
            scanned = run.scanned,
            elapsed_ms = start.elapsed().as_millis(),
            "query answered"
        );

        Ok(Answer {
            text: run.text,
            intent,
            path,
            state: run.state,
            thoughts: log.into_thoughts(),
            steps_executed: run.steps_executed,
            scanned: run.scanned,
            elapsed: start.elapsed(),
        })
    }

    async fn run_fast(
        &self,
        target: &CallTarget<'_>,
        intent: Intent,
        request: &QueryRequest,
    ) -> PathOutcome {
        let source = request.anchored_selection().unwrap_or(&request.document);
        match self
            .responder
            .respond(target, intent, &request.query, source, &request.history)
            .await
        {
            Ok(text) => PathOutcome {
                text,
                state: PipelineState::Done,
                steps_executed: 0,
                scanned: false,
            },
            Err(e) => {
                error!(error = %e, intent = %intent, "fast path failed");
                PathOutcome {
                    text: FAST_PATH_FALLBACK.to_string(),
                    state: PipelineState::Failed,
                    steps_executed: 0,
                    scanned: false,
                }
            }
        }
    }

    async fn run_heavy(
        &self,
        target: &CallTarget<'_>,
        intent: Intent,
        request: &QueryRequest,
        log: &mut ThoughtLog<'_>,
    ) -> PathOutcome {
        let query = request.query.as_str();

        let mut state = PipelineState::Planning;
        debug!(state = ?state, "pipeline transition");
        let context = self.working_context(target, request).await;
        let excerpt = context.steps.as_str();
        let plan = self.planner.plan(target, query, excerpt).await;

        let total = plan.len();
        let mut results: Vec<String> = Vec::with_capacity(total);
        for (i, step) in plan.steps.iter().enumerate() {
            state = PipelineState::Executing { step: i + 1, total };
            debug!(state = ?state, tool = %step.tool, "pipeline transition");

            let id = log.start(
                format!("step-{}", i + 1),
                step.tool.as_str(),
                step.tool.progress_message(&step.goal),
            );
            let agent = ToolAgent::new(step.tool, self.config.step_max_tokens);
            match agent.run(target, &step.goal, excerpt, &results).await {
                Ok(result) => {
                    log.complete(&id, result_label(&result));
                    results.push(result);
                }
                Err(e) => {
                    error!(error = %e, step = i + 1, total, "plan step failed");
                    log.fail(&id, e.to_string());
                    return PathOutcome::failed(i + 1, context.scanned);
                }
            }
        }

        state = PipelineState::Synthesizing;
        debug!(state = ?state, "pipeline transition");
        let shape = ResponseShape::detect(query, intent);
        let history = recent_turns(&request.history, self.config.max_history_turns);

        match self
            .synthesizer
            .synthesize(target, query, &context.synthesis, &results, shape, history)
            .await
        {
            Ok(text) => PathOutcome {
                text,
                state: PipelineState::Done,
                steps_executed: total,
                scanned: context.scanned,
            },
            Err(e) => {
                error!(error = %e, "synthesis failed");
                log.record_failure(
                    SYNTHESIZE_THOUGHT,
                    SYNTHESIZE_THOUGHT,
                    format!("Synthesis failed: {e}"),
                );
                PathOutcome::failed(total, context.scanned)
            }
        }
    }

    /// Chooses the document text the heavy path works from.
    ///
    /// An anchored selection is used as-is. A document longer than the
    /// synthesis window (or `scan_threshold_chars`, when smaller) is scanned
    /// when the provider has a cheap model, and the scanned passages feed
    /// both the steps and the synthesizer. Otherwise, or when the scan fails
    /// or finds nothing, bounded prefixes of the document are used.
    async fn working_context(
        &self,
        target: &CallTarget<'_>,
        request: &QueryRequest,
    ) -> WorkingContext {
        let step_chars = self.config.step_excerpt_chars;
        if let Some(selection) = request.anchored_selection() {
            return WorkingContext {
                synthesis: selection.to_string(),
                steps: bounded_prefix(selection, step_chars).to_string(),
                scanned: false,
            };
        }

        let document = request.document.as_str();
        let prefix = || WorkingContext {
            synthesis: bounded_prefix(document, self.config.synthesis_excerpt_chars).to_string(),
            steps: bounded_prefix(document, step_chars).to_string(),
            scanned: false,
        };

        let threshold = self
            .config
            .scan_threshold_chars
            .min(self.config.synthesis_excerpt_chars);
        if !self.hub.catalog().has_cheap(target.provider) || !exceeds(document, threshold) {
            return prefix();
        }

        match self.scanner.scan(target, &request.query, document).await {
            Ok(ScanOutcome::NotFound) => WorkingContext {
                synthesis: NOT_FOUND.to_string(),
                steps: bounded_prefix(document, step_chars).to_string(),
                scanned: true,
            },
            Ok(outcome) => {
                let synthesis = outcome.into_context(document, self.config.all_relevant_chars);
                let steps = bounded_prefix(&synthesis, step_chars).to_string();
                WorkingContext {
                    synthesis,
                    steps,
                    scanned: true,
                }
            }
            Err(e) => {
                warn!(error = %e, "scan failed, using document prefix");
                prefix()
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("hub", &self.hub)
            .field("provider", &self.config.provider)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

fn validate_query(query: &str) -> Result<(), AgentError> {
    if query.trim().is_empty() {
        return Err(AgentError::InvalidQuery {
            message: "query cannot be empty".to_string(),
        });
    }
    if query.len() > MAX_QUERY_LEN {
        return Err(AgentError::InvalidQuery {
            message: format!(
                "query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                query.len()
            ),
        });
    }
    Ok(())
}

/// Short label for a completed step: the first line of its result.
fn result_label(result: &str) -> String {
    let first = result.lines().map(str::trim).find(|l| !l.is_empty()).unwrap_or_default();
    let label = bounded_prefix(first, RESULT_LABEL_CHARS);
    if label.len() < first.len() {
        format!("{label}…")
    } else {
        label.to_string()
    }
}
