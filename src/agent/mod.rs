//! Question-answering pipeline over one document.
//!
//! Routes each question to a cheap single-call path or a multi-step
//! agent path, normalizing three vendor chat protocols behind one
//! provider trait.
//!
//! # Architecture
//!
//! ```text
//! QueryRequest → Orchestrator
//!   ├── IntentRouter (cheap model, one call)
//!   ├── fast: FastPathResponder → answer
//!   └── heavy: PlannerAgent → ToolAgent × (1..=3) → [ScanAgent] → SynthesizerAgent → answer
//!                 every step reported as an AgentThought
//! ProviderHub → OpenAI | Anthropic | Gemini
//! ```

pub mod client;
pub mod config;
pub mod extract;
pub mod message;
pub mod models;
pub mod orchestrator;
pub mod planner;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod responder;
pub mod router;
pub mod scanner;
pub mod synthesizer;
pub mod thought;
pub mod tool;
pub mod traits;

// Re-export key types
pub use client::{ProviderHub, create_provider};
pub use config::{AgentConfig, Credentials};
pub use extract::{extract, extract_as};
pub use message::{ChatMessage, ChatRequest, ChatResponse, Role, SendOptions};
pub use models::{ModelCatalog, ModelPolicy, ModelTarget, ProviderModels};
pub use orchestrator::{
    Answer, HEAVY_PATH_FALLBACK, Orchestrator, PipelineState, QueryRequest,
};
pub use planner::{MAX_PLAN_STEPS, Plan, PlanStep, PlannerAgent};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use responder::{FAST_PATH_FALLBACK, FastPathResponder};
pub use router::IntentRouter;
pub use scanner::{ScanAgent, ScanOutcome};
pub use synthesizer::{ResponseShape, SynthesizerAgent};
pub use thought::{AgentThought, ChannelSink, NoProgress, ProgressSink, ThoughtStatus};
pub use tool::{ToolAgent, ToolKind};
pub use traits::{Agent, AgentResponse, CallTarget};
