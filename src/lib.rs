//! # paper-qa
//!
//! Document question-answering core. A reader asks a question about a long
//! document; the question is classified into a fast single-call path or a
//! plan → execute → synthesize agent pipeline, run against one of several
//! interchangeable LLM backends, with live progress events.
//!
//! ## Example
//!
//! ```no_run
//! use paper_qa::agent::{AgentConfig, NoProgress, Orchestrator, QueryRequest};
//!
//! # async fn run() -> Result<(), paper_qa::Error> {
//! let config = AgentConfig::from_env()?;
//! let orchestrator = Orchestrator::new(config)?;
//! let request = QueryRequest::new("What are the hidden assumptions?", "...document text...");
//! let answer = orchestrator.classify_and_respond(&request, &NoProgress).await?;
//! println!("{}", answer.text);
//! # Ok(())
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`agent`]: provider adapters, router, responders, orchestrator
//! - [`core`]: intents, provider ids, document windowing
//! - [`cli`]: the `paper-qa` command-line interface
//! - [`io`]: document loading
//! - [`error`]: error types

pub mod agent;
pub mod cli;
pub mod core;
pub mod error;
pub mod io;

pub use error::{AgentError, CommandError, Error, Result};
