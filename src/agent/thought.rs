//! Progress events for one orchestration call.
//!
//! An [`AgentThought`] is created when a sub-task starts and re-emitted
//! with the same `id` when it finishes. Sinks receive immutable snapshots;
//! the latest snapshot for an id replaces earlier ones.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

/// Lifecycle state of a thought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThoughtStatus {
    /// Queued, not yet started.
    Pending,
    /// In progress.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
}

impl ThoughtStatus {
    /// Returns `true` for `Completed` and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// A snapshot of one sub-task's progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentThought {
    /// Stable identifier within one orchestration call.
    pub id: String,
    /// Tool label (e.g. `critique`, `synthesize`).
    pub tool: String,
    /// Current state.
    pub status: ThoughtStatus,
    /// Human-readable description.
    pub message: String,
    /// Short result label once finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Receives progress snapshots.
pub trait ProgressSink: Send + Sync {
    /// Called once per new or updated thought.
    fn emit(&self, thought: &AgentThought);
}

/// Sink that discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _thought: &AgentThought) {}
}

impl<F> ProgressSink for F
where
    F: Fn(&AgentThought) + Send + Sync,
{
    fn emit(&self, thought: &AgentThought) {
        self(thought);
    }
}

/// Sink that forwards snapshots over an unbounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelSink(pub UnboundedSender<AgentThought>);

impl From<UnboundedSender<AgentThought>> for ChannelSink {
    fn from(tx: UnboundedSender<AgentThought>) -> Self {
        Self(tx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, thought: &AgentThought) {
        // A dropped receiver means nobody is listening any more.
        if self.0.send(thought.clone()).is_err() {
            debug!(id = %thought.id, "progress receiver dropped");
        }
    }
}

/// Accumulates thoughts for one call and forwards every change to a sink.
///
/// Updates replace the stored snapshot with the same id, so the log
/// always holds the latest state of each thought in creation order.
pub struct ThoughtLog<'a> {
    sink: &'a dyn ProgressSink,
    thoughts: Vec<AgentThought>,
}

impl<'a> ThoughtLog<'a> {
    /// Creates an empty log that forwards to `sink`.
    #[must_use]
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            sink,
            thoughts: Vec::new(),
        }
    }

    /// Records a new running thought and returns its id.
    pub fn start(&mut self, id: impl Into<String>, tool: &str, message: impl Into<String>) -> String {
        let thought = AgentThought {
            id: id.into(),
            tool: tool.to_string(),
            status: ThoughtStatus::Running,
            message: message.into(),
            result: None,
        };
        let id = thought.id.clone();
        self.sink.emit(&thought);
        self.thoughts.push(thought);
        id
    }

    /// Marks the thought `id` as completed with a short result label.
    pub fn complete(&mut self, id: &str, result: impl Into<String>) {
        self.finish(id, ThoughtStatus::Completed, Some(result.into()));
    }

    /// Marks the thought `id` as failed.
    pub fn fail(&mut self, id: &str, reason: impl Into<String>) {
        self.finish(id, ThoughtStatus::Failed, Some(reason.into()));
    }

    /// Records a thought that is failed from the start.
    pub fn record_failure(&mut self, id: impl Into<String>, tool: &str, message: impl Into<String>) {
        let thought = AgentThought {
            id: id.into(),
            tool: tool.to_string(),
            status: ThoughtStatus::Failed,
            message: message.into(),
            result: None,
        };
        self.sink.emit(&thought);
        self.thoughts.push(thought);
    }

    fn finish(&mut self, id: &str, status: ThoughtStatus, result: Option<String>) {
        if let Some(thought) = self.thoughts.iter_mut().find(|t| t.id == id) {
            thought.status = status;
            thought.result = result;
            self.sink.emit(thought);
        }
    }

    /// Returns the accumulated snapshots.
    #[must_use]
    pub fn thoughts(&self) -> &[AgentThought] {
        &self.thoughts
    }

    /// Consumes the log, returning the accumulated snapshots.
    #[must_use]
    pub fn into_thoughts(self) -> Vec<AgentThought> {
        self.thoughts
    }
}

impl std::fmt::Debug for ThoughtLog<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThoughtLog")
            .field("thoughts", &self.thoughts)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[test]
    fn test_update_in_place_keeps_id() {
        let seen = Mutex::new(Vec::new());
        let sink = |t: &AgentThought| {
            if let Ok(mut v) = seen.lock() {
                v.push((t.id.clone(), t.status));
            }
        };
        let mut log = ThoughtLog::new(&sink);
        let id = log.start("step-1", "critique", "Critiquing the method");
        log.complete(&id, "3 weaknesses");

        assert_eq!(log.thoughts().len(), 1);
        assert_eq!(log.thoughts()[0].status, ThoughtStatus::Completed);
        assert_eq!(log.thoughts()[0].result.as_deref(), Some("3 weaknesses"));
        let events = seen.lock().map(|v| v.clone()).unwrap_or_default();
        assert_eq!(
            events,
            vec![
                ("step-1".to_string(), ThoughtStatus::Running),
                ("step-1".to_string(), ThoughtStatus::Completed),
            ]
        );
    }

    #[test]
    fn test_record_failure_and_unknown_id() {
        let mut log = ThoughtLog::new(&NoProgress);
        log.fail("missing", "ignored");
        assert!(log.thoughts().is_empty());
        log.record_failure("synthesize", "synthesize", "Synthesis failed");
        assert_eq!(log.thoughts()[0].status, ThoughtStatus::Failed);
        assert!(log.thoughts()[0].status.is_terminal());
    }

    #[tokio::test]
    async fn test_channel_sink() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        {
            let sink = ChannelSink::from(tx);
            let mut log = ThoughtLog::new(&sink);
            let id = log.start("step-1", "analyze", "Analyzing");
            log.fail(&id, "timeout");
        }
        let mut statuses = Vec::new();
        while let Some(t) = rx.recv().await {
            statuses.push(t.status);
        }
        assert_eq!(statuses, vec![ThoughtStatus::Running, ThoughtStatus::Failed]);
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&ThoughtStatus::Running).unwrap_or_default();
        assert_eq!(json, "\"running\"");
    }
}
