//! Planner agent.
//!
//! Turns the reader's question into a short ordered [`Plan`] of tool
//! steps. Planning never fails the pipeline: a failed call, unparseable
//! output or an empty step list all yield a single `analyze` step over
//! the whole question.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use super::config::AgentConfig;
use super::extract::extract;
use super::prompt::build_planner_prompt;
use super::tool::ToolKind;
use super::traits::{Agent, CallTarget};

/// Maximum number of steps a plan may hold.
pub const MAX_PLAN_STEPS: usize = 3;

/// One step of a plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanStep {
    /// Tool that performs the step.
    #[serde(default, alias = "toolType", alias = "type")]
    pub tool: ToolKind,
    /// What the step must establish.
    #[serde(default, alias = "description", alias = "task")]
    pub goal: String,
}

/// Ordered steps for the heavy path (1 to [`MAX_PLAN_STEPS`] long).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Steps in execution order.
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// The plan used when planning fails: one `analyze` step on the query.
    #[must_use]
    pub fn fallback(query: &str) -> Self {
        Self {
            steps: vec![PlanStep {
                tool: ToolKind::Analyze,
                goal: query.to_string(),
            }],
        }
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Returns `true` if the plan has no steps.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Agent that plans the analysis steps for a query.
pub struct PlannerAgent {
    max_tokens: u32,
    system_prompt: String,
}

impl PlannerAgent {
    /// Creates a new planner with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            max_tokens: config.planner_max_tokens,
            system_prompt,
        }
    }

    /// Plans the steps for `query`, falling back to [`Plan::fallback`] on failure.
    pub async fn plan(&self, target: &CallTarget<'_>, query: &str, excerpt: &str) -> Plan {
        match self.execute(target, &build_planner_prompt(query, excerpt)).await {
            Ok(response) => {
                let plan = Self::parse_plan(&response.content, query);
                info!(
                    steps = plan.len(),
                    tools = ?plan.steps.iter().map(|s| s.tool.as_str()).collect::<Vec<_>>(),
                    "plan ready"
                );
                plan
            }
            Err(e) => {
                warn!(error = %e, "planning failed, using single analyze step");
                Plan::fallback(query)
            }
        }
    }

    /// Parses planner output into a plan.
    ///
    /// Accepts `{"steps": [...]}` or a bare step array. Steps with an empty
    /// goal inherit the query; anything past [`MAX_PLAN_STEPS`] is dropped.
    fn parse_plan(content: &str, query: &str) -> Plan {
        let steps_value = match extract(content) {
            Ok(Value::Object(mut map)) => map.remove("steps").or_else(|| map.remove("plan")),
            Ok(array @ Value::Array(_)) => Some(array),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "plan output had no JSON payload");
                None
            }
        };

        let mut steps: Vec<PlanStep> = steps_value
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        if steps.is_empty() {
            warn!("plan was empty, using single analyze step");
            return Plan::fallback(query);
        }

        steps.truncate(MAX_PLAN_STEPS);
        for step in &mut steps {
            if step.goal.trim().is_empty() {
                step.goal = query.to_string();
            }
        }
        Plan { steps }
    }
}

#[async_trait]
impl Agent for PlannerAgent {
    fn name(&self) -> &'static str {
        "planner"
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn json_mode(&self) -> bool {
        true
    }

    fn temperature(&self) -> f32 {
        0.0
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
