//! End-to-end pipeline tests against a scripted in-memory provider.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use paper_qa::agent::message::{Role, assistant_message, user_message};
use paper_qa::agent::{
    AgentConfig, AgentThought, ChatRequest, ChatResponse, FAST_PATH_FALLBACK,
    HEAVY_PATH_FALLBACK, LlmProvider, ModelCatalog, ModelPolicy, NoProgress, Orchestrator,
    PipelineState, PromptSet, ProviderHub, ProviderModels, QueryRequest, ThoughtStatus, ToolKind,
};
use paper_qa::core::{Intent, ProviderId, ResponsePath};
use paper_qa::error::AgentError;

/// Which pipeline stage issued a request, recognized by its system prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Router,
    Fast,
    Planner,
    Step,
    Scan,
    Synthesize,
}

type Reply = dyn Fn(Stage, usize, &ChatRequest) -> Result<String, AgentError> + Send + Sync;

struct ScriptedProvider {
    id: ProviderId,
    prompts: PromptSet,
    calls: Mutex<Vec<(Stage, ChatRequest)>>,
    reply: Box<Reply>,
}

impl ScriptedProvider {
    fn new(
        id: ProviderId,
        reply: impl Fn(Stage, usize, &ChatRequest) -> Result<String, AgentError>
        + Send
        + Sync
        + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            prompts: PromptSet::defaults(),
            calls: Mutex::new(Vec::new()),
            reply: Box::new(reply),
        })
    }

    fn stage(&self, request: &ChatRequest) -> Stage {
        let system = request
            .messages
            .first()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        if system == self.prompts.router {
            Stage::Router
        } else if system == self.prompts.planner {
            Stage::Planner
        } else if system == self.prompts.scan {
            Stage::Scan
        } else if system == self.prompts.synthesizer {
            Stage::Synthesize
        } else if ToolKind::ALL.iter().any(|k| k.directive() == system) {
            Stage::Step
        } else {
            Stage::Fast
        }
    }

    fn calls(&self) -> Vec<(Stage, ChatRequest)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn calls_for(&self, stage: Stage) -> Vec<ChatRequest> {
        self.calls()
            .into_iter()
            .filter(|(s, _)| *s == stage)
            .map(|(_, r)| r)
            .collect()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        self.id
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let stage = self.stage(request);
        let seen = {
            let mut calls = self.calls.lock().unwrap_or_else(|_| unreachable!());
            let seen = calls.iter().filter(|(s, _)| *s == stage).count();
            calls.push((stage, request.clone()));
            seen
        };
        (self.reply)(stage, seen, request).map(|content| ChatResponse {
            content,
            finish_reason: Some("stop".to_string()),
            ..ChatResponse::default()
        })
    }
}

fn provider_error(provider: ProviderId, message: &str) -> AgentError {
    AgentError::Provider {
        provider,
        message: message.to_string(),
        vendor_detail: None,
    }
}

fn last_user_message(request: &ChatRequest) -> &str {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .unwrap_or_default()
}

fn orchestrator_for(config: AgentConfig, provider: &Arc<ScriptedProvider>) -> Orchestrator {
    let hub = ProviderHub::new(config.catalog.clone(), config.model_policy)
        .register(Arc::clone(provider) as Arc<dyn LlmProvider>);
    Orchestrator::with_hub(config, hub, &PromptSet::defaults())
}

fn openai_config() -> AgentConfig {
    AgentConfig::builder()
        .provider("openai")
        .build()
        .unwrap_or_else(|_| unreachable!())
}

/// Replies for a routed heavy-path run with the given plan and canned steps.
fn heavy_script(
    intent: &'static str,
    plan: &'static str,
) -> impl Fn(Stage, usize, &ChatRequest) -> Result<String, AgentError> + Send + Sync + 'static {
    move |stage, n, _| {
        Ok(match stage {
            Stage::Router => format!(r#"{{"intent": "{intent}"}}"#),
            Stage::Planner => plan.to_string(),
            Stage::Step => format!("finding {}", n + 1),
            Stage::Scan => "ALL_RELEVANT".to_string(),
            Stage::Synthesize => "Final synthesized answer.".to_string(),
            Stage::Fast => "fast answer".to_string(),
        })
    }
}

struct EventLog(Mutex<Vec<AgentThought>>);

impl EventLog {
    fn new() -> Self {
        Self(Mutex::new(Vec::new()))
    }

    fn sink(&self) -> impl Fn(&AgentThought) + Send + Sync + '_ {
        |t: &AgentThought| {
            if let Ok(mut v) = self.0.lock() {
                v.push(t.clone());
            }
        }
    }

    fn statuses(&self) -> Vec<(String, ThoughtStatus)> {
        self.0
            .lock()
            .map(|v| v.iter().map(|t| (t.id.clone(), t.status)).collect())
            .unwrap_or_default()
    }
}

#[tokio::test]
async fn test_summary_3lines_fast_path() {
    let provider = ScriptedProvider::new(ProviderId::OpenAi, |stage, _, _| {
        Ok(match stage {
            Stage::Router => r#"{"intent": "summary_3lines"}"#.to_string(),
            _ => "Here is the summary:\n- Proposes X.\n- Tests on Y.\n- Finds Z.\n- Extra.".to_string(),
        })
    });
    let orchestrator = orchestrator_for(openai_config(), &provider);

    let request = QueryRequest::new("Summarize this in 3 lines", "A long paper about X.");
    let answer = orchestrator
        .classify_and_respond(&request, &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(answer.intent, Intent::Summary3Lines);
    assert_eq!(answer.path, ResponsePath::Fast);
    assert_eq!(answer.state, PipelineState::Done);
    let lines: Vec<&str> = answer.text.lines().collect();
    assert_eq!(lines, vec!["- Proposes X.", "- Tests on Y.", "- Finds Z."]);
    assert!(provider.calls_for(Stage::Planner).is_empty());
    assert!(answer.thoughts.is_empty());
    assert_eq!(provider.calls().len(), 2);
}

#[tokio::test]
async fn test_deep_analysis_two_step_plan() {
    let provider = ScriptedProvider::new(
        ProviderId::OpenAi,
        heavy_script(
            "deep_analysis",
            r#"{"steps": [{"tool": "extract_data", "goal": "find the sample size"},
                          {"tool": "critique", "goal": "assess the sample size"}]}"#,
        ),
    );
    let orchestrator = orchestrator_for(openai_config(), &provider);
    let events = EventLog::new();
    let sink = events.sink();

    let request = QueryRequest::new("What are the hidden assumptions?", "Short paper.");
    let answer = orchestrator
        .classify_and_respond(&request, &sink)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(answer.intent, Intent::DeepAnalysis);
    assert_eq!(answer.path, ResponsePath::Heavy);
    assert_eq!(answer.state, PipelineState::Done);
    assert_eq!(answer.text, "Final synthesized answer.");
    assert_eq!(answer.steps_executed, 2);
    assert_eq!(
        events.statuses(),
        vec![
            ("step-1".to_string(), ThoughtStatus::Running),
            ("step-1".to_string(), ThoughtStatus::Completed),
            ("step-2".to_string(), ThoughtStatus::Running),
            ("step-2".to_string(), ThoughtStatus::Completed),
        ]
    );
    assert_eq!(answer.thoughts.len(), 2);
    assert_eq!(answer.thoughts[0].tool, "extract_data");
    assert_eq!(answer.thoughts[1].result.as_deref(), Some("[CRITIQUE] finding 2"));

    let synth = provider.calls_for(Stage::Synthesize);
    assert_eq!(synth.len(), 1);
    let synth_prompt = last_user_message(&synth[0]);
    assert!(synth_prompt.contains("[DATA] finding 1"));
    assert!(synth_prompt.contains("[CRITIQUE] finding 2"));

    // The second step sees the first step's result.
    let steps = provider.calls_for(Stage::Step);
    assert!(last_user_message(&steps[1]).contains("[DATA] finding 1"));
    assert!(!last_user_message(&steps[0]).contains("<previous_steps>"));
}

#[tokio::test]
async fn test_step_failure_stops_pipeline() {
    let provider = ScriptedProvider::new(ProviderId::OpenAi, |stage, _, _| match stage {
        Stage::Router => Ok(r#"{"intent": "deep_analysis"}"#.to_string()),
        Stage::Planner => Ok(
            r#"{"steps": [{"tool": "analyze", "goal": "a"}, {"tool": "critique", "goal": "b"}]}"#
                .to_string(),
        ),
        Stage::Step => Err(provider_error(ProviderId::OpenAi, "HTTP 500")),
        _ => Ok("unused".to_string()),
    });
    let orchestrator = orchestrator_for(openai_config(), &provider);

    let request = QueryRequest::new("Critique the method", "Paper text.");
    let answer = orchestrator
        .classify_and_respond(&request, &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(answer.state, PipelineState::Failed);
    assert_eq!(answer.text, HEAVY_PATH_FALLBACK);
    assert!(answer.is_fallback());
    assert_eq!(answer.steps_executed, 1);
    assert_eq!(provider.calls_for(Stage::Step).len(), 1);
    assert!(provider.calls_for(Stage::Synthesize).is_empty());
    assert_eq!(answer.thoughts.len(), 1);
    assert_eq!(answer.thoughts[0].status, ThoughtStatus::Failed);
}

#[tokio::test]
async fn test_missing_credential_before_any_call() {
    // Only a Gemini adapter is registered; the active provider is OpenAI.
    let provider = ScriptedProvider::new(ProviderId::Gemini, heavy_script("chat", "{}"));
    let orchestrator = orchestrator_for(openai_config(), &provider);

    let request = QueryRequest::new("Hello?", "Paper text.");
    let err = orchestrator
        .classify_and_respond(&request, &NoProgress)
        .await
        .err();

    assert!(matches!(
        err,
        Some(AgentError::MissingCredential {
            provider: ProviderId::OpenAi
        })
    ));
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_empty_plan_runs_single_analyze_step() {
    let provider =
        ScriptedProvider::new(ProviderId::OpenAi, heavy_script("deep_analysis", r#"{"steps": []}"#));
    let orchestrator = orchestrator_for(openai_config(), &provider);

    let request = QueryRequest::new("What is the contribution?", "Paper text.");
    let answer = orchestrator
        .classify_and_respond(&request, &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    let steps = provider.calls_for(Stage::Step);
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].messages[0].content, ToolKind::Analyze.directive());
    assert!(last_user_message(&steps[0]).contains("<goal>What is the contribution?</goal>"));
    assert_eq!(answer.steps_executed, 1);
    assert_eq!(answer.thoughts[0].tool, "analyze");

    // The single step precedes synthesis.
    let order: Vec<Stage> = provider.calls().into_iter().map(|(s, _)| s).collect();
    assert_eq!(
        order,
        vec![Stage::Router, Stage::Planner, Stage::Step, Stage::Synthesize]
    );
}

#[tokio::test]
async fn test_plan_is_capped_and_thought_ids_unique() {
    let provider = ScriptedProvider::new(
        ProviderId::OpenAi,
        heavy_script(
            "deep_analysis",
            r#"[{"tool":"contextualize","goal":"1"},{"tool":"hypothesize","goal":"2"},
                {"tool":"simulate_author","goal":"3"},{"tool":"critique","goal":"4"}]"#,
        ),
    );
    let orchestrator = orchestrator_for(openai_config(), &provider);

    let answer = orchestrator
        .classify_and_respond(&QueryRequest::new("Go deep", "Paper."), &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(answer.steps_executed, 3);
    let terminal = answer
        .thoughts
        .iter()
        .filter(|t| t.status.is_terminal())
        .count();
    assert_eq!(terminal, answer.steps_executed);
    let mut ids: Vec<&str> = answer.thoughts.iter().map(|t| t.id.as_str()).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), answer.thoughts.len());
}

#[tokio::test]
async fn test_router_failure_defaults_to_deep_analysis() {
    let provider = ScriptedProvider::new(ProviderId::OpenAi, |stage, _, _| match stage {
        Stage::Router => Err(provider_error(ProviderId::OpenAi, "timeout")),
        Stage::Planner => Ok("not json at all".to_string()),
        _ => Ok("text".to_string()),
    });
    let orchestrator = orchestrator_for(openai_config(), &provider);

    let intent = orchestrator
        .classify("tell me about it")
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(intent, Intent::DeepAnalysis);

    let answer = orchestrator
        .classify_and_respond(&QueryRequest::new("tell me about it", "Paper."), &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(answer.path, ResponsePath::Heavy);
    assert_eq!(answer.state, PipelineState::Done);
}

#[tokio::test]
async fn test_router_uses_cheap_model_at_zero_temperature() {
    let provider = ScriptedProvider::new(ProviderId::OpenAi, heavy_script("chat", "{}"));
    let orchestrator = orchestrator_for(openai_config(), &provider);

    let _ = orchestrator
        .classify_and_respond(&QueryRequest::new("hi!", "Paper."), &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    let router = provider.calls_for(Stage::Router);
    assert_eq!(router.len(), 1);
    assert_eq!(router[0].model, "gpt-4o-mini");
    assert!(router[0].temperature.is_some_and(|t| t.abs() < f32::EPSILON));
    assert!(router[0].json_mode);
    assert_eq!(provider.calls_for(Stage::Fast)[0].model, "gpt-4o");
}

#[tokio::test]
async fn test_fast_path_failure_returns_fallback() {
    let provider = ScriptedProvider::new(ProviderId::OpenAi, |stage, _, _| match stage {
        Stage::Router => Ok("chat".to_string()),
        _ => Err(AgentError::ContentBlocked {
            provider: ProviderId::OpenAi,
            reason: "SAFETY".to_string(),
        }),
    });
    let orchestrator = orchestrator_for(openai_config(), &provider);

    let answer = orchestrator
        .classify_and_respond(&QueryRequest::new("hey", "Paper."), &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(answer.intent, Intent::Chat);
    assert_eq!(answer.text, FAST_PATH_FALLBACK);
    assert_eq!(answer.state, PipelineState::Failed);
}

#[tokio::test]
async fn test_fast_path_sends_recent_history() {
    let provider = ScriptedProvider::new(ProviderId::OpenAi, heavy_script("chat", "{}"));
    let config = AgentConfig::builder()
        .provider("openai")
        .max_history_turns(2)
        .build()
        .unwrap_or_else(|_| unreachable!());
    let orchestrator = orchestrator_for(config, &provider);

    let history = vec![
        user_message("first question"),
        assistant_message("first answer"),
        user_message("second question"),
        assistant_message("second answer"),
    ];
    let request = QueryRequest::new("and then?", "Paper.").with_history(history);
    let _ = orchestrator
        .classify_and_respond(&request, &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    let fast = provider.calls_for(Stage::Fast);
    let contents: Vec<&str> = fast[0].messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents.len(), 4);
    assert_eq!(contents[1], "second question");
    assert_eq!(contents[2], "second answer");
}

#[tokio::test]
async fn test_synthesis_failure_emits_synthesize_thought() {
    let provider = ScriptedProvider::new(ProviderId::OpenAi, |stage, _, _| match stage {
        Stage::Router => Ok(r#"{"intent": "summary_obsidian"}"#.to_string()),
        Stage::Planner => Ok(r#"{"steps": [{"tool": "analyze", "goal": "g"}]}"#.to_string()),
        Stage::Synthesize => Err(provider_error(ProviderId::OpenAi, "overloaded")),
        _ => Ok("step text".to_string()),
    });
    let orchestrator = orchestrator_for(openai_config(), &provider);

    let answer = orchestrator
        .classify_and_respond(&QueryRequest::new("Make a note", "Paper."), &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(answer.state, PipelineState::Failed);
    assert_eq!(answer.text, HEAVY_PATH_FALLBACK);
    assert_eq!(answer.steps_executed, 1);
    let last = answer.thoughts.last().unwrap_or_else(|| unreachable!());
    assert_eq!(last.id, "synthesize");
    assert_eq!(last.tool, "synthesize");
    assert_eq!(last.status, ThoughtStatus::Failed);
    // The synthesize thought is not a plan step.
    let step_thoughts = answer.thoughts.iter().filter(|t| t.id.starts_with("step-")).count();
    assert_eq!(step_thoughts, answer.steps_executed);
}

#[tokio::test]
async fn test_obsidian_intent_requests_markdown_note() {
    let provider = ScriptedProvider::new(
        ProviderId::OpenAi,
        heavy_script("summary_obsidian", r#"{"steps": [{"tool": "analyze", "goal": "g"}]}"#),
    );
    let orchestrator = orchestrator_for(openai_config(), &provider);

    let _ = orchestrator
        .classify_and_respond(&QueryRequest::new("casually, what is this?", "Paper."), &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    let synth = provider.calls_for(Stage::Synthesize);
    assert!(last_user_message(&synth[0]).contains("markdown note"));
}

fn long_document() -> String {
    (1..=20)
        .map(|n| format!("[P{n}] Paragraph {n} of the paper with some words."))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn scan_config() -> AgentConfig {
    AgentConfig::builder()
        .provider("openai")
        .scan_threshold_chars(200)
        .all_relevant_chars(60)
        .build()
        .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn test_scan_excerpt_becomes_synthesis_context() {
    let provider = ScriptedProvider::new(ProviderId::OpenAi, |stage, n, request| {
        heavy_script("deep_analysis", r#"{"steps": [{"tool": "analyze", "goal": "g"}]}"#)(
            stage, n, request,
        )
        .map(|text| {
            if stage == Stage::Scan {
                "[P7] Paragraph 7 of the paper with some words.".to_string()
            } else {
                text
            }
        })
    });
    let orchestrator = orchestrator_for(scan_config(), &provider);

    let answer = orchestrator
        .classify_and_respond(&QueryRequest::new("What is in P7?", long_document()), &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(answer.scanned);
    let scan = provider.calls_for(Stage::Scan);
    assert_eq!(scan.len(), 1);
    assert_eq!(scan[0].model, "gpt-4o-mini");
    let synth = last_user_message(&provider.calls_for(Stage::Synthesize)[0]).to_string();
    assert!(synth.contains("<context>\n[P7] Paragraph 7"));
    assert!(!synth.contains("[P1] Paragraph 1"));
}

#[tokio::test]
async fn test_steps_work_from_scanned_excerpt() {
    let provider = ScriptedProvider::new(ProviderId::OpenAi, |stage, n, request| {
        heavy_script(
            "deep_analysis",
            r#"{"steps": [{"tool": "extract_data", "goal": "find n"}, {"tool": "critique", "goal": "assess"}]}"#,
        )(stage, n, request)
        .map(|text| {
            if stage == Stage::Scan {
                "[P17] Paragraph 17 of the paper with some words.".to_string()
            } else {
                text
            }
        })
    });
    let orchestrator = orchestrator_for(scan_config(), &provider);

    let answer = orchestrator
        .classify_and_respond(&QueryRequest::new("What is in P17?", long_document()), &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(answer.scanned);
    assert_eq!(answer.steps_executed, 2);
    let stages: Vec<Stage> = provider.calls().into_iter().map(|(s, _)| s).collect();
    let scan_at = stages.iter().position(|s| *s == Stage::Scan);
    let plan_at = stages.iter().position(|s| *s == Stage::Planner);
    assert!(scan_at < plan_at);

    let planner = last_user_message(&provider.calls_for(Stage::Planner)[0]).to_string();
    assert!(planner.contains("[P17] Paragraph 17"));
    for step in provider.calls_for(Stage::Step) {
        let prompt = last_user_message(&step);
        assert!(prompt.contains("<document_excerpt>\n[P17] Paragraph 17"));
        assert!(!prompt.contains("[P1] Paragraph 1 "));
    }
}

/// A document just past the synthesis window whose answer sits at the end.
fn tail_answer_document() -> String {
    let filler = "Background material that does not answer the question. ".repeat(600);
    format!("{filler}\n\n[P99] THE ANSWER IS HERE")
}

#[tokio::test]
async fn test_document_past_synthesis_window_is_scanned() {
    let document = tail_answer_document();
    assert!(document.len() > 30_000 && document.len() < 40_000);

    for config in [
        openai_config(),
        AgentConfig::builder()
            .provider("openai")
            .scan_threshold_chars(40_000)
            .build()
            .unwrap_or_else(|_| unreachable!()),
    ] {
        let provider = ScriptedProvider::new(ProviderId::OpenAi, |stage, n, request| {
            if stage == Stage::Scan {
                return Ok(if last_user_message(request).contains("[P99] THE ANSWER IS HERE") {
                    "[P99] THE ANSWER IS HERE".to_string()
                } else {
                    "NOT_FOUND".to_string()
                });
            }
            heavy_script("deep_analysis", r#"{"steps": [{"tool": "analyze", "goal": "g"}]}"#)(
                stage, n, request,
            )
        });
        let orchestrator = orchestrator_for(config, &provider);

        let answer = orchestrator
            .classify_and_respond(&QueryRequest::new("Where is the answer?", document.clone()), &NoProgress)
            .await
            .unwrap_or_else(|_| unreachable!());

        assert!(answer.scanned);
        assert_eq!(provider.calls_for(Stage::Scan).len(), 1);
        let synth = last_user_message(&provider.calls_for(Stage::Synthesize)[0]).to_string();
        assert!(synth.contains("[P99] THE ANSWER IS HERE"));
    }
}

#[tokio::test]
async fn test_scan_all_relevant_uses_bounded_prefix() {
    let provider = ScriptedProvider::new(
        ProviderId::OpenAi,
        heavy_script("deep_analysis", r#"{"steps": [{"tool": "analyze", "goal": "g"}]}"#),
    );
    let orchestrator = orchestrator_for(scan_config(), &provider);

    let document = long_document();
    let answer = orchestrator
        .classify_and_respond(&QueryRequest::new("Overall?", document.clone()), &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert!(answer.scanned);
    let synth = last_user_message(&provider.calls_for(Stage::Synthesize)[0]).to_string();
    let expected = format!("<context>\n{}\n</context>", &document[..60]);
    assert!(synth.contains(&expected));
}

#[tokio::test]
async fn test_scan_skipped_with_selection_or_without_cheap_model() {
    let provider = ScriptedProvider::new(
        ProviderId::OpenAi,
        heavy_script("deep_analysis", r#"{"steps": [{"tool": "analyze", "goal": "g"}]}"#),
    );
    let orchestrator = orchestrator_for(scan_config(), &provider);
    let request = QueryRequest::new("Explain this", long_document()).with_selection("Table 2: n=12");
    let answer = orchestrator
        .classify_and_respond(&request, &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(!answer.scanned);
    assert!(provider.calls_for(Stage::Scan).is_empty());
    let synth = last_user_message(&provider.calls_for(Stage::Synthesize)[0]).to_string();
    assert!(synth.contains("<context>\nTable 2: n=12\n</context>"));

    let provider = ScriptedProvider::new(
        ProviderId::OpenAi,
        heavy_script("deep_analysis", r#"{"steps": [{"tool": "analyze", "goal": "g"}]}"#),
    );
    let catalog =
        ModelCatalog::default().with(ProviderId::OpenAi, ProviderModels::new("gpt-4o", None, None));
    let config = AgentConfig::builder()
        .provider("openai")
        .catalog(catalog)
        .scan_threshold_chars(200)
        .build()
        .unwrap_or_else(|_| unreachable!());
    let orchestrator = orchestrator_for(config, &provider);
    let answer = orchestrator
        .classify_and_respond(&QueryRequest::new("Explain", long_document()), &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());
    assert!(!answer.scanned);
    assert!(provider.calls_for(Stage::Scan).is_empty());
    // Without a cheap model the router falls back to the primary model.
    assert_eq!(provider.calls_for(Stage::Router)[0].model, "gpt-4o");
}

#[tokio::test]
async fn test_scan_failure_falls_back_to_prefix() {
    let provider = ScriptedProvider::new(ProviderId::OpenAi, |stage, n, request| {
        if stage == Stage::Scan {
            return Err(provider_error(ProviderId::OpenAi, "rate limited"));
        }
        heavy_script("deep_analysis", r#"{"steps": [{"tool": "analyze", "goal": "g"}]}"#)(
            stage, n, request,
        )
    });
    let orchestrator = orchestrator_for(scan_config(), &provider);

    let answer = orchestrator
        .classify_and_respond(&QueryRequest::new("Overall?", long_document()), &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(answer.state, PipelineState::Done);
    assert!(!answer.scanned);
    let synth = last_user_message(&provider.calls_for(Stage::Synthesize)[0]).to_string();
    assert!(synth.contains("[P1] Paragraph 1"));
}

#[tokio::test]
async fn test_anthropic_foreign_model_is_substituted() {
    let provider = ScriptedProvider::new(
        ProviderId::Anthropic,
        heavy_script("deep_analysis", r#"{"steps": [{"tool": "analyze", "goal": "g"}]}"#),
    );
    let config = AgentConfig::builder()
        .provider("anthropic")
        .model("gpt-4o")
        .build()
        .unwrap_or_else(|_| unreachable!());
    let orchestrator = orchestrator_for(config, &provider);

    let answer = orchestrator
        .classify_and_respond(&QueryRequest::new("Why?", "Paper."), &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(answer.state, PipelineState::Done);
    for request in provider.calls_for(Stage::Step) {
        assert_eq!(request.model, "claude-sonnet-4-20250514");
    }
    assert_eq!(
        provider.calls_for(Stage::Synthesize)[0].model,
        "claude-sonnet-4-20250514"
    );
}

#[tokio::test]
async fn test_anthropic_reject_policy_fails_heavy_path() {
    let provider = ScriptedProvider::new(
        ProviderId::Anthropic,
        heavy_script("deep_analysis", r#"{"steps": [{"tool": "analyze", "goal": "g"}]}"#),
    );
    let config = AgentConfig::builder()
        .provider("anthropic")
        .model("gpt-4o")
        .model_policy(ModelPolicy::Reject)
        .build()
        .unwrap_or_else(|_| unreachable!());
    let orchestrator = orchestrator_for(config, &provider);

    let answer = orchestrator
        .classify_and_respond(&QueryRequest::new("Why?", "Paper."), &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    // Router and planner recover locally; the first step cannot.
    assert_eq!(answer.state, PipelineState::Failed);
    assert!(provider.calls_for(Stage::Step).is_empty());
    assert_eq!(answer.thoughts[0].status, ThoughtStatus::Failed);
}

#[tokio::test]
async fn test_gemini_fast_path_gets_brevity_directive() {
    let provider = ScriptedProvider::new(ProviderId::Gemini, heavy_script("explain_compact", "{}"));
    let config = AgentConfig::builder()
        .provider("gemini")
        .build()
        .unwrap_or_else(|_| unreachable!());
    let orchestrator = orchestrator_for(config, &provider);

    let answer = orchestrator
        .classify_and_respond(&QueryRequest::new("Explain entropy", "Paper."), &NoProgress)
        .await
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(answer.intent, Intent::ExplainCompact);
    let fast = provider.calls_for(Stage::Fast);
    assert_eq!(fast.len(), 1);
    assert_ne!(fast[0].messages[0].content, PromptSet::defaults().explain);
    assert!(fast[0].messages[0].content.starts_with(&PromptSet::defaults().explain));
}

#[tokio::test]
async fn test_invalid_query_rejected() {
    let provider = ScriptedProvider::new(ProviderId::OpenAi, heavy_script("chat", "{}"));
    let orchestrator = orchestrator_for(openai_config(), &provider);

    let err = orchestrator
        .classify_and_respond(&QueryRequest::new("   ", "Paper."), &NoProgress)
        .await
        .err();
    assert!(matches!(err, Some(AgentError::InvalidQuery { .. })));
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_concurrent_invocations_are_independent() {
    let provider = ScriptedProvider::new(
        ProviderId::OpenAi,
        heavy_script("deep_analysis", r#"{"steps": [{"tool": "analyze", "goal": "g"}]}"#),
    );
    let orchestrator = Arc::new(orchestrator_for(openai_config(), &provider));

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let orchestrator = Arc::clone(&orchestrator);
            tokio::spawn(async move {
                orchestrator
                    .classify_and_respond(&QueryRequest::new(format!("q{i}"), "Paper."), &NoProgress)
                    .await
            })
        })
        .collect();

    for handle in handles {
        let answer = handle
            .await
            .unwrap_or_else(|_| unreachable!())
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(answer.thoughts.len(), 1);
        assert_eq!(answer.thoughts[0].id, "step-1");
    }
}
