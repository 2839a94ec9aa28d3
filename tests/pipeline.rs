//! End-to-end research pipeline tests.
//!
//! Runs whole turns through `TurnRunner` with a scripted model and a
//! scripted search backend. No network access.

#![allow(clippy::unwrap_used, clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use deepsearch_rs::agent::artifact::NETWORK_ABORT_MESSAGE;
use deepsearch_rs::agent::prompt::{
    PLANNING_SYSTEM_PROMPT, QUERY_SYSTEM_PROMPT, REFLECTION_SYSTEM_PROMPT,
    SYNTHESIZER_SYSTEM_PROMPT,
};
use deepsearch_rs::agent::tool::{DATA_GATHER, FORMAT_CITATIONS};
use deepsearch_rs::agent::{
    AgentConfig, ChatRequest, ChatResponse, LlmProvider, PromptSet, ResearchOutcome, Role,
    TokenUsage, TurnOutcome, TurnRunner,
};
use deepsearch_rs::error::{AgentError, SearchError};
use deepsearch_rs::search::{SearchBackend, SearchHit, SearchResultSet};
use deepsearch_rs::storage::{SessionStore, SqliteSessionStore};
use proptest::prelude::*;

/// Model replies keyed by agent role.
#[derive(Clone)]
struct Script {
    classify: String,
    plan: String,
    reflections: Vec<String>,
    synthesis: String,
}

impl Script {
    fn research() -> Self {
        Self {
            classify: r#"{"mode":"research","reply":"","query":"Compare electric and gas cars"}"#
                .to_string(),
            plan: r#"{"objectives":["compare costs"],"queries":["ev costs","gas car costs"]}"#
                .to_string(),
            reflections: vec![r#"{"insights":["EVs are cheaper to run"],"gaps":[]}"#.to_string()],
            synthesis: "Electric cars cost less to fuel and maintain than gas cars.\n{\"gaps\": []}\n\n```json\n{\"insights\": [\"internal\"]}\n```".to_string(),
        }
    }
}

struct ScriptedModel {
    script: Script,
    reflections_served: AtomicUsize,
    roles: Mutex<Vec<&'static str>>,
}

impl ScriptedModel {
    fn new(script: Script) -> Arc<Self> {
        Arc::new(Self {
            script,
            reflections_served: AtomicUsize::new(0),
            roles: Mutex::new(Vec::new()),
        })
    }

    fn roles(&self) -> Vec<&'static str> {
        self.roles.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for ScriptedModel {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, AgentError> {
        let system = request
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let (role, content) = if system == QUERY_SYSTEM_PROMPT {
            ("query", self.script.classify.clone())
        } else if system == PLANNING_SYSTEM_PROMPT {
            ("planning", self.script.plan.clone())
        } else if system == REFLECTION_SYSTEM_PROMPT {
            let n = self.reflections_served.fetch_add(1, Ordering::SeqCst);
            let reply = self
                .script
                .reflections
                .get(n)
                .or_else(|| self.script.reflections.last())
                .cloned()
                .unwrap_or_else(|| "{}".to_string());
            ("reflection", reply)
        } else if system == SYNTHESIZER_SYSTEM_PROMPT {
            ("synthesizer", self.script.synthesis.clone())
        } else {
            panic!("unexpected system prompt");
        };

        self.roles.lock().unwrap().push(role);
        Ok(ChatResponse {
            content,
            usage: TokenUsage {
                prompt_tokens: 5,
                completion_tokens: 5,
                total_tokens: 10,
            },
            finish_reason: Some("stop".to_string()),
        })
    }
}

/// Search backend returning `hits` results per query, or failing.
struct ScriptedSearch {
    hits: usize,
    fail: bool,
    queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    fn new(hits: usize, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            hits,
            fail,
            queries: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.queries.lock().unwrap().len()
    }
}

#[async_trait]
impl SearchBackend for ScriptedSearch {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn search(
        &self,
        query: &str,
        _max_results: usize,
    ) -> Result<SearchResultSet, SearchError> {
        self.queries.lock().unwrap().push(query.to_string());
        if self.fail {
            return Err(SearchError::Timeout { secs: 10 });
        }
        let slug = query.replace(' ', "-");
        let results = (0..self.hits)
            .map(|i| {
                let url = if i % 2 == 0 {
                    format!("https://www.energy.gov/{slug}/{i}")
                } else {
                    format!("https://forum.example.com/{slug}/{i}")
                };
                let mut hit = SearchHit::new(url, "Electric vehicles cost less per mile.");
                hit.title = Some(format!("Vehicle costs {i}"));
                hit.published_date = Some("2025-02-01".to_string());
                hit
            })
            .collect();
        Ok(SearchResultSet { results })
    }
}

fn runner(
    model: Arc<ScriptedModel>,
    search: Arc<ScriptedSearch>,
) -> (TurnRunner, Arc<SqliteSessionStore>) {
    let store = Arc::new(SqliteSessionStore::in_memory().unwrap());
    let config = AgentConfig::builder()
        .api_key("sk-test")
        .search_api_key("tvly-test")
        .search_attempts(3)
        .search_backoff(Duration::from_millis(1))
        .build()
        .unwrap();
    let runner = TurnRunner::with_prompts(
        model,
        search,
        store.clone(),
        &config,
        &PromptSet::defaults(),
    );
    (runner, store)
}

#[tokio::test]
async fn test_greeting_makes_no_tool_calls() {
    let model = ScriptedModel::new(Script::research());
    let search = ScriptedSearch::new(2, false);
    let (runner, _) = runner(model.clone(), search.clone());

    let outcome = runner.run_turn("s", "hi").await;

    assert_eq!(
        outcome.message(),
        "Hi! How can I help with your research today?"
    );
    assert!(model.roles().is_empty());
    assert_eq!(search.calls(), 0);
}

#[tokio::test]
async fn test_research_answer_cites_sources_without_artifacts() {
    let model = ScriptedModel::new(Script::research());
    let search = ScriptedSearch::new(2, false);
    let (runner, store) = runner(model.clone(), search);

    let outcome = runner.run_turn("s", "EVs vs gas cars?").await;
    let TurnOutcome::Research(report) = &outcome else {
        panic!("expected research, got {outcome:?}");
    };

    assert_eq!(report.outcome, ResearchOutcome::Completed);
    assert_eq!(report.cycles, 1);
    assert!(!report.citations.is_empty());
    assert!(
        report
            .citations
            .iter()
            .all(|c| c.starts_with("energy.gov. (2025, February 1). Vehicle costs"))
    );
    assert!(report.response.contains("energy.gov. (2025, February 1)."));
    assert!(!report.response.contains("```"));
    assert!(!report.response.contains("\"insights\""));
    assert!(!report.response.contains("\"gaps\""));
    assert!(!report.response.contains("forum.example.com"));
    assert_eq!(
        model.roles(),
        vec!["query", "planning", "reflection", "synthesizer"]
    );

    let turns = store.get_history("s").unwrap();
    assert_eq!(turns[0].output, report.response);
}

#[tokio::test]
async fn test_network_failure_aborts_with_fixed_message() {
    let model = ScriptedModel::new(Script::research());
    let search = ScriptedSearch::new(2, true);
    let (runner, _) = runner(model.clone(), search.clone());

    let outcome = runner.run_turn("s", "EVs vs gas cars?").await;

    assert_eq!(outcome.message(), NETWORK_ABORT_MESSAGE);
    let TurnOutcome::Research(report) = &outcome else {
        panic!("expected research, got {outcome:?}");
    };
    assert_eq!(report.outcome, ResearchOutcome::Aborted);
    assert!(!model.roles().contains(&"synthesizer"));
    assert!(!model.roles().contains(&"reflection"));
    // Two plan queries, three attempts each.
    assert_eq!(search.calls(), 6);
}

#[tokio::test]
async fn test_gaps_run_exactly_one_extra_cycle() {
    let gaps = r#"{"gaps":["no maintenance data"],"suggested_queries":["ev maintenance costs"]}"#;
    let script = Script {
        reflections: vec![gaps.to_string(), gaps.to_string(), gaps.to_string()],
        ..Script::research()
    };
    let model = ScriptedModel::new(script);
    let search = ScriptedSearch::new(2, false);
    let (runner, _) = runner(model.clone(), search.clone());

    let outcome = runner.run_turn("s", "EVs vs gas cars?").await;
    let TurnOutcome::Research(report) = &outcome else {
        panic!("expected research, got {outcome:?}");
    };

    assert_eq!(report.cycles, 2);
    let gathers = report.trace.iter().filter(|t| t.tool == DATA_GATHER).count();
    let cites = report.trace.iter().filter(|t| t.tool == FORMAT_CITATIONS).count();
    assert_eq!((gathers, cites), (2, 2));
    assert_eq!(
        report.queries,
        vec!["ev costs", "gas car costs", "ev maintenance costs"]
    );
    assert_eq!(
        model.roles().iter().filter(|r| **r == "reflection").count(),
        2
    );
    assert_eq!(search.calls(), 3);
}

#[tokio::test]
async fn test_ambiguous_turn_asks_one_question() {
    let script = Script {
        classify: r#"{"mode":"ambiguous","reply":"Which cars would you like compared?"}"#
            .to_string(),
        ..Script::research()
    };
    let model = ScriptedModel::new(script);
    let search = ScriptedSearch::new(2, false);
    let (runner, _) = runner(model.clone(), search.clone());

    let outcome = runner.run_turn("s", "compare them").await;

    assert!(matches!(outcome, TurnOutcome::Reply { .. }));
    assert_eq!(outcome.message(), "Which cars would you like compared?");
    assert_eq!(model.roles(), vec!["query"]);
    assert_eq!(search.calls(), 0);
}

fn query_strategy() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::vec("[a-z]{1,6}( [a-z]{1,6})?", 0..6)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_search_and_cycle_bounds(
        plan_queries in query_strategy(),
        suggested in query_strategy(),
        gap_count in 0usize..3,
        hits in 0usize..4,
    ) {
        let reflection = serde_json::json!({
            "gaps": (0..gap_count).map(|i| format!("gap {i}")).collect::<Vec<_>>(),
            "suggested_queries": suggested,
        })
        .to_string();
        let script = Script {
            plan: serde_json::json!({ "queries": plan_queries }).to_string(),
            reflections: vec![reflection],
            ..Script::research()
        };
        let model = ScriptedModel::new(script);
        let search = ScriptedSearch::new(hits, false);
        let (runner, _) = runner(model, search.clone());

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let outcome = rt.block_on(runner.run_turn("s", "EVs vs gas cars?"));
        let TurnOutcome::Research(report) = outcome else {
            panic!("expected research");
        };

        let gathers = report.trace.iter().filter(|t| t.tool == DATA_GATHER).count();
        prop_assert!(report.cycles <= 2);
        prop_assert!(gathers <= 2);
        prop_assert!(search.calls() <= 3 * gathers);
        prop_assert!(report.trace.iter().all(|t| t.cycle <= 2));
    }
}
