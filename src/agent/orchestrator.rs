//! Orchestrator for the research pipeline.
//!
//! Drives an explicit state machine over the research tools:
//!
//! ```text
//! PLAN → GATHER → RATE → REFLECT → CITE ─┬─ gaps, no recycle yet → GATHER
//!                                        └─ otherwise            → SYNTHESIZE
//! ```
//!
//! Every sub-agent is reached through the [`ToolExecutor`] by tool name, so
//! the same tools can be offered to a model's function-calling interface.
//! Only the synthesized answer leaves this module as user-facing text.

use std::sync::Arc;
use std::time::Instant;

use chrono::Datelike;
use tracing::{debug, info, warn};

use super::adapter::AgentTool;
use super::artifact::{
    AnalysisInput, MAX_PLAN_QUERIES, NETWORK_ABORT_MESSAGE, NO_DATA_GAP, NO_SOURCES, Plan,
    RatedSource, Reflection, ResearchOutcome, ResearchReport, SEARCH_FAILED, ToolTraceEntry,
    distinct_queries, parse_citations, parse_ratings,
};
use super::citation::CitationAgent;
use super::config::{AgentConfig, MAX_RECYCLES};
use super::executor::ToolExecutor;
use super::gather::{DataGatherAgent, refinements};
use super::message::TokenUsage;
use super::planning::PlanningAgent;
use super::prompt::{PromptSet, SynthesisContext};
use super::provider::LlmProvider;
use super::reflection::ReflectionAgent;
use super::source_check::SourceCheckerAgent;
use super::synthesizer::SynthesizerAgent;
use super::tool::{
    CREATE_PLAN, DATA_GATHER, FORMAT_CITATIONS, REFLECT_DATA, SOURCE_CHECK, ToolResult, ToolSet,
};
use crate::error::AgentError;
use crate::search::{SearchBackend, SearchResultSet, SearchTool};

/// Maximum accepted query length in bytes.
pub const MAX_QUERY_LEN: usize = 10_000;

/// Pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Plan,
    Gather,
    Rate,
    Reflect,
    Cite,
    Recycle,
    Synthesize,
}

/// Mutable state of one research run.
#[derive(Debug, Default)]
struct ResearchRun {
    cycle: usize,
    recycles: usize,
    plan: Plan,
    pending: Vec<String>,
    searched: Vec<String>,
    cycle_data: SearchResultSet,
    cycle_ratings: String,
    cycle_reflection: Reflection,
    data: SearchResultSet,
    ratings: Vec<RatedSource>,
    citations: Vec<String>,
    reflection: Reflection,
    trace: Vec<ToolTraceEntry>,
    usage: TokenUsage,
}

impl ResearchRun {
    fn new() -> Self {
        Self {
            cycle: 1,
            ..Self::default()
        }
    }

    fn report(self, response: String, outcome: ResearchOutcome, start: Instant) -> ResearchReport {
        ResearchReport {
            response,
            outcome,
            cycles: self.cycle,
            queries: self.searched,
            sources_found: self.data.len(),
            citations: self.citations,
            trace: self.trace,
            total_tokens: self.usage.total_tokens,
            elapsed: start.elapsed(),
        }
    }
}

/// Runs research turns end to end.
pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    executor: ToolExecutor,
    synthesizer: SynthesizerAgent,
    max_recycles: usize,
}

impl Orchestrator {
    /// Creates an orchestrator, loading prompt templates from
    /// [`AgentConfig::prompt_dir`] with compiled-in defaults as fallback.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchBackend>,
        config: &AgentConfig,
    ) -> Self {
        let prompts = PromptSet::load(config.prompt_dir.as_deref());
        Self::with_prompts(provider, search, config, &prompts)
    }

    /// Creates an orchestrator with explicit prompts.
    #[must_use]
    pub fn with_prompts(
        provider: Arc<dyn LlmProvider>,
        search: Arc<dyn SearchBackend>,
        config: &AgentConfig,
        prompts: &PromptSet,
    ) -> Self {
        let planning = PlanningAgent::new(Arc::clone(&provider), config, prompts.planning.clone());
        let gather = DataGatherAgent::new(SearchTool::new(search, config.search));
        let reflection =
            ReflectionAgent::new(Arc::clone(&provider), config, prompts.reflection.clone());

        let executor = ToolExecutor::new()
            .with(AgentTool::new(Arc::new(planning)))
            .with(AgentTool::new(Arc::new(gather)))
            .with(AgentTool::new(Arc::new(SourceCheckerAgent)))
            .with(AgentTool::new(Arc::new(reflection)))
            .with(AgentTool::new(Arc::new(CitationAgent)));

        Self {
            provider,
            executor,
            synthesizer: SynthesizerAgent::new(config, prompts.synthesizer.clone()),
            max_recycles: config.max_recycles.min(MAX_RECYCLES),
        }
    }

    /// Definitions of the research tools, in pipeline order.
    #[must_use]
    pub fn tools(&self) -> ToolSet {
        self.executor.tool_set()
    }

    /// Researches `query` and returns the synthesized report.
    ///
    /// A total search failure on the first cycle ends the run with
    /// [`ResearchOutcome::Aborted`] and a fixed message instead of an error.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] for an empty or oversized query, a failed
    /// planning call, or a failed synthesis.
    pub async fn research(&self, query: &str) -> Result<ResearchReport, AgentError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(AgentError::Orchestration {
                message: "Query cannot be empty".to_string(),
            });
        }
        if query.len() > MAX_QUERY_LEN {
            return Err(AgentError::Orchestration {
                message: format!(
                    "Query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                    query.len()
                ),
            });
        }

        let start = Instant::now();
        let mut run = ResearchRun::new();
        let mut stage = Stage::Plan;

        loop {
            info!(?stage, cycle = run.cycle, "research stage");
            stage = match stage {
                Stage::Plan => {
                    self.plan(&mut run, query).await?;
                    Stage::Gather
                }
                Stage::Gather => {
                    if self.gather(&mut run).await {
                        Stage::Rate
                    } else if run.cycle == 1 {
                        warn!("first gathering cycle failed, aborting research");
                        return Ok(run.report(
                            NETWORK_ABORT_MESSAGE.to_string(),
                            ResearchOutcome::Aborted,
                            start,
                        ));
                    } else {
                        warn!(cycle = run.cycle, "recycle search failed, synthesizing earlier data");
                        Stage::Synthesize
                    }
                }
                Stage::Rate => {
                    self.rate(&mut run).await;
                    Stage::Reflect
                }
                Stage::Reflect => {
                    self.reflect(&mut run).await;
                    Stage::Cite
                }
                Stage::Cite => {
                    self.cite(&mut run).await;
                    if run.cycle_reflection.has_gaps() && run.recycles < self.max_recycles {
                        Stage::Recycle
                    } else {
                        Stage::Synthesize
                    }
                }
                Stage::Recycle => {
                    let queries =
                        recycle_queries(&run.cycle_reflection, &run.plan, &run.searched);
                    if queries.is_empty() {
                        debug!("no fresh queries for the gaps, synthesizing");
                        Stage::Synthesize
                    } else {
                        run.recycles += 1;
                        run.cycle += 1;
                        run.pending = queries;
                        Stage::Gather
                    }
                }
                Stage::Synthesize => {
                    let response = self.synthesize(&mut run, query).await?;
                    info!(
                        cycles = run.cycle,
                        sources = run.data.len(),
                        citations = run.citations.len(),
                        elapsed = ?start.elapsed(),
                        "research complete"
                    );
                    return Ok(run.report(response, ResearchOutcome::Completed, start));
                }
            };
        }
    }

    async fn call_tool(&self, run: &mut ResearchRun, name: &str, payload: &str) -> ToolResult {
        let started = Instant::now();
        let result = self.executor.call(name, payload).await;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        debug!(
            tool = name,
            is_error = result.is_error,
            bytes = result.content.len(),
            elapsed_ms,
            "tool call complete"
        );
        run.usage.add(&result.usage);
        run.trace.push(ToolTraceEntry {
            cycle: run.cycle,
            tool: name.to_string(),
            is_error: result.is_error,
            output_bytes: result.content.len(),
            elapsed_ms,
        });
        result
    }

    async fn plan(&self, run: &mut ResearchRun, query: &str) -> Result<(), AgentError> {
        let result = self.call_tool(run, CREATE_PLAN, query).await;
        if result.is_error {
            return Err(AgentError::ToolExecution {
                name: CREATE_PLAN.to_string(),
                message: result.content,
            });
        }
        run.plan = serde_json::from_str::<Plan>(&result.content)
            .map_or_else(|_| Plan::from_query(query), |plan| plan.normalized(query));
        run.pending = run.plan.queries.clone();
        Ok(())
    }

    /// Returns `false` when every search of the cycle failed.
    async fn gather(&self, run: &mut ResearchRun) -> bool {
        let queries = distinct_queries(&std::mem::take(&mut run.pending), MAX_PLAN_QUERIES);
        let payload = serde_json::json!({ "queries": queries }).to_string();
        let result = self.call_tool(run, DATA_GATHER, &payload).await;
        run.searched.extend(queries);

        if result.is_error || result.content == SEARCH_FAILED {
            return false;
        }
        let data = SearchResultSet::parse(&result.content).unwrap_or_default();
        run.data.merge(data.clone());
        run.cycle_data = data;
        true
    }

    async fn rate(&self, run: &mut ResearchRun) {
        let payload = run.cycle_data.to_payload();
        let result = self.call_tool(run, SOURCE_CHECK, &payload).await;
        let ratings = if result.is_error {
            None
        } else {
            parse_ratings(&result.content)
        };
        match ratings {
            Some(rated) => {
                for r in rated {
                    if !run.ratings.iter().any(|e| e.source == r.source) {
                        run.ratings.push(r);
                    }
                }
                run.cycle_ratings = result.content;
            }
            None => run.cycle_ratings = NO_SOURCES.to_string(),
        }
    }

    async fn reflect(&self, run: &mut ResearchRun) {
        let payload =
            AnalysisInput::new(run.cycle_data.to_payload(), run.cycle_ratings.as_str()).to_payload();
        let result = self.call_tool(run, REFLECT_DATA, &payload).await;
        let reflection = if result.is_error {
            warn!(error = %result.content, "reflection tool failed");
            Reflection::default()
        } else {
            Reflection::parse(&result.content).unwrap_or_default()
        };
        run.reflection.merge(reflection.clone());
        run.cycle_reflection = reflection;
    }

    async fn cite(&self, run: &mut ResearchRun) {
        let payload =
            AnalysisInput::new(run.cycle_data.to_payload(), run.cycle_ratings.as_str()).to_payload();
        let result = self.call_tool(run, FORMAT_CITATIONS, &payload).await;
        if result.is_error {
            return;
        }
        for citation in parse_citations(&result.content).unwrap_or_default() {
            if !run.citations.contains(&citation) {
                run.citations.push(citation);
            }
        }
    }

    async fn synthesize(&self, run: &mut ResearchRun, query: &str) -> Result<String, AgentError> {
        let ctx = SynthesisContext {
            query,
            data: &run.data,
            reflection: &run.reflection,
            citations: &run.citations,
        };
        let response = self
            .synthesizer
            .synthesize(self.provider.as_ref(), &ctx)
            .await?;
        run.usage.add(&response.usage);
        Ok(response.content)
    }
}

/// Picks up to three unsearched queries for the recycle: suggested queries
/// first, then gap texts, then refinements of the plan queries.
fn recycle_queries(reflection: &Reflection, plan: &Plan, searched: &[String]) -> Vec<String> {
    let fresh = |candidates: Vec<String>| -> Vec<String> {
        let unsearched: Vec<String> = candidates
            .into_iter()
            .filter(|c| !searched.iter().any(|s| s.eq_ignore_ascii_case(c.trim())))
            .collect();
        distinct_queries(&unsearched, MAX_PLAN_QUERIES)
    };

    let suggested = fresh(reflection.suggested_queries.clone());
    if !suggested.is_empty() {
        return suggested;
    }
    let gaps = fresh(
        reflection
            .gaps
            .iter()
            .filter(|g| g.as_str() != NO_DATA_GAP)
            .cloned()
            .collect(),
    );
    if !gaps.is_empty() {
        return gaps;
    }
    let year = chrono::Utc::now().year();
    fresh(
        plan.queries
            .iter()
            .flat_map(|q| refinements(q, year))
            .collect(),
    )
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("provider", &self.provider.name())
            .field("tools", &self.executor.names())
            .field("synthesizer", &self.synthesizer)
            .field("max_recycles", &self.max_recycles)
            .finish()
    }
}
