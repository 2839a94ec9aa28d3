//! Intermediate research artifacts and the final report.
//!
//! Artifacts travel between sub-agents as JSON payloads. None of them is
//! ever shown to the user directly; only [`ResearchReport::response`] is.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::SourceRating;

/// Returned by data gathering when every search in the call failed.
pub const SEARCH_FAILED: &str = "Search failed: Network unreachable";
/// Returned by source checking when there is nothing to rate.
pub const NO_SOURCES: &str = "No sources available";
/// Returned by citation formatting when nothing qualifies.
pub const NO_CITATIONS: &str = "No citations available";
/// Gap reported by reflection for empty research data.
pub const NO_DATA_GAP: &str = "No data available";
/// User-facing message when the first gathering cycle cannot reach the network.
pub const NETWORK_ABORT_MESSAGE: &str =
    "Unable to gather data due to network issues. Please try again.";

/// Maximum search queries in a plan or a recycle.
pub const MAX_PLAN_QUERIES: usize = 3;
/// Maximum follow-up queries a reflection may suggest.
pub const MAX_SUGGESTED_QUERIES: usize = 3;

/// Research plan produced once per turn.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// What the answer must establish.
    #[serde(default)]
    pub objectives: Vec<String>,
    /// Narrower questions derived from the query.
    #[serde(default)]
    pub sub_questions: Vec<String>,
    /// Web search queries (at most three).
    #[serde(default)]
    pub queries: Vec<String>,
    /// Kinds of sources worth consulting.
    #[serde(default)]
    pub sources: Vec<String>,
}

impl Plan {
    /// A minimal plan that searches for the query itself.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        Self {
            objectives: vec![format!("Answer: {}", query.trim())],
            queries: vec![query.trim().to_string()],
            ..Self::default()
        }
    }

    /// Trims, de-duplicates and caps the queries. Falls back to `query`
    /// when nothing usable remains.
    #[must_use]
    pub fn normalized(mut self, query: &str) -> Self {
        self.queries = distinct_queries(&self.queries, MAX_PLAN_QUERIES);
        if self.queries.is_empty() {
            self.queries.push(query.trim().to_string());
        }
        self
    }
}

/// Returns up to `limit` trimmed, non-blank queries, dropping
/// case-insensitive duplicates while keeping first-seen order.
#[must_use]
pub fn distinct_queries(queries: &[String], limit: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(limit);
    for q in queries {
        if out.len() == limit {
            break;
        }
        let q = q.trim();
        if q.is_empty() || out.iter().any(|o| o.eq_ignore_ascii_case(q)) {
            continue;
        }
        out.push(q.to_string());
    }
    out
}

/// A single source with its credibility rating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatedSource {
    /// Source URL.
    pub source: String,
    /// Credibility rating.
    pub rating: SourceRating,
}

/// Parses a source rating payload. Returns `None` for sentinels,
/// malformed JSON, or an empty list.
#[must_use]
pub fn parse_ratings(payload: &str) -> Option<Vec<RatedSource>> {
    serde_json::from_str::<Vec<RatedSource>>(payload.trim())
        .ok()
        .filter(|r| !r.is_empty())
}

/// Parses a citation payload. Returns `None` for sentinels, malformed
/// JSON, or an empty list.
#[must_use]
pub fn parse_citations(payload: &str) -> Option<Vec<String>> {
    serde_json::from_str::<Vec<String>>(payload.trim())
        .ok()
        .filter(|c| !c.is_empty())
}

/// Bias, gap and insight analysis of gathered data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    /// Possible slants in the sources.
    #[serde(default)]
    pub biases: Vec<String>,
    /// Missing information worth another search.
    #[serde(default)]
    pub gaps: Vec<String>,
    /// Notable findings and trends.
    #[serde(default)]
    pub insights: Vec<String>,
    /// Claims that disagree across sources.
    #[serde(default)]
    pub conflicts: Vec<String>,
    /// Follow-up search queries (at most three).
    #[serde(default)]
    pub suggested_queries: Vec<String>,
}

impl Reflection {
    /// Reflection for empty research data.
    #[must_use]
    pub fn no_data() -> Self {
        Self {
            gaps: vec![NO_DATA_GAP.to_string()],
            ..Self::default()
        }
    }

    /// `true` when another research cycle is warranted.
    #[must_use]
    pub fn has_gaps(&self) -> bool {
        !self.gaps.is_empty()
    }

    /// Drops blank entries and caps suggested queries.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        for list in [
            &mut self.biases,
            &mut self.gaps,
            &mut self.insights,
            &mut self.conflicts,
        ] {
            list.retain(|s| !s.trim().is_empty());
        }
        self.suggested_queries = distinct_queries(&self.suggested_queries, MAX_SUGGESTED_QUERIES);
        self
    }

    /// Appends another cycle's reflection, skipping exact duplicates.
    pub fn merge(&mut self, other: Self) {
        fn extend(into: &mut Vec<String>, from: Vec<String>) {
            for item in from {
                if !into.contains(&item) {
                    into.push(item);
                }
            }
        }
        extend(&mut self.biases, other.biases);
        extend(&mut self.gaps, other.gaps);
        extend(&mut self.insights, other.insights);
        extend(&mut self.conflicts, other.conflicts);
        extend(&mut self.suggested_queries, other.suggested_queries);
    }

    /// Parses a reflection payload.
    #[must_use]
    pub fn parse(payload: &str) -> Option<Self> {
        serde_json::from_str::<Self>(strip_code_fence(payload)).ok()
    }
}

/// Input to reflection and citation: raw data plus its ratings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisInput {
    /// Serialized research data.
    #[serde(default)]
    pub raw_data: String,
    /// Serialized source ratings.
    #[serde(default)]
    pub ratings: String,
}

impl AnalysisInput {
    /// Creates an input from the two payloads.
    #[must_use]
    pub fn new(raw_data: impl Into<String>, ratings: impl Into<String>) -> Self {
        Self {
            raw_data: raw_data.into(),
            ratings: ratings.into(),
        }
    }

    /// Parses the payload. Fields given as JSON values rather than strings
    /// are re-serialized so callers may embed data directly.
    #[must_use]
    pub fn parse(payload: &str) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_str(payload.trim()).ok()?;
        let field = |name: &str| match value.get(name) {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };
        value.is_object().then(|| Self {
            raw_data: field("raw_data"),
            ratings: field("ratings"),
        })
    }

    /// Serializes to the JSON payload form.
    #[must_use]
    pub fn to_payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Strips a surrounding markdown code fence, if any.
#[must_use]
pub fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    if trimmed.starts_with("```") {
        trimmed
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim()
    } else {
        trimmed
    }
}

/// How a research run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResearchOutcome {
    /// A synthesized answer was produced.
    Completed,
    /// The first gathering cycle failed; no synthesis ran.
    Aborted,
}

/// One tool invocation made while researching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolTraceEntry {
    /// Research cycle (1-based).
    pub cycle: usize,
    /// Tool name.
    pub tool: String,
    /// Whether the tool reported an error.
    pub is_error: bool,
    /// Size of the tool output.
    pub output_bytes: usize,
    /// Wall-clock time of the call.
    pub elapsed_ms: u64,
}

/// Final result of the research pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct ResearchReport {
    /// The only text shown to the user.
    pub response: String,
    /// How the run ended.
    pub outcome: ResearchOutcome,
    /// Research cycles run (1 or 2).
    pub cycles: usize,
    /// Every search query issued, in order.
    pub queries: Vec<String>,
    /// Distinct sources gathered.
    pub sources_found: usize,
    /// Citations available to the answer.
    pub citations: Vec<String>,
    /// Tool calls in execution order.
    pub trace: Vec<ToolTraceEntry>,
    /// Total tokens consumed.
    pub total_tokens: u32,
    /// Total elapsed time.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_duration<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}
