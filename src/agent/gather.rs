//! Data gathering sub-agent.
//!
//! Turns a list of search queries into one de-duplicated result set. At
//! most [`MAX_SEARCHES`] searches run per invocation; any budget the caller
//! leaves unused is spent refining queries that came back thin.

use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::Datelike;
use futures_util::future::join_all;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::artifact::{SEARCH_FAILED, distinct_queries};
use super::tool::DATA_GATHER;
use super::traits::{AgentResponse, SubAgent};
use crate::error::AgentError;
use crate::search::{SearchOutcome, SearchResultSet, SearchTool};

/// Maximum searches per invocation.
pub const MAX_SEARCHES: usize = 3;
/// A query with fewer hits than this is worth refining.
const MIN_USEFUL_HITS: usize = 2;

/// Matches a four-digit year.
fn year_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"\b(19|20)\d{2}\b") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern is valid"),
    })
}

#[derive(Deserialize)]
struct GatherRequest {
    #[serde(default)]
    queries: Vec<String>,
    #[serde(default)]
    query: Option<String>,
}

/// Extracts search queries from a payload.
///
/// Accepts `{"queries": [...]}`, `{"query": "..."}`, a JSON array of
/// strings, a JSON string, or plain text.
#[must_use]
pub fn parse_queries(payload: &str) -> Vec<String> {
    let trimmed = payload.trim();
    let raw: Vec<String> = if let Ok(req) = serde_json::from_str::<GatherRequest>(trimmed) {
        let mut q = req.queries;
        q.extend(req.query);
        q
    } else if let Ok(list) = serde_json::from_str::<Vec<String>>(trimmed) {
        list
    } else if let Ok(single) = serde_json::from_str::<String>(trimmed) {
        vec![single]
    } else {
        vec![trimmed.to_string()]
    };
    distinct_queries(&raw, MAX_SEARCHES)
}

/// Refined variants of a query, most specific first.
#[must_use]
pub fn refinements(query: &str, year: i32) -> Vec<String> {
    let mut out = Vec::with_capacity(2);
    if !year_regex().is_match(query) {
        out.push(format!("{query} {year}"));
    }
    if !query.to_lowercase().contains("statistics") {
        out.push(format!("{query} statistics"));
    }
    out
}

/// Collects web data for a set of queries.
#[derive(Debug, Clone)]
pub struct DataGatherAgent {
    search: SearchTool,
}

impl DataGatherAgent {
    /// Creates the agent over a search tool.
    #[must_use]
    pub const fn new(search: SearchTool) -> Self {
        Self { search }
    }

    /// Runs the searches for `queries` and returns the merged results.
    ///
    /// Returns `None` when every search was served from fallback data.
    pub async fn gather(&self, queries: &[String]) -> Option<SearchResultSet> {
        let queries = distinct_queries(queries, MAX_SEARCHES);
        if queries.is_empty() {
            return Some(SearchResultSet::default());
        }

        let first = self.run_all(&queries).await;

        let refined = Self::plan_refinements(&queries, &first);
        let second = if refined.is_empty() {
            Vec::new()
        } else {
            debug!(count = refined.len(), "refining thin queries");
            self.run_all(&refined).await
        };

        let searches = first.len() + second.len();
        let failed = first.iter().chain(&second).filter(|o| o.degraded).count();
        info!(searches, failed, "data gathering complete");

        if failed == searches {
            warn!(searches, "every search failed");
            return None;
        }

        let mut merged = SearchResultSet::default();
        for outcome in first.into_iter().chain(second) {
            merged.merge(outcome.results);
        }
        Some(merged)
    }

    async fn run_all(&self, queries: &[String]) -> Vec<SearchOutcome> {
        join_all(queries.iter().map(|q| self.search.search(q))).await
    }

    /// Picks refined queries for thin results within the remaining budget.
    fn plan_refinements(queries: &[String], outcomes: &[SearchOutcome]) -> Vec<String> {
        let mut budget = MAX_SEARCHES.saturating_sub(queries.len());
        let year = chrono::Utc::now().year();
        let mut refined = Vec::new();

        for (query, outcome) in queries.iter().zip(outcomes) {
            if budget == 0 {
                break;
            }
            if outcome.degraded || outcome.results.len() >= MIN_USEFUL_HITS {
                continue;
            }
            for candidate in refinements(query, year) {
                if budget == 0 {
                    break;
                }
                if !queries.contains(&candidate) && !refined.contains(&candidate) {
                    refined.push(candidate);
                    budget -= 1;
                }
            }
        }
        refined
    }
}

#[async_trait]
impl SubAgent for DataGatherAgent {
    fn name(&self) -> &'static str {
        DATA_GATHER
    }

    fn description(&self) -> &'static str {
        "Collect web data using search, limited to 3 searches."
    }

    async fn invoke(&self, payload: &str) -> Result<AgentResponse, AgentError> {
        let queries = parse_queries(payload);
        let content = match self.gather(&queries).await {
            Some(data) => data.to_payload(),
            None => SEARCH_FAILED.to_string(),
        };
        Ok(AgentResponse::text(content))
    }
}
