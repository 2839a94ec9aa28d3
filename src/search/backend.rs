//! Search backend abstraction and the Tavily implementation.
//!
//! A backend performs exactly one outbound search call. Timeouts, retries
//! and fallback are owned by [`SearchTool`](super::SearchTool), not here.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::SearchError;

/// Default Tavily search endpoint.
pub const TAVILY_ENDPOINT: &str = "https://api.tavily.com/search";

/// Maximum bytes of an error body kept in [`SearchError::Status`].
const MAX_ERROR_BODY_LEN: usize = 500;

/// A single search result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Source URL.
    pub url: String,
    /// Extracted page content or snippet.
    #[serde(default)]
    pub content: String,
    /// Page title, when the backend provides one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Publication date as reported by the backend (free-form).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_date: Option<String>,
    /// Backend relevance score.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl SearchHit {
    /// Creates a hit with only a URL and content.
    #[must_use]
    pub fn new(url: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content: content.into(),
            title: None,
            published_date: None,
            score: None,
        }
    }
}

/// A collection of search results. This is the serialized shape of raw
/// research data passed between sub-agents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResultSet {
    /// Results in backend order.
    #[serde(default)]
    pub results: Vec<SearchHit>,
}

impl SearchResultSet {
    /// Returns `true` if there are no results.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Number of results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Appends results from `other`, skipping URLs already present.
    pub fn merge(&mut self, other: Self) {
        for hit in other.results {
            if !self.results.iter().any(|h| h.url == hit.url) {
                self.results.push(hit);
            }
        }
    }

    /// Parses a raw data payload. Returns `None` for anything that is not a
    /// result set (empty text, sentinels, malformed JSON).
    #[must_use]
    pub fn parse(payload: &str) -> Option<Self> {
        let trimmed = payload.trim();
        if trimmed.is_empty() {
            return None;
        }
        serde_json::from_str::<Self>(trimmed)
            .ok()
            .or_else(|| serde_json::from_str::<Vec<SearchHit>>(trimmed).ok().map(|results| Self { results }))
    }

    /// Serializes to the JSON payload form.
    #[must_use]
    pub fn to_payload(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| r#"{"results":[]}"#.to_string())
    }
}

/// An external web search service.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Performs one search call.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError`] on transport, status, or decode failures.
    async fn search(&self, query: &str, max_results: usize)
    -> Result<SearchResultSet, SearchError>;
}

/// Tavily search API client.
pub struct TavilyBackend {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

#[derive(Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    max_results: usize,
    search_depth: &'static str,
}

impl TavilyBackend {
    /// Creates a client for the public Tavily endpoint.
    #[must_use]
    pub fn new(api_key: impl Into<String>, request_timeout: Duration) -> Self {
        Self::with_endpoint(api_key, TAVILY_ENDPOINT, request_timeout)
    }

    /// Creates a client for a custom endpoint (proxies, tests).
    #[must_use]
    pub fn with_endpoint(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        request_timeout: Duration,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("deepsearch-rs/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
        }
    }
}

impl std::fmt::Debug for TavilyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TavilyBackend")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl SearchBackend for TavilyBackend {
    fn name(&self) -> &'static str {
        "tavily"
    }

    async fn search(
        &self,
        query: &str,
        max_results: usize,
    ) -> Result<SearchResultSet, SearchError> {
        let body = TavilyRequest {
            query,
            max_results,
            search_depth: "basic",
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| SearchError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let mut text = response.text().await.unwrap_or_default();
            if text.len() > MAX_ERROR_BODY_LEN {
                let mut cut = MAX_ERROR_BODY_LEN;
                while !text.is_char_boundary(cut) {
                    cut -= 1;
                }
                text.truncate(cut);
            }
            return Err(SearchError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let results: SearchResultSet = response
            .json()
            .await
            .map_err(|e| SearchError::Decode(e.to_string()))?;

        debug!(query, hits = results.len(), "tavily search complete");
        Ok(results)
    }
}
