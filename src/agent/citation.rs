//! APA citation sub-agent.
//!
//! Formats `Site. (Date). Title. URL` for every High or Medium rated source
//! that appears in the research data. Low rated sources are never cited.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use unicode_segmentation::UnicodeSegmentation;

use super::artifact::{AnalysisInput, NO_CITATIONS, RatedSource, parse_ratings};
use super::source_check::host_of;
use super::tool::FORMAT_CITATIONS;
use super::traits::{AgentResponse, SubAgent};
use crate::error::AgentError;
use crate::search::{SearchHit, SearchResultSet};

/// Maximum graphemes in a title derived from page content.
pub const MAX_TITLE_GRAPHEMES: usize = 120;

/// Formats a publication date as `YYYY, Month D`, or `YYYY` when only the
/// year is known. Returns `None` for anything unparseable.
#[must_use]
pub fn format_date(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|d| d.date_naive())
        .or_else(|_| DateTime::parse_from_rfc2822(raw).map(|d| d.date_naive()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .ok();
    if let Some(date) = date {
        return Some(date.format("%Y, %B %-d").to_string());
    }
    let is_year = raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit());
    is_year.then(|| raw.to_string())
}

/// Title for a hit: its own title, else the first sentence of its content.
#[must_use]
pub fn title_for(hit: &SearchHit) -> String {
    if let Some(title) = hit.title.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        return title.trim_end_matches('.').to_string();
    }
    let content = hit.content.trim();
    let first = content
        .unicode_sentences()
        .next()
        .map_or(content, str::trim)
        .trim_end_matches('.');
    if first.is_empty() {
        return host_of(&hit.url).unwrap_or_else(|| hit.url.clone());
    }
    truncate_graphemes(first, MAX_TITLE_GRAPHEMES)
}

fn truncate_graphemes(text: &str, max: usize) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= max {
        return text.to_string();
    }
    let mut out: String = graphemes[..max.saturating_sub(3)].concat();
    out.truncate(out.trim_end().len());
    out.push_str("...");
    out
}

/// Formats one APA citation.
#[must_use]
pub fn format_citation(hit: &SearchHit) -> String {
    let site = host_of(&hit.url).unwrap_or_else(|| hit.url.clone());
    let date = hit
        .published_date
        .as_deref()
        .and_then(format_date)
        .unwrap_or_else(|| "n.d.".to_string());
    format!("{site}. ({date}). {}. {}", title_for(hit), hit.url)
}

/// Citations for every citable source present in `data`.
#[must_use]
pub fn cite(data: &SearchResultSet, ratings: &[RatedSource]) -> Vec<String> {
    let mut cited: Vec<&str> = Vec::new();
    let mut out = Vec::new();
    for rated in ratings.iter().filter(|r| r.rating.is_citable()) {
        if cited.contains(&rated.source.as_str()) {
            continue;
        }
        if let Some(hit) = data.results.iter().find(|h| h.url == rated.source) {
            cited.push(&rated.source);
            out.push(format_citation(hit));
        }
    }
    out
}

/// Formats citations from raw data and ratings.
#[derive(Debug, Clone, Copy, Default)]
pub struct CitationAgent;

#[async_trait]
impl SubAgent for CitationAgent {
    fn name(&self) -> &'static str {
        FORMAT_CITATIONS
    }

    fn description(&self) -> &'static str {
        "Format citations in APA style for High/Medium sources."
    }

    async fn invoke(&self, payload: &str) -> Result<AgentResponse, AgentError> {
        let citations = AnalysisInput::parse(payload)
            .and_then(|input| {
                let data = SearchResultSet::parse(&input.raw_data).filter(|d| !d.is_empty())?;
                let ratings = parse_ratings(&input.ratings)?;
                Some(cite(&data, &ratings))
            })
            .unwrap_or_default();

        if citations.is_empty() {
            return Ok(AgentResponse::text(NO_CITATIONS));
        }
        let content =
            serde_json::to_string(&citations).map_err(|e| AgentError::ToolExecution {
                name: FORMAT_CITATIONS.to_string(),
                message: format!("serialization error: {e}"),
            })?;
        Ok(AgentResponse::text(content))
    }
}
