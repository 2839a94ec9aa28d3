//! Source credibility sub-agent.
//!
//! Ratings come from a fixed rule table over the URL host, so the same
//! source always gets the same rating regardless of the model in use.

use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

use super::artifact::{NO_SOURCES, RatedSource};
use super::tool::SOURCE_CHECK;
use super::traits::{AgentResponse, SubAgent};
use crate::core::SourceRating;
use crate::error::AgentError;
use crate::search::SearchResultSet;

/// Major news and scholarly publishers.
const HIGH_DOMAINS: &[&str] = &[
    "apnews.com",
    "arxiv.org",
    "bbc.co.uk",
    "bbc.com",
    "bloomberg.com",
    "cnbc.com",
    "economist.com",
    "ft.com",
    "ieee.org",
    "jstor.org",
    "nature.com",
    "nejm.org",
    "npr.org",
    "nytimes.com",
    "reuters.com",
    "science.org",
    "sciencedirect.com",
    "springer.com",
    "thelancet.com",
    "theguardian.com",
    "washingtonpost.com",
    "wsj.com",
];

/// Encyclopedic, reference and industry publications.
const MEDIUM_DOMAINS: &[&str] = &[
    "arstechnica.com",
    "britannica.com",
    "caranddriver.com",
    "cnet.com",
    "consumerreports.org",
    "edmunds.com",
    "forbes.com",
    "iea.org",
    "investopedia.com",
    "kbb.com",
    "motortrend.com",
    "statista.com",
    "techcrunch.com",
    "theverge.com",
    "wikipedia.org",
    "wired.com",
];

/// Lowercased host of `url` without a leading `www.`.
#[must_use]
pub fn host_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url.trim()).ok()?;
    let host = parsed.host_str()?.to_lowercase();
    Some(host.strip_prefix("www.").map_or_else(|| host.clone(), str::to_string))
}

fn matches_domain(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

/// Rates a single URL.
#[must_use]
pub fn rate_url(url: &str) -> SourceRating {
    let Some(host) = host_of(url) else {
        return SourceRating::Low;
    };
    let labels: Vec<&str> = host.split('.').collect();
    let tld = labels.last().copied().unwrap_or_default();

    if matches!(tld, "edu" | "gov" | "mil") {
        return SourceRating::High;
    }
    // Country-coded academic and government zones: ac.uk, gov.au, edu.cn.
    if labels.len() >= 2 && tld.len() == 2 {
        let second = labels[labels.len() - 2];
        if matches!(second, "ac" | "gov" | "edu") {
            return SourceRating::High;
        }
    }
    if HIGH_DOMAINS.iter().any(|d| matches_domain(&host, d)) {
        return SourceRating::High;
    }
    if tld == "int" || MEDIUM_DOMAINS.iter().any(|d| matches_domain(&host, d)) {
        return SourceRating::Medium;
    }
    SourceRating::Low
}

/// Rates every distinct URL in `data`, in first-seen order.
#[must_use]
pub fn rate_sources(data: &SearchResultSet) -> Vec<RatedSource> {
    let mut rated: Vec<RatedSource> = Vec::with_capacity(data.len());
    for hit in &data.results {
        if hit.url.trim().is_empty() || rated.iter().any(|r| r.source == hit.url) {
            continue;
        }
        rated.push(RatedSource {
            source: hit.url.clone(),
            rating: rate_url(&hit.url),
        });
    }
    rated
}

/// Rates the sources in a raw data payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct SourceCheckerAgent;

#[async_trait]
impl SubAgent for SourceCheckerAgent {
    fn name(&self) -> &'static str {
        SOURCE_CHECK
    }

    fn description(&self) -> &'static str {
        "Rate sources as High, Medium, or Low."
    }

    async fn invoke(&self, payload: &str) -> Result<AgentResponse, AgentError> {
        let rated = SearchResultSet::parse(payload)
            .map(|data| rate_sources(&data))
            .unwrap_or_default();
        if rated.is_empty() {
            return Ok(AgentResponse::text(NO_SOURCES));
        }
        debug!(sources = rated.len(), "sources rated");
        let content = serde_json::to_string(&rated).map_err(|e| AgentError::ToolExecution {
            name: SOURCE_CHECK.to_string(),
            message: format!("serialization error: {e}"),
        })?;
        Ok(AgentResponse::text(content))
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::artifact::parse_ratings;
    use crate::search::{SearchHit, fallback_results};
    use test_case::test_case;

    #[test_case("https://climate.mit.edu/ev" => SourceRating::High; "edu")]
    #[test_case("https://www.epa.gov" => SourceRating::High; "gov")]
    #[test_case("https://www.army.mil/news" => SourceRating::High; "mil")]
    #[test_case("https://www.ox.ac.uk/research" => SourceRating::High; "academic country zone")]
    #[test_case("https://www.gov.uk/ev" => SourceRating::High; "bare government zone")]
    #[test_case("https://data.gov.au/ev" => SourceRating::High; "government country zone")]
    #[test_case("https://www.reuters.com/business" => SourceRating::High; "major news")]
    #[test_case("https://www.nature.com/articles/x" => SourceRating::High; "scholarly")]
    #[test_case("https://en.wikipedia.org/wiki/EV" => SourceRating::Medium; "encyclopedic subdomain")]
    #[test_case("https://www.edmunds.com" => SourceRating::Medium; "industry")]
    #[test_case("https://www.who.int/news" => SourceRating::Medium; "international org")]
    #[test_case("https://ev-lectron.com" => SourceRating::Low; "vendor")]
    #[test_case("https://myevblog.wordpress.com" => SourceRating::Low; "blog")]
    #[test_case("https://notreuters.com" => SourceRating::Low; "lookalike domain")]
    #[test_case("not a url" => SourceRating::Low; "malformed")]
    fn test_rate_url(url: &str) -> SourceRating {
        rate_url(url)
    }

    #[test]
    fn test_host_of_strips_www() {
        assert_eq!(host_of("https://WWW.Edmunds.com/x").as_deref(), Some("edmunds.com"));
        assert!(host_of("nope").is_none());
    }

    #[tokio::test]
    async fn test_invoke_rates_fallback_data() {
        let out = SourceCheckerAgent
            .invoke(&fallback_results().to_payload())
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        let ratings = parse_ratings(&out.content).unwrap_or_default();
        assert_eq!(ratings.len(), 5);
        assert_eq!(ratings[0].rating, SourceRating::Medium);
        assert_eq!(ratings[2].rating, SourceRating::Low);
        assert_eq!(ratings[3].rating, SourceRating::High);
        assert!(out.content.contains(r#""rating":"High""#));
    }

    #[tokio::test]
    async fn test_invoke_dedupes_urls() {
        let data = SearchResultSet {
            results: vec![
                SearchHit::new("https://a.edu", "1"),
                SearchHit::new("https://a.edu", "2"),
            ],
        };
        let out = SourceCheckerAgent
            .invoke(&data.to_payload())
            .await
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(parse_ratings(&out.content).map(|r| r.len()), Some(1));
    }

    #[test_case(""; "empty")]
    #[test_case("Search failed: Network unreachable"; "sentinel")]
    #[test_case(r#"{"results":[]}"#; "no hits")]
    #[test_case("{broken"; "malformed")]
    fn test_invoke_without_sources(payload: &str) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap_or_else(|e| panic!("{e}"));
        let out = rt
            .block_on(SourceCheckerAgent.invoke(payload))
            .unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(out.content, NO_SOURCES);
    }
}
