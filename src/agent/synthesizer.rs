//! Synthesizer agent for the final answer.
//!
//! Takes everything gathered across research cycles and produces one
//! conversational response. The reply is cleaned so no internal artifact
//! reaches the user, and references are appended if the model left them out.

use std::fmt::Write;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use super::config::AgentConfig;
use super::prompt::{SynthesisContext, build_synthesizer_prompt};
use super::provider::LlmProvider;
use super::traits::{Agent, AgentResponse};
use crate::error::AgentError;

/// Heading of the appended references section.
pub const REFERENCES_HEADING: &str = "References";

fn fenced_block_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"(?s)```[^\n]*\n.*?```") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern is valid"),
    })
}

fn blank_run_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| match Regex::new(r"\n{3,}") {
        Ok(re) => re,
        Err(_) => unreachable!("static regex pattern is valid"),
    })
}

/// Agent that synthesizes research into a final response.
pub struct SynthesizerAgent {
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl SynthesizerAgent {
    /// Creates a new synthesizer agent with the given configuration and system prompt.
    #[must_use]
    pub fn new(config: &AgentConfig, system_prompt: String) -> Self {
        Self {
            model: config.synthesizer_model.clone(),
            max_tokens: config.synthesizer_max_tokens,
            system_prompt,
        }
    }

    /// Produces the cleaned final response.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError`] if the model call fails or yields no usable text.
    pub async fn synthesize(
        &self,
        provider: &dyn LlmProvider,
        ctx: &SynthesisContext<'_>,
    ) -> Result<AgentResponse, AgentError> {
        let mut response = self.execute(provider, &build_synthesizer_prompt(ctx)).await?;
        let cleaned = finalize_response(&response.content, ctx.citations);
        if cleaned.is_empty() {
            return Err(AgentError::ResponseParse {
                message: "synthesizer returned no usable text".to_string(),
                content: response.content,
            });
        }
        debug!(chars = cleaned.len(), "synthesis complete");
        response.content = cleaned;
        Ok(response)
    }
}

/// Strips fenced blocks and bare JSON, then appends references when none
/// were cited.
#[must_use]
pub fn finalize_response(text: &str, citations: &[String]) -> String {
    let stripped = fenced_block_regex().replace_all(text, "");
    let collapsed = blank_run_regex().replace_all(stripped.trim(), "\n\n");
    let without_json = drop_json_artifacts(&collapsed);
    let mut out = blank_run_regex()
        .replace_all(without_json.trim(), "\n\n")
        .into_owned();
    if out.is_empty() || citations.is_empty() || cites_any(&out, citations) {
        return out;
    }

    let _ = write!(out, "\n\n{REFERENCES_HEADING}\n");
    for citation in citations {
        let _ = write!(out, "\n- {citation}");
    }
    out
}

/// `true` for text that is a JSON object or array on its own.
fn is_json_artifact(text: &str) -> bool {
    let t = text.trim();
    (t.starts_with('{') || t.starts_with('['))
        && serde_json::from_str::<serde_json::Value>(t)
            .is_ok_and(|v| v.is_object() || v.is_array())
}

/// Removes paragraphs, then single lines, that are raw JSON.
fn drop_json_artifacts(text: &str) -> String {
    text.split("\n\n")
        .filter(|para| !is_json_artifact(para))
        .map(|para| {
            para.lines()
                .filter(|line| !is_json_artifact(line))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// `true` if `text` mentions any citation or its URL.
fn cites_any(text: &str, citations: &[String]) -> bool {
    citations.iter().any(|c| {
        text.contains(c.as_str())
            || c.rsplit(' ')
                .next()
                .is_some_and(|url| url.starts_with("http") && text.contains(url))
    })
}

impl std::fmt::Debug for SynthesizerAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesizerAgent")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl Agent for SynthesizerAgent {
    fn name(&self) -> &'static str {
        "synthesizer"
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    fn temperature(&self) -> f32 {
        0.3
    }

    fn max_tokens(&self) -> u32 {
        self.max_tokens
    }
}
