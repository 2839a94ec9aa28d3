//! Tool type definitions for sub-agent function-calling.
//!
//! Provides provider-agnostic types for tool definitions, calls, and results.
//! Every research sub-agent is reachable as a tool under one of the names
//! below; the orchestrator invokes them through the
//! [`ToolExecutor`](super::executor::ToolExecutor).

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::message::TokenUsage;

/// Tool name of the planning sub-agent.
pub const CREATE_PLAN: &str = "create_plan";
/// Tool name of the data gathering sub-agent.
pub const DATA_GATHER: &str = "data_gather";
/// Tool name of the source rating sub-agent.
pub const SOURCE_CHECK: &str = "source_check";
/// Tool name of the reflection sub-agent.
pub const REFLECT_DATA: &str = "reflect_data";
/// Tool name of the citation sub-agent.
pub const FORMAT_CITATIONS: &str = "format_citations";

/// A tool definition that can be sent to an LLM for function-calling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name (must match a registration in the executor).
    pub name: String,
    /// Human-readable description of what the tool does.
    pub description: String,
    /// JSON Schema object describing the tool's parameters.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Definition for a tool taking a single string payload under `input`.
    #[must_use]
    pub fn with_input(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "input": {
                        "type": "string",
                        "description": "Payload passed to the tool (plain text or JSON)."
                    }
                },
                "required": ["input"],
                "additionalProperties": false
            }),
        }
    }
}

/// A tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique identifier for this call.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON-encoded arguments for the tool.
    pub arguments: String,
}

impl ToolCall {
    /// Builds a call whose arguments wrap `payload` as `{"input": payload}`.
    #[must_use]
    pub fn with_input(id: impl Into<String>, name: &str, payload: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            arguments: json!({ "input": payload }).to_string(),
        }
    }
}

/// The result of executing a tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// ID of the tool call this result corresponds to.
    pub tool_call_id: String,
    /// Result content (sub-agent payload on success, error message on failure).
    pub content: String,
    /// Whether this result represents an error.
    pub is_error: bool,
    /// Tokens spent by the sub-agent, if it called a model.
    #[serde(default)]
    pub usage: TokenUsage,
}

impl ToolResult {
    /// Builds an error result.
    #[must_use]
    pub fn error(tool_call_id: &str, message: impl Into<String>) -> Self {
        Self {
            tool_call_id: tool_call_id.to_string(),
            content: message.into(),
            is_error: true,
            usage: TokenUsage::default(),
        }
    }
}

/// A set of tool definitions.
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    definitions: Vec<ToolDefinition>,
}

impl ToolSet {
    /// Creates a set from definitions, in the given order.
    #[must_use]
    pub const fn new(definitions: Vec<ToolDefinition>) -> Self {
        Self { definitions }
    }

    /// Returns the tool definitions in this set.
    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Looks up a definition by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Returns `true` if this set contains no tools.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Returns the number of tools in this set.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }
}
