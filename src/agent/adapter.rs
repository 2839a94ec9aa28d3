//! Exposes a [`SubAgent`] as a callable tool.
//!
//! The adapter only binds a name, description and parameter schema to the
//! sub-agent and marshals arguments. It never alters the payload the
//! sub-agent returns.

use std::sync::Arc;

use tracing::debug;

use super::tool::{ToolCall, ToolDefinition, ToolResult};
use super::traits::SubAgent;
use crate::error::AgentError;

/// Maximum raw byte length of tool argument JSON.
pub const MAX_TOOL_ARGS_LEN: usize = 100_000;

/// A sub-agent bound to a tool definition.
#[derive(Clone)]
pub struct AgentTool {
    agent: Arc<dyn SubAgent>,
    definition: ToolDefinition,
}

impl AgentTool {
    /// Wraps a sub-agent under its own name and description.
    #[must_use]
    pub fn new(agent: Arc<dyn SubAgent>) -> Self {
        let definition = ToolDefinition::with_input(agent.name(), agent.description());
        Self { agent, definition }
    }

    /// Tool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.definition.name
    }

    /// Tool definition for function-calling interfaces.
    #[must_use]
    pub const fn definition(&self) -> &ToolDefinition {
        &self.definition
    }

    /// Extracts the payload from raw tool arguments.
    ///
    /// Accepts `{"input": "..."}` (a non-string `input` value is passed on
    /// as compact JSON), a bare JSON string, or arbitrary non-JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ToolExecution`] for oversized arguments or a
    /// JSON value that carries no `input`.
    pub fn parse_arguments(&self, arguments: &str) -> Result<String, AgentError> {
        if arguments.len() > MAX_TOOL_ARGS_LEN {
            return Err(self.error(format!(
                "tool arguments too large ({} bytes, max {MAX_TOOL_ARGS_LEN})",
                arguments.len()
            )));
        }

        match serde_json::from_str::<serde_json::Value>(arguments) {
            Ok(serde_json::Value::Object(mut map)) => match map.remove("input") {
                Some(serde_json::Value::String(s)) => Ok(s),
                Some(other) => Ok(other.to_string()),
                None => Err(self.error("missing 'input' argument".to_string())),
            },
            Ok(serde_json::Value::String(s)) => Ok(s),
            Ok(_) => Err(self.error("arguments must be an object or a string".to_string())),
            Err(_) => Ok(arguments.to_string()),
        }
    }

    /// Runs the sub-agent for one call.
    ///
    /// Failures are reported as an error [`ToolResult`], never as a panic or
    /// a dropped call.
    pub async fn call(&self, call: &ToolCall) -> ToolResult {
        let payload = match self.parse_arguments(&call.arguments) {
            Ok(p) => p,
            Err(e) => return ToolResult::error(&call.id, e.to_string()),
        };

        debug!(tool = self.name(), call_id = %call.id, bytes = payload.len(), "invoking tool");

        match self.agent.invoke(&payload).await {
            Ok(response) => ToolResult {
                tool_call_id: call.id.clone(),
                content: response.content,
                is_error: false,
                usage: response.usage,
            },
            Err(e) => ToolResult::error(&call.id, e.to_string()),
        }
    }

    fn error(&self, message: String) -> AgentError {
        AgentError::ToolExecution {
            name: self.definition.name.clone(),
            message,
        }
    }
}

impl std::fmt::Debug for AgentTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentTool")
            .field("name", &self.definition.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::agent::traits::AgentResponse;
    use async_trait::async_trait;

    struct Upper;

    #[async_trait]
    impl SubAgent for Upper {
        fn name(&self) -> &'static str {
            "upper"
        }
        fn description(&self) -> &'static str {
            "Uppercases the payload"
        }
        async fn invoke(&self, payload: &str) -> Result<AgentResponse, AgentError> {
            if payload == "boom" {
                return Err(AgentError::Orchestration {
                    message: "exploded".to_string(),
                });
            }
            Ok(AgentResponse::text(payload.to_uppercase()))
        }
    }

    fn tool() -> AgentTool {
        AgentTool::new(Arc::new(Upper))
    }

    #[test]
    fn test_definition_binds_name_and_description() {
        let t = tool();
        assert_eq!(t.name(), "upper");
        assert_eq!(t.definition().description, "Uppercases the payload");
    }

    #[test]
    fn test_parse_input_object() {
        assert_eq!(
            tool().parse_arguments(r#"{"input":"abc"}"#).ok().as_deref(),
            Some("abc")
        );
    }

    #[test]
    fn test_parse_structured_input_is_reserialized() {
        let payload = tool()
            .parse_arguments(r#"{"input":{"queries":["a","b"]}}"#)
            .unwrap_or_default();
        assert_eq!(payload, r#"{"queries":["a","b"]}"#);
    }

    #[test]
    fn test_parse_bare_string_and_plain_text() {
        assert_eq!(tool().parse_arguments(r#""ev cars""#).ok().as_deref(), Some("ev cars"));
        assert_eq!(
            tool().parse_arguments("ev vs gas cars").ok().as_deref(),
            Some("ev vs gas cars")
        );
    }

    #[test]
    fn test_parse_rejects_object_without_input() {
        assert!(matches!(
            tool().parse_arguments(r#"{"query":"x"}"#),
            Err(AgentError::ToolExecution { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_oversized_arguments() {
        let big = "x".repeat(MAX_TOOL_ARGS_LEN + 1);
        assert!(matches!(
            tool().parse_arguments(&big),
            Err(AgentError::ToolExecution { .. })
        ));
    }

    #[tokio::test]
    async fn test_call_returns_payload_unchanged() {
        let result = tool().call(&ToolCall::with_input("c1", "upper", "abc")).await;
        assert!(!result.is_error);
        assert_eq!(result.content, "ABC");
        assert_eq!(result.tool_call_id, "c1");
    }

    #[tokio::test]
    async fn test_call_maps_agent_error() {
        let result = tool().call(&ToolCall::with_input("c2", "upper", "boom")).await;
        assert!(result.is_error);
        assert!(result.content.contains("exploded"));
    }
}
