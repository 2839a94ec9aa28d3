//! Tool executor that dispatches tool calls to registered sub-agents.
//!
//! Maps tool names to [`AgentTool`]s. Registration order is preserved so
//! the exported [`ToolSet`] lists tools in pipeline order.

use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::warn;

use super::adapter::AgentTool;
use super::tool::{ToolCall, ToolResult, ToolSet};

/// Registry and dispatcher for research tools.
#[derive(Debug, Default)]
pub struct ToolExecutor {
    tools: Vec<AgentTool>,
    next_id: AtomicUsize,
}

impl ToolExecutor {
    /// Creates an empty executor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool, replacing any tool with the same name.
    pub fn register(&mut self, tool: AgentTool) {
        if let Some(existing) = self.tools.iter_mut().find(|t| t.name() == tool.name()) {
            *existing = tool;
        } else {
            self.tools.push(tool);
        }
    }

    /// Builder-style [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, tool: AgentTool) -> Self {
        self.register(tool);
        self
    }

    /// Registered tool names, in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(AgentTool::name).collect()
    }

    /// Definitions of every registered tool.
    #[must_use]
    pub fn tool_set(&self) -> ToolSet {
        ToolSet::new(self.tools.iter().map(|t| t.definition().clone()).collect())
    }

    /// Dispatches a tool call to the registered tool of the same name.
    pub async fn execute(&self, call: &ToolCall) -> ToolResult {
        match self.tools.iter().find(|t| t.name() == call.name) {
            Some(tool) => tool.call(call).await,
            None => {
                warn!(tool = %call.name, "call to unknown tool");
                ToolResult::error(&call.id, format!("tool '{}' failed: unknown tool", call.name))
            }
        }
    }

    /// Calls `name` with `payload`, assigning a fresh call id.
    pub async fn call(&self, name: &str, payload: &str) -> ToolResult {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let call = ToolCall::with_input(format!("call_{id}"), name, payload);
        self.execute(&call).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::traits::{AgentResponse, SubAgent};
    use crate::error::AgentError;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Fixed(&'static str, &'static str);

    #[async_trait]
    impl SubAgent for Fixed {
        fn name(&self) -> &'static str {
            self.0
        }
        fn description(&self) -> &'static str {
            "fixed output"
        }
        async fn invoke(&self, _payload: &str) -> Result<AgentResponse, AgentError> {
            Ok(AgentResponse::text(self.1))
        }
    }

    fn executor() -> ToolExecutor {
        ToolExecutor::new()
            .with(AgentTool::new(Arc::new(Fixed("a", "first"))))
            .with(AgentTool::new(Arc::new(Fixed("b", "second"))))
    }

    #[tokio::test]
    async fn test_dispatch_by_name() {
        let exec = executor();
        assert_eq!(exec.call("b", "x").await.content, "second");
        assert_eq!(exec.call("a", "x").await.content, "first");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result() {
        let result = executor().call("nope", "x").await;
        assert!(result.is_error);
        assert!(result.content.contains("unknown tool"));
    }

    #[tokio::test]
    async fn test_call_ids_are_unique() {
        let exec = executor();
        let r1 = exec.call("a", "x").await;
        let r2 = exec.call("a", "x").await;
        assert_ne!(r1.tool_call_id, r2.tool_call_id);
    }

    #[tokio::test]
    async fn test_register_replaces_same_name() {
        let mut exec = executor();
        exec.register(AgentTool::new(Arc::new(Fixed("a", "replaced"))));
        assert_eq!(exec.names(), vec!["a", "b"]);
        assert_eq!(exec.call("a", "x").await.content, "replaced");
    }

    #[test]
    fn test_tool_set_in_registration_order() {
        let set = executor().tool_set();
        let names: Vec<&str> = set.definitions().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
