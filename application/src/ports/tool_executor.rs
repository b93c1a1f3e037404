//! Tool Executor port
//!
//! Defines the interface for executing workspace tools (shell, files,
//! search, patch, notes). Plan tools are not part of this port: the agent
//! loop executes them against its own plan store.

use async_trait::async_trait;
use patchpilot_domain::{ToolCall, ToolDefinition, ToolResult, ToolSpec};

/// Port for tool execution
///
/// Implementations dispatch through a registry built at construction and
/// never panic or raise: every failure comes back inside the [`ToolResult`].
/// An unregistered name yields an `UNKNOWN_TOOL` result.
#[async_trait]
pub trait ToolExecutorPort: Send + Sync {
    /// Get the definitions of all available tools
    fn tool_spec(&self) -> &ToolSpec;

    /// Check if a tool is available
    fn has_tool(&self, name: &str) -> bool {
        self.tool_spec().contains(name)
    }

    /// Get the definition of a specific tool
    fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tool_spec().get(name)
    }

    /// Get names of all available tools
    fn available_tools(&self) -> Vec<&str> {
        self.tool_spec().names()
    }

    /// Execute a tool call
    async fn execute(&self, call: &ToolCall) -> ToolResult;
}
