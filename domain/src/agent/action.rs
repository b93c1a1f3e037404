//! Model actions
//!
//! Every model turn is interpreted as exactly one [`Action`].

use crate::tool::{ToolCall, ToolDefinition, ToolParameter};
use serde::{Deserialize, Serialize};

/// Name under which finalize is exposed to native tool-calling providers.
pub const FINALIZE_TOOL: &str = "finalize";

/// What the model asked for on one turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Plain narration; no tool runs.
    Message { text: String },
    /// Tool calls to execute in order.
    ToolCalls { calls: Vec<ToolCall> },
    /// Declaration that the phase is over.
    Finalize { summary: String, done: bool },
}

impl Action {
    pub fn message(text: impl Into<String>) -> Self {
        Action::Message { text: text.into() }
    }

    pub fn tool_calls(calls: Vec<ToolCall>) -> Self {
        Action::ToolCalls { calls }
    }

    pub fn finalize(summary: impl Into<String>, done: bool) -> Self {
        Action::Finalize {
            summary: summary.into(),
            done,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Message { .. } => "message",
            Action::ToolCalls { .. } => "tool_calls",
            Action::Finalize { .. } => "finalize",
        }
    }
}

/// Tool definition for finalize, included in every role's schema set.
pub fn finalize_definition() -> ToolDefinition {
    ToolDefinition::new(
        FINALIZE_TOOL,
        "Declare the phase finished. Set done=true only when every plan step is completed or \
         legitimately stuck; done=false gives up and keeps progress so far.",
    )
    .with_parameter(ToolParameter::new(
        "summary",
        "What was accomplished, or the commit message for the change",
        true,
    ))
    .with_parameter(
        ToolParameter::new("done", "Whether the phase goal was reached", true).with_type("boolean"),
    )
}
