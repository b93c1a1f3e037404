//! Session domain entities

use crate::tool::{ToolCall, ToolResult};
use serde::{Deserialize, Serialize};

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message in a conversation (Entity)
///
/// Messages are immutable once appended to a
/// [`ConversationHistory`](super::history::ConversationHistory); the history
/// assigns the sequence `index` at append time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub index: u64,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_results: Vec<ToolResult>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub protected: bool,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            index: 0,
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_results: Vec::new(),
            protected: false,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Assistant turn that requests tool calls.
    pub fn assistant_with_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        let mut message = Self::new(Role::Assistant, content);
        message.tool_calls = calls;
        message
    }

    /// Tool turn carrying exactly one result.
    pub fn tool(result: ToolResult) -> Self {
        let mut message = Self::new(Role::Tool, result.render());
        message.tool_results.push(result);
        message
    }

    /// Pin this message against compaction.
    pub fn protected(mut self) -> Self {
        self.protected = true;
        self
    }

    /// Whether compaction must never evict this message.
    pub fn is_protected(&self) -> bool {
        self.role == Role::System || self.protected
    }

    /// Character length counted against the history budget.
    pub fn char_len(&self) -> usize {
        let calls: usize = self
            .tool_calls
            .iter()
            .map(|c| c.tool_name.chars().count() + c.arguments_json().chars().count())
            .sum();
        self.content.chars().count() + calls
    }

    /// Call id answered by this tool message, if any.
    pub fn answered_call_id(&self) -> Option<&str> {
        self.tool_results.first().map(|r| r.call_id.as_str())
    }
}
