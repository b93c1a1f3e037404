//! Model providers
//!
//! One [`LlmGateway`](patchpilot_application::LlmGateway) implementation per
//! wire format, selected once at startup by [`create_gateway`]:
//!
//! | Provider | Adapter | Default base URL |
//! |----------|---------|------------------|
//! | `openai` | [`OpenAiGateway`] | `https://api.openai.com/v1` |
//! | `openrouter` | [`OpenAiGateway`] | `https://openrouter.ai/api/v1` |
//! | `anthropic` | [`AnthropicGateway`] | `https://api.anthropic.com/v1` |

mod anthropic;
mod factory;
mod http;
mod openai;

pub use anthropic::AnthropicGateway;
pub use factory::{ProviderSetupError, create_gateway, create_gateway_with_key};
pub use openai::OpenAiGateway;

use patchpilot_domain::{Message, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::str::FromStr;

/// Supported provider backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    OpenAi,
    OpenRouter,
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::OpenRouter => "openrouter",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    pub fn default_base_url(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "https://api.openai.com/v1",
            ProviderKind::OpenRouter => "https://openrouter.ai/api/v1",
            ProviderKind::Anthropic => "https://api.anthropic.com/v1",
        }
    }

    pub fn default_api_key_env(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "OPENAI_API_KEY",
            ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
            ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(ProviderKind::OpenAi),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            other => Err(format!(
                "unknown provider '{}'; expected openai, openrouter or anthropic",
                other
            )),
        }
    }
}

/// Which tool-call ids can be sent as native call/result pairs.
///
/// Compaction may evict an assistant turn while keeping the tool results
/// that answered it, or the reverse. Providers reject unpaired native
/// blocks, so unpaired halves are rendered as plain text instead.
pub(crate) struct ToolPairing {
    native: HashSet<String>,
}

impl ToolPairing {
    pub(crate) fn new(messages: &[Message]) -> Self {
        let answered: HashSet<&str> = messages
            .iter()
            .filter(|m| m.role == Role::Tool)
            .filter_map(|m| m.answered_call_id())
            .collect();

        let native = messages
            .iter()
            .filter(|m| m.role == Role::Assistant && !m.tool_calls.is_empty())
            .filter(|m| m.tool_calls.iter().all(|c| answered.contains(c.id.as_str())))
            .flat_map(|m| m.tool_calls.iter().map(|c| c.id.clone()))
            .collect();

        Self { native }
    }

    /// Whether this assistant turn's calls go out as native tool calls.
    pub(crate) fn assistant_is_native(&self, message: &Message) -> bool {
        !message.tool_calls.is_empty()
            && message.tool_calls.iter().all(|c| self.native.contains(&c.id))
    }

    /// Whether this tool turn goes out as a native tool result.
    pub(crate) fn result_is_native(&self, message: &Message) -> bool {
        message
            .answered_call_id()
            .is_some_and(|id| self.native.contains(id))
    }
}

/// Text form of an assistant turn whose calls cannot be sent natively.
pub(crate) fn assistant_as_text(message: &Message) -> String {
    let mut parts = Vec::new();
    if !message.content.trim().is_empty() {
        parts.push(message.content.clone());
    }
    for call in &message.tool_calls {
        parts.push(format!("[called {} with {}]", call.tool_name, call.arguments_json()));
    }
    parts.join("\n")
}

/// Text form of a tool turn whose call is not in the request.
pub(crate) fn tool_result_as_text(message: &Message) -> String {
    let name = message
        .tool_results
        .first()
        .map(|r| r.tool_name.as_str())
        .unwrap_or("tool");
    format!("Result of {}:\n{}", name, message.content)
}
