//! LLM Gateway port
//!
//! Defines the raw request/response exchange with one language-model
//! provider. Adapters (OpenAI-compatible, Anthropic, ...) live in the
//! infrastructure layer and are selected once at startup; the agent loop
//! only ever sees the [`ModelClient`](crate::use_cases::model_client::ModelClient)
//! wrapped around one of them.

use async_trait::async_trait;
use patchpilot_domain::{Message, ToolDefinition};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during LLM gateway operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("Rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Timeout")]
    Timeout,

    #[error("Request failed ({status}): {message}")]
    RequestFailed { status: u16, message: String },

    #[error("Invalid response body: {0}")]
    InvalidResponse(String),

    #[error("Other error: {0}")]
    Other(String),
}

impl GatewayError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            GatewayError::RateLimited { .. }
                | GatewayError::ServerError { .. }
                | GatewayError::ConnectionError(_)
                | GatewayError::Timeout
        )
    }

    /// Server-requested delay before retrying, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            GatewayError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// A tool call as reported by the provider, arguments still unparsed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderToolCall {
    /// Provider-assigned id (may be empty)
    pub id: String,
    pub name: String,
    /// Raw JSON object text
    pub arguments: String,
}

/// One model reply as returned by a provider.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProviderReply {
    pub text: Option<String>,
    pub tool_calls: Vec<ProviderToolCall>,
}

impl ProviderReply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            tool_calls: Vec::new(),
        }
    }

    pub fn with_tool_call(
        mut self,
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        self.tool_calls.push(ProviderToolCall {
            id: id.into(),
            name: name.into(),
            arguments: arguments.into(),
        });
        self
    }

    /// Human-readable rendering used when the reply is rejected.
    pub fn render(&self) -> String {
        let mut parts = Vec::new();
        if let Some(text) = self.text.as_deref()
            && !text.trim().is_empty()
        {
            parts.push(text.trim().to_string());
        }
        for call in &self.tool_calls {
            parts.push(format!("[called {} with {}]", call.name, call.arguments));
        }
        parts.join("\n")
    }
}

/// Gateway for LLM communication
///
/// One request/response exchange per call; no retries, no validation.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Provider name for logs (e.g. "openrouter")
    fn provider_name(&self) -> &str;

    /// Model identifier sent with each request
    fn model_name(&self) -> &str;

    /// Send the conversation with the active tool schemas.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ProviderReply, GatewayError>;
}
