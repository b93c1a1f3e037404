//! OpenAI-compatible chat completions (OpenAI, OpenRouter)

use super::http::{build_client, post_json};
use super::{ProviderKind, ToolPairing, assistant_as_text, tool_result_as_text};
use crate::tools::JsonSchemaToolConverter;
use async_trait::async_trait;
use patchpilot_application::{GatewayError, LlmGateway, ProviderReply, ProviderToolCall};
use patchpilot_domain::{Message, Role, ToolDefinition};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

pub struct OpenAiGateway {
    kind: ProviderKind,
    model: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiGateway {
    pub fn new(
        kind: ProviderKind,
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            kind,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client: build_client(timeout)?,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }

    /// Build the request body for the API
    pub(crate) fn build_request_body(&self, messages: &[Message], tools: &[ToolDefinition]) -> Value {
        let pairing = ToolPairing::new(messages);
        let wire: Vec<Value> = messages
            .iter()
            .map(|m| message_to_openai(m, &pairing))
            .collect();

        let mut body = json!({
            "model": self.model,
            "messages": wire,
        });
        if !tools.is_empty() {
            let tools: Vec<Value> = tools.iter().map(JsonSchemaToolConverter::to_openai).collect();
            body["tools"] = json!(tools);
        }
        body
    }
}

fn message_to_openai(message: &Message, pairing: &ToolPairing) -> Value {
    match message.role {
        Role::System => json!({ "role": "system", "content": message.content }),
        Role::User => json!({ "role": "user", "content": message.content }),
        Role::Assistant if pairing.assistant_is_native(message) => {
            let calls: Vec<Value> = message
                .tool_calls
                .iter()
                .map(|c| {
                    json!({
                        "id": c.id,
                        "type": "function",
                        "function": { "name": c.tool_name, "arguments": c.arguments_json() },
                    })
                })
                .collect();
            // Some compatible APIs require `content` even alongside tool calls
            let content = if message.content.is_empty() {
                Value::Null
            } else {
                json!(message.content)
            };
            json!({ "role": "assistant", "content": content, "tool_calls": calls })
        }
        Role::Assistant => json!({ "role": "assistant", "content": assistant_as_text(message) }),
        Role::Tool if pairing.result_is_native(message) => json!({
            "role": "tool",
            "tool_call_id": message.answered_call_id().unwrap_or_default(),
            "content": message.content,
        }),
        Role::Tool => json!({ "role": "user", "content": tool_result_as_text(message) }),
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: String,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

/// Parse a chat completions response body.
pub(crate) fn parse_response(body: Value) -> Result<ProviderReply, GatewayError> {
    let response: ChatResponse =
        serde_json::from_value(body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;
    let Some(message) = response.choices.into_iter().next().and_then(|c| c.message) else {
        return Err(GatewayError::InvalidResponse("response has no choices".into()));
    };

    Ok(ProviderReply {
        text: message.content.filter(|t| !t.trim().is_empty()),
        tool_calls: message
            .tool_calls
            .into_iter()
            .map(|c| ProviderToolCall {
                id: c.id,
                name: c.function.name,
                arguments: c.function.arguments,
            })
            .collect(),
    })
}

#[async_trait]
impl LlmGateway for OpenAiGateway {
    fn provider_name(&self) -> &str {
        self.kind.as_str()
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ProviderReply, GatewayError> {
        let body = self.build_request_body(messages, tools);
        let headers = [("Authorization", format!("Bearer {}", self.api_key))];
        let response = post_json(&self.client, &self.endpoint(), &headers, &body).await?;
        parse_response(response)
    }
}
