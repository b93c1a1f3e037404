//! Anthropic Messages API

use super::http::{build_client, post_json};
use super::{ToolPairing, assistant_as_text, tool_result_as_text};
use crate::tools::JsonSchemaToolConverter;
use async_trait::async_trait;
use patchpilot_application::{GatewayError, LlmGateway, ProviderReply, ProviderToolCall};
use patchpilot_domain::{Message, Role, ToolDefinition};
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 4096;

pub struct AnthropicGateway {
    model: String,
    base_url: String,
    api_key: String,
    max_tokens: u32,
    client: reqwest::Client,
}

impl AnthropicGateway {
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, GatewayError> {
        Ok(Self {
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            client: build_client(timeout)?,
        })
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    fn endpoint(&self) -> String {
        format!("{}/messages", self.base_url)
    }

    /// Build the request body for the API.
    ///
    /// System messages are joined into the top-level `system` field and
    /// consecutive turns of the same role are merged, since the API requires
    /// strictly alternating user/assistant turns.
    pub(crate) fn build_request_body(&self, messages: &[Message], tools: &[ToolDefinition]) -> Value {
        let pairing = ToolPairing::new(messages);

        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let mut turns: Vec<(&'static str, Vec<Value>)> = Vec::new();
        for message in messages.iter().filter(|m| m.role != Role::System) {
            let (role, blocks) = message_to_blocks(message, &pairing);
            if blocks.is_empty() {
                continue;
            }
            match turns.last_mut() {
                Some((last_role, last_blocks)) if *last_role == role => last_blocks.extend(blocks),
                _ => turns.push((role, blocks)),
            }
        }

        let wire: Vec<Value> = turns
            .into_iter()
            .map(|(role, content)| json!({ "role": role, "content": content }))
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "messages": wire,
        });
        if !system.is_empty() {
            body["system"] = json!(system.join("\n\n"));
        }
        if !tools.is_empty() {
            let tools: Vec<Value> = tools
                .iter()
                .map(JsonSchemaToolConverter::to_anthropic)
                .collect();
            body["tools"] = json!(tools);
        }
        body
    }
}

fn text_block(text: &str) -> Option<Value> {
    (!text.trim().is_empty()).then(|| json!({ "type": "text", "text": text }))
}

fn message_to_blocks(message: &Message, pairing: &ToolPairing) -> (&'static str, Vec<Value>) {
    match message.role {
        Role::Assistant if pairing.assistant_is_native(message) => {
            let mut blocks: Vec<Value> = text_block(&message.content).into_iter().collect();
            for call in &message.tool_calls {
                let input: serde_json::Map<String, Value> = call
                    .arguments
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect();
                blocks.push(json!({
                    "type": "tool_use",
                    "id": call.id,
                    "name": call.tool_name,
                    "input": input,
                }));
            }
            ("assistant", blocks)
        }
        Role::Assistant => (
            "assistant",
            text_block(&assistant_as_text(message)).into_iter().collect(),
        ),
        Role::Tool if pairing.result_is_native(message) => {
            let is_error = message.tool_results.first().is_some_and(|r| !r.is_success());
            (
                "user",
                vec![json!({
                    "type": "tool_result",
                    "tool_use_id": message.answered_call_id().unwrap_or_default(),
                    "content": message.content,
                    "is_error": is_error,
                })],
            )
        }
        Role::Tool => (
            "user",
            text_block(&tool_result_as_text(message)).into_iter().collect(),
        ),
        Role::User | Role::System => ("user", text_block(&message.content).into_iter().collect()),
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    #[serde(other)]
    Other,
}

/// Parse a Messages API response body.
pub(crate) fn parse_response(body: Value) -> Result<ProviderReply, GatewayError> {
    let response: MessagesResponse =
        serde_json::from_value(body).map_err(|e| GatewayError::InvalidResponse(e.to_string()))?;

    let mut texts = Vec::new();
    let mut tool_calls = Vec::new();
    for block in response.content {
        match block {
            ContentBlock::Text { text } => texts.push(text),
            ContentBlock::ToolUse { id, name, input } => {
                let arguments = if input.is_null() {
                    "{}".to_string()
                } else {
                    input.to_string()
                };
                tool_calls.push(ProviderToolCall {
                    id,
                    name,
                    arguments,
                });
            }
            ContentBlock::Other => {}
        }
    }

    let text = texts.join("\n");
    Ok(ProviderReply {
        text: (!text.trim().is_empty()).then_some(text),
        tool_calls,
    })
}

#[async_trait]
impl LlmGateway for AnthropicGateway {
    fn provider_name(&self) -> &str {
        "anthropic"
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
        let headers = [
            ("x-api-key", self.api_key.clone()),
            ("anthropic-version", ANTHROPIC_VERSION.to_string()),
        ];
        let response = post_json(&self.client, &self.endpoint(), &headers, &body).await?;
        parse_response(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchpilot_domain::{ToolCall, ToolError, ToolResult};

    fn gateway() -> AnthropicGateway {
        AnthropicGateway::new(
            "claude-sonnet-4-5",
            "https://api.anthropic.com/v1",
            "key",
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_request_body_merges_turns() {
        let calls = vec![
            ToolCall::new("read_file").with_id("t1").with_arg("path", "a.rs"),
            ToolCall::new("shell").with_id("t2").with_arg("command", "false"),
        ];
        let failed = ToolResult::failure("shell", ToolError::execution_failed("exit 1"))
            .with_call_id("t2")
            .with_output("$ false\n[exit 1]\n");
        let messages = vec![
            Message::system("rules"),
            Message::user("task"),
            Message::assistant_with_calls("Reading.", calls),
            Message::tool(ToolResult::success("read_file", "fn a() {}").with_call_id("t1")),
            Message::tool(failed),
            Message::user("Turn 2 of 10"),
        ];

        let body = gateway().build_request_body(&messages, &[]);

        assert_eq!(body["system"], "rules");
        assert_eq!(body["max_tokens"], 4096);
        let wire = body["messages"].as_array().unwrap();
        assert_eq!(wire.len(), 3);
        assert_eq!(wire[0]["role"], "user");

        let assistant = wire[1]["content"].as_array().unwrap();
        assert_eq!(assistant[0]["type"], "text");
        assert_eq!(assistant[1]["type"], "tool_use");
        assert_eq!(assistant[1]["input"]["path"], "a.rs");
        assert_eq!(assistant[2]["id"], "t2");

        // both results plus the turn context in one user turn
        let results = wire[2]["content"].as_array().unwrap();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0]["tool_use_id"], "t1");
        assert_eq!(results[0]["is_error"], false);
        assert_eq!(results[1]["is_error"], true);
        assert_eq!(results[2]["type"], "text");
    }

    #[test]
    fn test_parse_response_blocks() {
        let reply = parse_response(json!({
            "content": [
                {"type": "text", "text": "I'll read it."},
                {"type": "tool_use", "id": "toolu_1", "name": "read_file", "input": {"path": "a.rs"}},
                {"type": "thinking", "thinking": "..."}
            ],
            "stop_reason": "tool_use"
        }))
        .unwrap();

        assert_eq!(reply.text.as_deref(), Some("I'll read it."));
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].name, "read_file");
        let args: Value = serde_json::from_str(&reply.tool_calls[0].arguments).unwrap();
        assert_eq!(args["path"], "a.rs");
    }

    #[test]
    fn test_tools_use_input_schema() {
        let tools = vec![ToolDefinition::new("plan_read", "Read plan")];
        let body = gateway().build_request_body(&[Message::user("x")], &tools);
        assert_eq!(body["tools"][0]["input_schema"]["type"], "object");
    }
}
