//! Model Client use case
//!
//! Wraps one [`LlmGateway`] and turns its raw replies into exactly one
//! validated [`Action`]:
//!
//! 1. Native tool calls win. A `finalize` call must be the only call.
//! 2. Otherwise the text is parsed as the JSON response contract when it is
//!    a JSON object (optionally inside a ```json fence) with a `"type"` key.
//! 3. Otherwise non-empty text is plain narration.
//!
//! Every tool call is resolved against the active [`ToolSpec`] (aliases map
//! to canonical names) and validated against its declared parameters. An
//! unusable reply is answered with a corrective instruction and retried a
//! bounded number of times; transient transport errors are retried with
//! exponential backoff.

use crate::ports::agent_progress::AgentProgressNotifier;
use crate::ports::llm_gateway::{GatewayError, LlmGateway, ProviderReply, ProviderToolCall};
use patchpilot_domain::{
    Action, DefaultToolValidator, FINALIZE_TOOL, Message, PhasePromptTemplate, ToolCall,
    ToolDefinition, ToolSpec, ToolValidator, finalize_definition,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Retry and backoff settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelClientConfig {
    /// Corrective retries after an unusable reply
    pub max_protocol_retries: usize,
    /// Retries after a transient transport error
    pub max_transport_retries: usize,
    /// First backoff delay; doubles on every attempt
    pub backoff_base: Duration,
    pub backoff_max: Duration,
}

impl Default for ModelClientConfig {
    fn default() -> Self {
        Self {
            max_protocol_retries: 2,
            max_transport_retries: 4,
            backoff_base: Duration::from_millis(500),
            backoff_max: Duration::from_secs(30),
        }
    }
}

impl ModelClientConfig {
    pub fn with_protocol_retries(mut self, retries: usize) -> Self {
        self.max_protocol_retries = retries;
        self
    }

    pub fn with_transport_retries(mut self, retries: usize) -> Self {
        self.max_transport_retries = retries;
        self
    }

    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let factor = 1u32.checked_shl(attempt as u32).unwrap_or(u32::MAX);
        self.backoff_base
            .checked_mul(factor)
            .unwrap_or(self.backoff_max)
            .min(self.backoff_max)
    }
}

/// Errors that end a model exchange. Both are fatal to the phase.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelClientError {
    #[error("Model replies stayed unusable after {attempts} attempt(s): {last_problem}")]
    Protocol {
        attempts: usize,
        last_problem: String,
    },

    #[error("Model transport failed: {0}")]
    Transport(GatewayError),
}

/// One successful exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelExchange {
    pub action: Action,
    /// Text the model sent alongside native tool calls
    pub narration: Option<String>,
    /// Rejected replies and the corrective instructions sent after them,
    /// in order. The caller appends these to its history.
    pub corrections: Vec<Message>,
}

/// Model client
pub struct ModelClient {
    gateway: Arc<dyn LlmGateway>,
    config: ModelClientConfig,
    validator: DefaultToolValidator,
    call_counter: AtomicU64,
}

impl ModelClient {
    pub fn new(gateway: Arc<dyn LlmGateway>) -> Self {
        Self {
            gateway,
            config: ModelClientConfig::default(),
            validator: DefaultToolValidator,
            call_counter: AtomicU64::new(0),
        }
    }

    pub fn with_config(mut self, config: ModelClientConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ModelClientConfig {
        &self.config
    }

    pub fn gateway(&self) -> &dyn LlmGateway {
        self.gateway.as_ref()
    }

    /// Send the conversation and return one validated action.
    ///
    /// `tools` is the role's tool set; finalize is always offered on top.
    pub async fn send(
        &self,
        messages: &[Message],
        tools: &ToolSpec,
        progress: &dyn AgentProgressNotifier,
    ) -> Result<ModelExchange, ModelClientError> {
        let mut definitions: Vec<ToolDefinition> = tools
            .definitions()
            .into_iter()
            .filter(|d| d.name != FINALIZE_TOOL)
            .cloned()
            .collect();
        definitions.push(finalize_definition());

        let mut corrections: Vec<Message> = Vec::new();
        let mut attempt = 0;

        loop {
            let mut prompt = messages.to_vec();
            prompt.extend(corrections.iter().cloned());

            let reply = self.complete_with_backoff(&prompt, &definitions, progress).await?;

            match self.parse_reply(&reply, tools) {
                Ok((action, narration)) => {
                    debug!(
                        provider = self.gateway.provider_name(),
                        action = action.kind(),
                        "Model reply accepted"
                    );
                    return Ok(ModelExchange {
                        action,
                        narration,
                        corrections,
                    });
                }
                Err(problem) => {
                    attempt += 1;
                    if attempt > self.config.max_protocol_retries {
                        warn!(attempts = attempt, problem = %problem, "Giving up on model replies");
                        return Err(ModelClientError::Protocol {
                            attempts: attempt,
                            last_problem: problem,
                        });
                    }
                    warn!(attempt, problem = %problem, "Model reply rejected, sending correction");
                    progress.on_model_retry(attempt, &problem);
                    corrections.push(Message::assistant(reply.render()));
                    corrections.push(Message::user(PhasePromptTemplate::corrective(&problem)));
                }
            }
        }
    }

    async fn complete_with_backoff(
        &self,
        messages: &[Message],
        definitions: &[ToolDefinition],
        progress: &dyn AgentProgressNotifier,
    ) -> Result<ProviderReply, ModelClientError> {
        let mut attempt = 0;
        loop {
            match self.gateway.complete(messages, definitions).await {
                Ok(reply) => return Ok(reply),
                Err(e) if e.is_transient() && attempt < self.config.max_transport_retries => {
                    let delay = e
                        .retry_after()
                        .unwrap_or_else(|| self.config.backoff(attempt))
                        .min(self.config.backoff_max);
                    attempt += 1;
                    warn!(
                        provider = self.gateway.provider_name(),
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient model error, backing off"
                    );
                    progress.on_model_retry(attempt, &e.to_string());
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(ModelClientError::Transport(e)),
            }
        }
    }

    // ==================== Parsing ====================

    fn parse_reply(
        &self,
        reply: &ProviderReply,
        tools: &ToolSpec,
    ) -> Result<(Action, Option<String>), String> {
        let text = reply.text.as_deref().map(str::trim).unwrap_or_default();

        if !reply.tool_calls.is_empty() {
            let narration = (!text.is_empty()).then(|| text.to_string());
            return self
                .parse_native_calls(&reply.tool_calls, tools)
                .map(|action| (action, narration));
        }

        if text.is_empty() {
            return Err("the reply was empty".to_string());
        }

        match extract_json_object(text) {
            JsonText::Object(object) if object.contains_key("type") => {
                self.parse_contract(&object, tools).map(|a| (a, None))
            }
            JsonText::Malformed(e) => Err(format!("the reply looks like JSON but is invalid: {}", e)),
            _ => Ok((Action::message(text), None)),
        }
    }

    fn parse_native_calls(
        &self,
        calls: &[ProviderToolCall],
        tools: &ToolSpec,
    ) -> Result<Action, String> {
        if calls.iter().any(|c| c.name == FINALIZE_TOOL) {
            if calls.len() > 1 {
                return Err("finalize must be the only tool call in a reply".to_string());
            }
            let args = parse_arguments(&calls[0].arguments)?;
            return self.finalize_from_args(args);
        }

        let mut parsed = Vec::with_capacity(calls.len());
        for call in calls {
            let args = parse_arguments(&call.arguments)?;
            let id = if call.id.is_empty() {
                self.next_call_id()
            } else {
                call.id.clone()
            };
            parsed.push(self.validate_call(&call.name, args, id, tools)?);
        }
        Ok(Action::tool_calls(parsed))
    }

    fn parse_contract(&self, object: &Map<String, Value>, tools: &ToolSpec) -> Result<Action, String> {
        let kind = object.get("type").and_then(Value::as_str).unwrap_or_default();
        match kind {
            "message" => {
                let text = object
                    .get("text")
                    .and_then(Value::as_str)
                    .ok_or("a message reply needs a string 'text'")?;
                if text.trim().is_empty() {
                    return Err("the message text was empty".to_string());
                }
                Ok(Action::message(text))
            }
            "tool_calls" => {
                let calls = object
                    .get("calls")
                    .and_then(Value::as_array)
                    .filter(|c| !c.is_empty())
                    .ok_or("a tool_calls reply needs a non-empty 'calls' array")?;
                let mut parsed = Vec::with_capacity(calls.len());
                for call in calls {
                    let name = call
                        .get("name")
                        .and_then(Value::as_str)
                        .ok_or("every call needs a string 'name'")?;
                    if name == FINALIZE_TOOL {
                        return Err(
                            "finalize is not a tool call here; reply with type 'finalize'".to_string(),
                        );
                    }
                    let args = match call.get("args").or_else(|| call.get("arguments")) {
                        None | Some(Value::Null) => Map::new(),
                        Some(Value::Object(map)) => map.clone(),
                        Some(_) => return Err(format!("arguments of '{}' must be an object", name)),
                    };
                    parsed.push(self.validate_call(name, args, self.next_call_id(), tools)?);
                }
                Ok(Action::tool_calls(parsed))
            }
            "finalize" => self.finalize_from_args(object.clone()),
            other => Err(format!(
                "unknown reply type '{}'; expected message, tool_calls or finalize",
                other
            )),
        }
    }

    fn finalize_from_args(&self, args: Map<String, Value>) -> Result<Action, String> {
        let mut call = ToolCall::new(FINALIZE_TOOL);
        call.arguments = args.into_iter().filter(|(k, _)| k != "type").collect();
        self.validator.validate(&call, &finalize_definition())?;

        let summary = call.get_string("summary").unwrap_or_default().to_string();
        let done = call.get_bool("done").unwrap_or(false);
        Ok(Action::finalize(summary, done))
    }

    fn validate_call(
        &self,
        name: &str,
        args: Map<String, Value>,
        id: String,
        tools: &ToolSpec,
    ) -> Result<ToolCall, String> {
        let Some(canonical) = tools.resolve(name) else {
            return Err(format!(
                "unknown tool '{}'; available tools: {}",
                name,
                tools.names().join(", ")
            ));
        };
        let definition = tools
            .get(canonical)
            .ok_or_else(|| format!("unknown tool '{}'", name))?;

        let mut call = ToolCall::new(canonical).with_id(id);
        call.arguments = args.into_iter().collect();
        self.validator.validate(&call, definition)?;
        Ok(call)
    }

    fn next_call_id(&self) -> String {
        let n = self.call_counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("call_{}", n)
    }
}

enum JsonText {
    Object(Map<String, Value>),
    Malformed(String),
    NotJson,
}

/// Interpret `text` as a JSON object if it is one, possibly fenced.
fn extract_json_object(text: &str) -> JsonText {
    let body = strip_fence(text).unwrap_or(text).trim();
    if !body.starts_with('{') {
        return JsonText::NotJson;
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => JsonText::Object(map),
        Ok(_) => JsonText::NotJson,
        Err(e) if body.contains("\"type\"") => JsonText::Malformed(e.to_string()),
        Err(_) => JsonText::NotJson,
    }
}

fn strip_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.strip_suffix("```")?;
    Some(rest)
}

fn parse_arguments(raw: &str) -> Result<Map<String, Value>, String> {
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(_) => Err("tool arguments must be a JSON object".to_string()),
        Err(e) => Err(format!("tool arguments are not valid JSON: {}", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::agent_progress::NoAgentProgress;
    use crate::use_cases::test_support::ScriptedGateway;
    use patchpilot_domain::{Role, ToolParameter};

    fn spec() -> ToolSpec {
        ToolSpec::new()
            .register(
                ToolDefinition::new("read_file", "Read a file")
                    .with_parameter(ToolParameter::new("path", "Path", true)),
            )
            .register(
                ToolDefinition::new("shell", "Run a command")
                    .with_parameter(ToolParameter::new("command", "Command", true))
                    .with_parameter(
                        ToolParameter::new("timeout_seconds", "Timeout", false).with_type("integer"),
                    ),
            )
            .register_alias("bash", "shell")
    }

    fn client(gateway: Arc<ScriptedGateway>) -> ModelClient {
        ModelClient::new(gateway)
            .with_config(ModelClientConfig::default().with_backoff_base(Duration::from_millis(1)))
    }

    async fn send(gateway: Arc<ScriptedGateway>) -> Result<ModelExchange, ModelClientError> {
        client(gateway)
            .send(&[Message::user("go")], &spec(), &NoAgentProgress)
            .await
    }

    #[tokio::test]
    async fn test_native_tool_call_is_validated() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(ProviderReply::default()
            .with_tool_call("c1", "read_file", r#"{"path":"src/lib.rs"}"#))]));

        let exchange = send(gateway).await.unwrap();
        let Action::ToolCalls { calls } = exchange.action else {
            panic!("expected tool calls");
        };
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "c1");
        assert_eq!(calls[0].get_string("path"), Some("src/lib.rs"));
        assert!(exchange.corrections.is_empty());
    }

    #[tokio::test]
    async fn test_alias_resolves_to_canonical_name() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(ProviderReply::default()
            .with_tool_call("", "bash", r#"{"command":"ls"}"#))]));

        let exchange = send(gateway).await.unwrap();
        let Action::ToolCalls { calls } = exchange.action else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].tool_name, "shell");
        assert!(calls[0].id.starts_with("call_"));
    }

    #[tokio::test]
    async fn test_json_contract_in_fence() {
        let text = "```json\n{\"type\":\"tool_calls\",\"calls\":[{\"name\":\"shell\",\"args\":{\"command\":\"cargo test\"}}]}\n```";
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(ProviderReply::text(text))]));

        let exchange = send(gateway).await.unwrap();
        let Action::ToolCalls { calls } = exchange.action else {
            panic!("expected tool calls");
        };
        assert_eq!(calls[0].get_string("command"), Some("cargo test"));
    }

    #[tokio::test]
    async fn test_plain_text_is_message() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(ProviderReply::text(
            "Looking at the layout first.",
        ))]));

        let exchange = send(gateway).await.unwrap();
        assert_eq!(exchange.action, Action::message("Looking at the layout first."));
    }

    #[tokio::test]
    async fn test_native_finalize() {
        let gateway = Arc::new(ScriptedGateway::new(vec![Ok(ProviderReply::default()
            .with_tool_call("f", "finalize", r#"{"summary":"all good","done":true}"#))]));

        let exchange = send(gateway).await.unwrap();
        assert_eq!(exchange.action, Action::finalize("all good", true));
    }

    #[tokio::test]
    async fn test_unknown_tool_gets_corrective_retry() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Ok(ProviderReply::default().with_tool_call("c1", "deploy", "{}")),
            Ok(ProviderReply::default().with_tool_call("c2", "read_file", r#"{"path":"a"}"#)),
        ]));

        let exchange = send(gateway.clone()).await.unwrap();
        assert_eq!(exchange.action.kind(), "tool_calls");
        assert_eq!(exchange.corrections.len(), 2);
        assert_eq!(exchange.corrections[0].role, Role::Assistant);
        assert!(exchange.corrections[1].content.contains("unknown tool 'deploy'"));

        // The second request saw the correction
        let requests = gateway.requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].len(), 3);
    }

    #[tokio::test]
    async fn test_protocol_error_after_retries() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Ok(ProviderReply::text("")),
            Ok(ProviderReply::default().with_tool_call("c", "read_file", "{}")),
            Ok(ProviderReply::text("{\"type\": \"tool_calls\", \"calls\": [")),
        ]));

        let err = send(gateway).await.unwrap_err();
        let ModelClientError::Protocol { attempts, last_problem } = err else {
            panic!("expected protocol error");
        };
        assert_eq!(attempts, 3);
        assert!(last_problem.contains("invalid"));
    }

    #[tokio::test]
    async fn test_finalize_must_be_alone() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Ok(ProviderReply::default()
                .with_tool_call("a", "read_file", r#"{"path":"x"}"#)
                .with_tool_call("b", "finalize", r#"{"summary":"s","done":true}"#)),
            Ok(ProviderReply::text(r#"{"type":"finalize","done":false,"summary":"blocked"}"#)),
        ]));

        let exchange = send(gateway).await.unwrap();
        assert_eq!(exchange.action, Action::finalize("blocked", false));
        assert!(exchange.corrections[1].content.contains("only tool call"));
    }

    #[tokio::test]
    async fn test_invalid_argument_type_is_rejected() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Ok(ProviderReply::default()
                .with_tool_call("a", "shell", r#"{"command":"ls","timeout_seconds":"soon"}"#)),
            Ok(ProviderReply::text("ok")),
        ]));

        let exchange = send(gateway).await.unwrap();
        assert_eq!(exchange.corrections.len(), 2);
        assert_eq!(exchange.action, Action::message("ok"));
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Err(GatewayError::RateLimited { retry_after: None }),
            Err(GatewayError::ServerError {
                status: 503,
                message: "overloaded".into(),
            }),
            Ok(ProviderReply::text("back")),
        ]));

        let exchange = send(gateway).await.unwrap();
        assert_eq!(exchange.action, Action::message("back"));
        assert!(exchange.corrections.is_empty());
    }

    #[tokio::test]
    async fn test_fatal_transport_error_is_not_retried() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            Err(GatewayError::RequestFailed {
                status: 401,
                message: "bad key".into(),
            }),
            Ok(ProviderReply::text("never reached")),
        ]));

        let err = send(gateway.clone()).await.unwrap_err();
        assert!(matches!(err, ModelClientError::Transport(_)));
        assert_eq!(gateway.requests().len(), 1);
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = ModelClientConfig::default();
        assert_eq!(config.backoff(0), Duration::from_millis(500));
        assert_eq!(config.backoff(1), Duration::from_millis(1000));
        assert_eq!(config.backoff(3), Duration::from_millis(4000));
        assert_eq!(config.backoff(20), Duration::from_secs(30));
    }

    #[test]
    fn test_extract_json_object() {
        assert!(matches!(extract_json_object("hello"), JsonText::NotJson));
        assert!(matches!(
            extract_json_object("{\"type\":\"message\",\"text\":\"hi\"}"),
            JsonText::Object(_)
        ));
        assert!(matches!(
            extract_json_object("{\"type\": oops}"),
            JsonText::Malformed(_)
        ));
    }
}
