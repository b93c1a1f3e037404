//! Scripted test doubles shared by the use-case tests.

use crate::ports::agent_progress::AgentProgressNotifier;
use crate::ports::artifact_recorder::{ArtifactRecorder, PhaseRunId, StatusEvent, ToolEvent};
use crate::ports::llm_gateway::{GatewayError, LlmGateway, ProviderReply};
use crate::ports::tool_executor::ToolExecutorPort;
use async_trait::async_trait;
use patchpilot_domain::{
    Message, Plan, RunReport, ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult,
    ToolSpec, TranscriptEntry,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

// ==================== Gateway ====================

/// Gateway that replays a fixed list of replies.
///
/// Once the script is exhausted every further request gets a
/// `finalize(done=false)` so a runaway test ends instead of hanging.
pub struct ScriptedGateway {
    replies: Mutex<VecDeque<Result<ProviderReply, GatewayError>>>,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedGateway {
    pub fn new(replies: Vec<Result<ProviderReply, GatewayError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn replies(replies: Vec<ProviderReply>) -> Self {
        Self::new(replies.into_iter().map(Ok).collect())
    }

    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmGateway for ScriptedGateway {
    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted-model"
    }

    async fn complete(
        &self,
        messages: &[Message],
        _tools: &[ToolDefinition],
    ) -> Result<ProviderReply, GatewayError> {
        self.requests.lock().unwrap().push(messages.to_vec());
        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            Ok(finalize_reply("script exhausted", false))
        })
    }
}

pub fn call_reply(name: &str, args: &str) -> ProviderReply {
    ProviderReply::default().with_tool_call("", name, args)
}

pub fn finalize_reply(summary: &str, done: bool) -> ProviderReply {
    let args = serde_json::json!({ "summary": summary, "done": done });
    ProviderReply::default().with_tool_call("", "finalize", args.to_string())
}

// ==================== Executor ====================

/// Executor with canned results per tool name.
pub struct FakeExecutor {
    spec: ToolSpec,
    canned: Mutex<HashMap<String, VecDeque<ToolResult>>>,
    calls: Mutex<Vec<ToolCall>>,
}

impl FakeExecutor {
    pub fn new() -> Self {
        let spec = [
            "read_file",
            "write_file",
            "list_dir",
            "search",
            "replace_in_file",
            "apply_patch",
            "shell",
            "run_tests",
            "note_write",
            "notes_read",
        ]
        .iter()
        .fold(ToolSpec::new(), |spec, name| {
            spec.register(
                ToolDefinition::new(*name, format!("fake {}", name))
                    .with_parameter(ToolParameter::new("path", "Path", false))
                    .with_parameter(ToolParameter::new("command", "Command", false))
                    .with_parameter(ToolParameter::new("content", "Content", false))
                    .with_parameter(ToolParameter::new("text", "Text", false))
                    .with_parameter(ToolParameter::new("patch", "Patch", false)),
            )
        });
        Self {
            spec,
            canned: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queue a result for the next call of `tool`.
    pub fn with_result(self, tool: &str, result: ToolResult) -> Self {
        self.canned
            .lock()
            .unwrap()
            .entry(tool.to_string())
            .or_default()
            .push_back(result);
        self
    }

    pub fn calls(&self) -> Vec<ToolCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ToolExecutorPort for FakeExecutor {
    fn tool_spec(&self) -> &ToolSpec {
        &self.spec
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        self.calls.lock().unwrap().push(call.clone());
        if !self.spec.contains(&call.tool_name) {
            return ToolResult::failure(&call.tool_name, ToolError::unknown_tool(&call.tool_name));
        }
        self.canned
            .lock()
            .unwrap()
            .get_mut(&call.tool_name)
            .and_then(|q| q.pop_front())
            .unwrap_or_else(|| ToolResult::success(&call.tool_name, "ok"))
    }
}

// ==================== Recorder ====================

/// Recorder that keeps everything in memory.
#[derive(Default)]
pub struct MemoryArtifacts {
    pub transcripts: Mutex<Vec<(PhaseRunId, TranscriptEntry)>>,
    pub tool_events: Mutex<Vec<ToolEvent>>,
    pub plans: Mutex<Vec<(PhaseRunId, Plan)>>,
    pub statuses: Mutex<Vec<StatusEvent>>,
    pub reports: Mutex<Vec<RunReport>>,
}

impl MemoryArtifacts {
    pub fn transcript_of(&self, run: PhaseRunId) -> Vec<TranscriptEntry> {
        self.transcripts
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == run)
            .map(|(_, e)| e.clone())
            .collect()
    }
}

impl ArtifactRecorder for MemoryArtifacts {
    fn transcript(&self, run: PhaseRunId, entry: &TranscriptEntry) {
        self.transcripts.lock().unwrap().push((run, entry.clone()));
    }

    fn tool_event(&self, event: &ToolEvent) {
        self.tool_events.lock().unwrap().push(event.clone());
    }

    fn plan_snapshot(&self, run: PhaseRunId, plan: &Plan) {
        self.plans.lock().unwrap().push((run, plan.clone()));
    }

    fn status(&self, event: &StatusEvent) {
        self.statuses.lock().unwrap().push(event.clone());
    }

    fn run_report(&self, report: &RunReport) {
        self.reports.lock().unwrap().push(report.clone());
    }
}

/// Progress sink that counts finalize rejections.
#[derive(Default)]
pub struct CountingProgress {
    pub rejected_finalizes: Mutex<Vec<String>>,
}

impl AgentProgressNotifier for CountingProgress {
    fn on_finalize_rejected(&self, reason: &str) {
        self.rejected_finalizes.lock().unwrap().push(reason.to_string());
    }
}
