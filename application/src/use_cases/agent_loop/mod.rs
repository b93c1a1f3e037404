//! Agent Loop use case
//!
//! Runs one phase: repeatedly sends the conversation to the model, acts on
//! the returned [`Action`], and appends every exchange to the phase's
//! [`ConversationHistory`] until the phase ends.
//!
//! | Action                  | Effect                                              |
//! |-------------------------|-----------------------------------------------------|
//! | `Message`               | appended, loop continues                            |
//! | `ToolCalls`             | each call executed in order, results appended       |
//! | `Finalize(done=true)`   | plan validated; ends as Done or is rejected         |
//! | `Finalize(done=false)`  | ends as Incomplete (`agent_gave_up`)                |
//!
//! Non-fatal tool errors are fed back to the model. `PATH_ESCAPE` and
//! `UNKNOWN_TOOL` results end the phase as Failed, as does a model that
//! keeps replying unusably. Each iteration also sees a transient snapshot
//! of the plan and the remaining turns, which is never stored in history.
//!
//! Cancellation and the run deadline are checked between iterations only;
//! a model or tool call in flight always completes.

pub mod plan_tools;
mod types;

pub use types::{PhaseRequest, RunInterrupted};

use crate::ports::agent_progress::{AgentProgressNotifier, NoAgentProgress};
use crate::ports::artifact_recorder::{
    ArtifactRecorder, NoArtifacts, PhaseRunId, StatusEvent, ToolEvent,
};
use crate::ports::tool_executor::ToolExecutorPort;
use crate::use_cases::model_client::ModelClient;
use crate::use_cases::shared::check_cancelled;
use patchpilot_domain::core::string::single_line;
use patchpilot_domain::{
    Action, AgentRunResult, AgentSettings, ConversationHistory, KeywordStuckPolicy, Message,
    PhasePromptTemplate, PhaseState, PlanStore, ReasonCode, StuckPolicy, ToolCall, ToolErrorKind,
    ToolResult, TranscriptEntry, clip, truncate,
};
use plan_tools::{execute_plan_tool, is_plan_tool};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How a phase run ended, before it is folded into the result.
struct Outcome {
    reason: ReasonCode,
    summary: Option<String>,
}

impl Outcome {
    fn new(reason: ReasonCode, summary: impl Into<String>) -> Self {
        Self {
            reason,
            summary: Some(summary.into()),
        }
    }
}

impl From<RunInterrupted> for Outcome {
    fn from(interrupted: RunInterrupted) -> Self {
        Outcome::new(ReasonCode::RunBudgetExceeded, interrupted.to_string())
    }
}

/// Mutable state of one phase run.
struct PhaseRun<'a> {
    id: PhaseRunId,
    state: PhaseState,
    history: ConversationHistory,
    plan: PlanStore,
    recorder: &'a dyn ArtifactRecorder,
}

impl PhaseRun<'_> {
    /// Append to history and mirror the append (and any eviction it caused)
    /// into the transcript.
    fn append(&mut self, message: Message) {
        let (index, evicted) = self.history.append(message);
        if let Some(appended) = self.history.last() {
            self.recorder
                .transcript(self.id, &TranscriptEntry::Append(appended.clone()));
        }
        if !evicted.is_empty() {
            debug!(
                phase = %self.id.phase,
                index,
                evicted = evicted.len(),
                "History compacted"
            );
            self.recorder
                .transcript(self.id, &TranscriptEntry::Evict { indices: evicted });
        }
    }

    fn status_event(&self, reason: Option<ReasonCode>) -> StatusEvent {
        StatusEvent {
            run: self.id,
            state: self.state.status,
            step_count: self.state.step_count,
            reason,
        }
    }
}

/// Agent loop
#[derive(Clone)]
pub struct AgentLoop {
    model: Arc<ModelClient>,
    executor: Arc<dyn ToolExecutorPort>,
    settings: Arc<AgentSettings>,
    policy: Arc<dyn StuckPolicy>,
    recorder: Arc<dyn ArtifactRecorder>,
    progress: Arc<dyn AgentProgressNotifier>,
    cancellation_token: Option<CancellationToken>,
}

impl AgentLoop {
    pub fn new(
        model: Arc<ModelClient>,
        executor: Arc<dyn ToolExecutorPort>,
        settings: Arc<AgentSettings>,
    ) -> Self {
        let policy = Arc::new(KeywordStuckPolicy::new(
            settings.core_keywords.clone(),
            settings.override_keywords.clone(),
        ));
        Self {
            model,
            executor,
            settings,
            policy,
            recorder: Arc::new(NoArtifacts),
            progress: Arc::new(NoAgentProgress),
            cancellation_token: None,
        }
    }

    /// Replace the core-step classification used by every plan store.
    pub fn with_policy(mut self, policy: Arc<dyn StuckPolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_recorder(mut self, recorder: Arc<dyn ArtifactRecorder>) -> Self {
        self.recorder = recorder;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn AgentProgressNotifier>) -> Self {
        self.progress = progress;
        self
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub fn executor(&self) -> &dyn ToolExecutorPort {
        self.executor.as_ref()
    }

    pub fn settings(&self) -> &AgentSettings {
        &self.settings
    }

    pub(crate) fn recorder(&self) -> &dyn ArtifactRecorder {
        self.recorder.as_ref()
    }

    /// Run one phase to its end. Never fails: every way a run can end is a
    /// [`ReasonCode`] on the result.
    pub async fn run(&self, request: PhaseRequest) -> AgentRunResult {
        let id = PhaseRunId::new(request.phase, request.run);
        let mut plan = PlanStore::new(self.policy.clone(), self.settings.stuck_ratio_threshold);
        if let Some(seed) = request.seed_plan.clone() {
            plan = plan.with_plan(seed);
        }

        let mut run = PhaseRun {
            id,
            state: PhaseState::new(request.phase, request.run),
            history: ConversationHistory::new(self.settings.history_budget()),
            plan,
            recorder: self.recorder.as_ref(),
        };

        run.state.start();
        info!(phase = %request.phase, run = request.run, max_steps = request.max_steps, "Phase started");
        self.progress.on_phase_start(request.phase, request.run);
        self.recorder.status(&run.status_event(None));
        if let Some(plan) = run.plan.plan() {
            self.recorder.plan_snapshot(id, plan);
        }

        run.append(Message::system(request.system_prompt.clone()));
        run.append(Message::user(request.seed.clone()).protected());

        let outcome = self.drive(&mut run, &request).await;

        run.state.finish(outcome.reason);
        info!(
            phase = %request.phase,
            run = request.run,
            status = %run.state.status,
            reason = %outcome.reason,
            steps = run.state.step_count,
            "Phase ended"
        );
        self.recorder.status(&run.status_event(Some(outcome.reason)));

        let result = AgentRunResult {
            state: run.state,
            reason: outcome.reason,
            summary: outcome.summary,
            plan: run.plan.snapshot(),
            history: run.history,
        };
        self.progress.on_phase_complete(&result.output());
        result
    }

    async fn drive(&self, run: &mut PhaseRun<'_>, request: &PhaseRequest) -> Outcome {
        while run.state.step_count < request.max_steps {
            if let Err(interrupted) = check_cancelled(&self.cancellation_token, request.deadline) {
                warn!(phase = %request.phase, reason = %interrupted, "Phase interrupted");
                return interrupted.into();
            }

            let step = run.state.begin_step();
            self.progress.on_step(request.phase, step, request.max_steps);

            let mut prompt = run.history.view().to_vec();
            prompt.push(Message::user(PhasePromptTemplate::turn_context(
                run.plan.plan(),
                step,
                request.max_steps,
            )));

            let exchange = match self
                .model
                .send(&prompt, &request.tools, self.progress.as_ref())
                .await
            {
                Ok(exchange) => exchange,
                Err(e) => {
                    error!(phase = %request.phase, error = %e, "Model exchange failed");
                    return Outcome::new(ReasonCode::ProtocolError, e.to_string());
                }
            };

            for correction in exchange.corrections {
                run.append(correction);
            }

            match exchange.action {
                Action::Message { text } => {
                    self.progress.on_assistant_message(&text);
                    run.append(Message::assistant(text));
                }
                Action::ToolCalls { calls } => {
                    let narration = exchange.narration.unwrap_or_default();
                    if !narration.is_empty() {
                        self.progress.on_assistant_message(&narration);
                    }
                    run.append(Message::assistant_with_calls(narration, calls.clone()));

                    for call in &calls {
                        let result = self.dispatch(run, call).await;
                        let fatal = result.error.as_ref().filter(|e| e.is_fatal()).cloned();
                        run.append(Message::tool(result));

                        if let Some(err) = fatal {
                            error!(phase = %request.phase, tool = %call.tool_name, error = %err, "Fatal tool error");
                            let reason = match err.kind {
                                ToolErrorKind::PathEscape => ReasonCode::PathEscape,
                                _ => ReasonCode::UnknownTool,
                            };
                            return Outcome::new(reason, err.to_string());
                        }
                    }
                }
                Action::Finalize { summary, done } => {
                    run.append(Message::assistant(format!(
                        "finalize(done={}): {}",
                        done, summary
                    )));
                    if !done {
                        info!(phase = %request.phase, "Agent gave up");
                        return Outcome::new(ReasonCode::AgentGaveUp, summary);
                    }
                    let validation = if request.validate_finalize {
                        run.plan.validate_finalize()
                    } else {
                        Ok(())
                    };
                    match validation {
                        Ok(()) => return Outcome::new(ReasonCode::Finalized, summary),
                        Err(e) => {
                            let reason = e.to_string();
                            warn!(phase = %request.phase, reason = %reason, "Finalize rejected");
                            self.progress.on_finalize_rejected(&reason);
                            self.recorder.tool_event(&ToolEvent {
                                run: run.id,
                                tool: "finalize".to_string(),
                                args_summary: truncate(&single_line(&summary), 200),
                                result_summary: truncate(&reason, 200),
                                elapsed_ms: 0,
                                error: Some(ToolErrorKind::Validation),
                            });
                            run.append(Message::user(PhasePromptTemplate::finalize_rejected(
                                &reason,
                            )));
                        }
                    }
                }
            }
        }

        warn!(phase = %request.phase, max_steps = request.max_steps, "Step budget exhausted");
        Outcome::new(
            ReasonCode::StepBudgetExceeded,
            format!("stopped after {} steps without finalizing", request.max_steps),
        )
    }

    /// Execute one call: plan tools against the run's store, everything else
    /// through the executor.
    async fn dispatch(&self, run: &mut PhaseRun<'_>, call: &ToolCall) -> ToolResult {
        let args = call.arguments_json();
        self.progress.on_tool_call(&call.tool_name, &args);
        let started = Instant::now();

        let result = if is_plan_tool(&call.tool_name) {
            let (result, changed) = execute_plan_tool(&mut run.plan, call);
            if changed && let Some(plan) = run.plan.plan() {
                self.recorder.plan_snapshot(run.id, plan);
                self.progress.on_plan_updated(plan);
            }
            result
        } else {
            self.executor.execute(call).await
        };

        let elapsed_ms = started.elapsed().as_millis() as u64;
        let mut result = result.with_call_id(call.id.clone());
        result.output = clip(&result.output, self.settings.max_tool_result_chars);
        if result.metadata.duration_ms.is_none() {
            result = result.with_duration(elapsed_ms);
        }

        match &result.error {
            Some(err) => {
                debug!(tool = %call.tool_name, kind = %err.kind, "Tool returned an error");
                self.progress
                    .on_tool_error(&call.tool_name, err.kind, &err.message);
            }
            None => self.progress.on_tool_result(&call.tool_name, true),
        }
        self.recorder.tool_event(&ToolEvent {
            run: run.id,
            tool: call.tool_name.clone(),
            args_summary: truncate(&single_line(&args), 200),
            result_summary: truncate(&single_line(&result.render()), 200),
            elapsed_ms,
            error: result.error_kind(),
        });

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::llm_gateway::ProviderReply;
    use crate::use_cases::model_client::ModelClientConfig;
    use crate::use_cases::test_support::{
        CountingProgress, FakeExecutor, MemoryArtifacts, ScriptedGateway, call_reply,
        finalize_reply,
    };
    use patchpilot_domain::{
        AllowAllStuckPolicy, HistoryBudget, Phase, PhaseStatus, Plan, Role, Step, ToolError,
        ToolSpec,
    };
    use plan_tools::plan_tool_spec;
    use std::time::Duration;

    struct Harness {
        gateway: Arc<ScriptedGateway>,
        executor: Arc<FakeExecutor>,
        artifacts: Arc<MemoryArtifacts>,
        progress: Arc<CountingProgress>,
        agent: AgentLoop,
    }

    fn harness(
        replies: Vec<ProviderReply>,
        executor: FakeExecutor,
        settings: AgentSettings,
    ) -> Harness {
        let gateway = Arc::new(ScriptedGateway::replies(replies));
        let executor = Arc::new(executor);
        let artifacts = Arc::new(MemoryArtifacts::default());
        let progress = Arc::new(CountingProgress::default());
        let model = Arc::new(
            ModelClient::new(gateway.clone()).with_config(
                ModelClientConfig::default().with_backoff_base(Duration::from_millis(1)),
            ),
        );
        let agent = AgentLoop::new(model, executor.clone(), Arc::new(settings))
            .with_recorder(artifacts.clone())
            .with_progress(progress.clone());
        Harness {
            gateway,
            executor,
            artifacts,
            progress,
            agent,
        }
    }

    fn coder_tools(executor: &FakeExecutor) -> ToolSpec {
        executor.tool_spec().clone().merge(&plan_tool_spec())
    }

    fn request(executor: &FakeExecutor) -> PhaseRequest {
        PhaseRequest::new(Phase::Coder, "system", "task", coder_tools(executor)).with_max_steps(10)
    }

    fn plan(steps: &[(&str, &str)]) -> Plan {
        Plan {
            steps: steps
                .iter()
                .enumerate()
                .map(|(order, (id, description))| {
                    let mut step = Step::new(*id, *description);
                    step.order = order;
                    step
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_finalize_without_plan_is_done() {
        let executor = FakeExecutor::new();
        let req = request(&executor);
        let h = harness(
            vec![finalize_reply("nothing to do", true)],
            executor,
            AgentSettings::default(),
        );

        let result = h.agent.run(req).await;
        assert_eq!(result.status(), PhaseStatus::Done);
        assert_eq!(result.reason, ReasonCode::Finalized);
        assert_eq!(result.summary.as_deref(), Some("nothing to do"));
        assert_eq!(result.state.step_count, 1);
    }

    #[tokio::test]
    async fn test_rejected_finalize_then_completion() {
        let executor = FakeExecutor::new();
        let req = request(&executor).with_plan(plan(&[
            ("s1", "Read the module"),
            ("s2", "Implement the parser"),
        ]));
        let h = harness(
            vec![
                finalize_reply("too early", true),
                call_reply("plan_update", r#"{"ids":["s1","s2"],"status":"completed"}"#),
                finalize_reply("feat: parser", true),
            ],
            executor,
            AgentSettings::default(),
        );

        let result = h.agent.run(req).await;
        assert_eq!(result.status(), PhaseStatus::Done);
        assert_eq!(result.summary.as_deref(), Some("feat: parser"));
        assert_eq!(h.progress.rejected_finalizes.lock().unwrap().len(), 1);

        let rejection = result
            .history
            .view()
            .iter()
            .find(|m| m.content.starts_with("ValidationError: finalize rejected"))
            .expect("rejection message in history");
        assert_eq!(rejection.role, Role::User);
        assert!(rejection.content.contains("s1"));
        assert_eq!(result.plan.unwrap().completed_count(), 2);
        assert!(!h.artifacts.plans.lock().unwrap().is_empty());
    }

    fn four_step_plan(stuck: usize) -> Plan {
        let mut plan = plan(&[
            ("docs", "Update the changelog"),
            ("lint", "Run the linter"),
            ("ci", "Configure the CI job"),
            ("bench", "Refresh benchmark numbers"),
        ]);
        for step in plan.steps.iter_mut().take(stuck) {
            step.stuck = true;
        }
        for step in plan.steps.iter_mut().skip(stuck) {
            step.completed = true;
        }
        plan
    }

    #[tokio::test]
    async fn test_four_step_plan_all_completed_is_done() {
        let executor = FakeExecutor::new();
        let req = request(&executor).with_plan(four_step_plan(0));
        let h = harness(vec![finalize_reply("done", true)], executor, AgentSettings::default());

        let result = h.agent.run(req).await;
        assert_eq!(result.status(), PhaseStatus::Done);
    }

    #[tokio::test]
    async fn test_four_step_plan_half_stuck_is_done() {
        let executor = FakeExecutor::new();
        let req = request(&executor).with_plan(four_step_plan(2));
        let h = harness(vec![finalize_reply("partial", true)], executor, AgentSettings::default());

        let result = h.agent.run(req).await;
        assert_eq!(result.status(), PhaseStatus::Done);
        assert!(h.progress.rejected_finalizes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_four_step_plan_three_stuck_is_rejected() {
        let executor = FakeExecutor::new();
        let req = request(&executor).with_plan(four_step_plan(3));
        let h = harness(
            vec![
                finalize_reply("mostly blocked", true),
                call_reply("plan_update", r#"{"ids":["docs"],"status":"completed"}"#),
                finalize_reply("changelog updated", true),
            ],
            executor,
            AgentSettings::default(),
        );

        let result = h.agent.run(req).await;
        let rejections = h.progress.rejected_finalizes.lock().unwrap().clone();
        assert_eq!(rejections.len(), 1);
        assert!(rejections[0].contains("3 of 4"));

        // The rejection reaches the model on the following turn
        let requests = h.gateway.requests();
        assert_eq!(requests.len(), 3);
        assert!(
            requests[0]
                .iter()
                .all(|m| !m.content.starts_with("ValidationError"))
        );
        let feedback = requests[1]
            .iter()
            .find(|m| m.content.starts_with("ValidationError: finalize rejected"))
            .expect("rejection sent to the model");
        assert!(feedback.content.contains("3 of 4 steps stuck"));

        assert_eq!(result.reason, ReasonCode::Finalized);
        assert_eq!(result.status(), PhaseStatus::Done);
        assert_eq!(result.summary.as_deref(), Some("changelog updated"));
        let plan = result.plan.unwrap();
        assert_eq!(plan.stuck_count(), 2);
        assert_eq!(plan.completed_count(), 2);
    }

    #[tokio::test]
    async fn test_seed_survives_history_compaction() {
        let executor = FakeExecutor::new();
        let req = request(&executor);
        let settings = AgentSettings::default().with_history(300, 2);
        let h = harness(
            vec![
                ProviderReply::text("a".repeat(120)),
                ProviderReply::text("b".repeat(120)),
                ProviderReply::text("c".repeat(120)),
                finalize_reply("ok", true),
            ],
            executor,
            settings,
        );

        let result = h.agent.run(req).await;
        assert!(result.history.evicted_count() > 0);
        let retained = result.history.view();
        assert_eq!(retained[0].role, Role::System);
        assert_eq!(retained[1].role, Role::User);
        assert_eq!(retained[1].content, "task");

        let requests = h.gateway.requests();
        let last = requests.last().unwrap();
        assert!(
            last.iter()
                .any(|m| m.role == Role::User && m.content == "task")
        );
    }

    #[tokio::test]
    async fn test_step_budget_is_distinct_from_giving_up() {
        let executor = FakeExecutor::new();
        let req = request(&executor).with_max_steps(2);
        let h = harness(
            vec![
                call_reply("read_file", r#"{"path":"a.rs"}"#),
                call_reply("read_file", r#"{"path":"b.rs"}"#),
                finalize_reply("late", true),
            ],
            executor,
            AgentSettings::default(),
        );

        let result = h.agent.run(req).await;
        assert_eq!(result.reason, ReasonCode::StepBudgetExceeded);
        assert_eq!(result.status(), PhaseStatus::Incomplete);
        assert_eq!(result.state.step_count, 2);
        assert_eq!(h.gateway.remaining(), 1);

        let executor = FakeExecutor::new();
        let req = request(&executor);
        let h = harness(
            vec![finalize_reply("blocked on credentials", false)],
            executor,
            AgentSettings::default(),
        );
        let result = h.agent.run(req).await;
        assert_eq!(result.reason, ReasonCode::AgentGaveUp);
        assert_eq!(result.status(), PhaseStatus::Incomplete);
    }

    #[tokio::test]
    async fn test_path_escape_fails_phase() {
        let executor = FakeExecutor::new().with_result(
            "read_file",
            ToolResult::failure("read_file", ToolError::path_escape("../../etc/passwd")),
        );
        let req = request(&executor);
        let h = harness(
            vec![
                call_reply("read_file", r#"{"path":"../../etc/passwd"}"#),
                finalize_reply("never", true),
            ],
            executor,
            AgentSettings::default(),
        );

        let result = h.agent.run(req).await;
        assert_eq!(result.reason, ReasonCode::PathEscape);
        assert_eq!(result.status(), PhaseStatus::Failed);
        // The failing result is still recorded in history
        let last = result.history.last().unwrap();
        assert_eq!(last.role, Role::Tool);
        assert!(last.content.contains("PATH_ESCAPE"));
    }

    #[tokio::test]
    async fn test_timeout_result_does_not_end_phase() {
        let executor = FakeExecutor::new().with_result(
            "shell",
            ToolResult::failure("shell", ToolError::timeout("sleep 5"))
                .with_output("$ sleep 5\n[KILLED AFTER TIMEOUT]"),
        );
        let req = request(&executor);
        let h = harness(
            vec![
                call_reply("shell", r#"{"command":"sleep 5"}"#),
                finalize_reply("done", true),
            ],
            executor,
            AgentSettings::default(),
        );

        let result = h.agent.run(req).await;
        assert_eq!(result.status(), PhaseStatus::Done);
        let tool_message = result
            .history
            .view()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert!(tool_message.content.contains("TIMEOUT"));
        assert_eq!(h.executor.calls().len(), 1);

        let events = h.artifacts.tool_events.lock().unwrap();
        assert_eq!(events[0].error, Some(ToolErrorKind::Timeout));
    }

    #[tokio::test]
    async fn test_protocol_error_fails_phase() {
        let executor = FakeExecutor::new();
        let req = request(&executor);
        let h = harness(
            vec![
                call_reply("deploy", "{}"),
                call_reply("deploy", "{}"),
                call_reply("deploy", "{}"),
            ],
            executor,
            AgentSettings::default(),
        );

        let result = h.agent.run(req).await;
        assert_eq!(result.reason, ReasonCode::ProtocolError);
        assert_eq!(result.status(), PhaseStatus::Failed);
        assert!(h.executor.calls().is_empty());
    }

    #[tokio::test]
    async fn test_tool_output_is_clipped() {
        let long = "x".repeat(5_000);
        let executor =
            FakeExecutor::new().with_result("read_file", ToolResult::success("read_file", long));
        let req = request(&executor);
        let h = harness(
            vec![
                call_reply("read_file", r#"{"path":"big.txt"}"#),
                finalize_reply("ok", true),
            ],
            executor,
            AgentSettings::default(),
        );

        let result = h.agent.run(req).await;
        let tool_message = result
            .history
            .view()
            .iter()
            .find(|m| m.role == Role::Tool)
            .unwrap();
        assert!(tool_message.tool_results[0].output.chars().count() <= 4_000);
        assert!(tool_message.content.ends_with("...[truncated]"));
    }

    #[tokio::test]
    async fn test_transient_context_is_not_stored() {
        let executor = FakeExecutor::new();
        let req = request(&executor);
        let h = harness(
            vec![
                ProviderReply::text("thinking"),
                finalize_reply("ok", true),
            ],
            executor,
            AgentSettings::default(),
        );

        let result = h.agent.run(req).await;
        assert!(
            result
                .history
                .view()
                .iter()
                .all(|m| !m.content.contains("<turns>"))
        );

        let requests = h.gateway.requests();
        let last_of_first = requests[0].last().unwrap();
        assert!(last_of_first.content.contains("<turns>step 1 of 10, 9 remaining</turns>"));
    }

    #[tokio::test]
    async fn test_transcript_replays_to_history() {
        let executor = FakeExecutor::new();
        let req = request(&executor);
        let settings = AgentSettings::default().with_history(300, 2);
        let h = harness(
            vec![
                ProviderReply::text("a".repeat(120)),
                ProviderReply::text("b".repeat(120)),
                ProviderReply::text("c".repeat(120)),
                finalize_reply("ok", true),
            ],
            executor,
            settings,
        );

        let result = h.agent.run(req).await;
        assert!(result.history.evicted_count() > 0);

        let entries = h
            .artifacts
            .transcript_of(PhaseRunId::new(Phase::Coder, 1));
        let replayed = ConversationHistory::from_transcript(HistoryBudget::unbounded(), entries);
        assert_eq!(replayed.view(), result.history.view());
    }

    #[tokio::test]
    async fn test_custom_policy_allows_core_stuck() {
        let executor = FakeExecutor::new();
        let req = request(&executor).with_plan(plan(&[
            ("s1", "Implement the parser"),
            ("s2", "Read docs"),
        ]));
        let h = harness(
            vec![
                call_reply("plan_update", r#"{"ids":["s1"],"status":"stuck"}"#),
                call_reply("plan_update", r#"{"ids":["s2"],"status":"completed"}"#),
                finalize_reply("partial", true),
            ],
            executor,
            AgentSettings::default(),
        );
        let agent = h.agent.clone().with_policy(Arc::new(AllowAllStuckPolicy));

        let result = agent.run(req).await;
        assert_eq!(result.status(), PhaseStatus::Done);
        assert_eq!(result.plan.unwrap().stuck_count(), 1);
    }

    #[tokio::test]
    async fn test_cancellation_ends_run_as_budget_exceeded() {
        let executor = FakeExecutor::new();
        let req = request(&executor);
        let h = harness(vec![finalize_reply("ok", true)], executor, AgentSettings::default());
        let token = CancellationToken::new();
        token.cancel();
        let agent = h.agent.clone().with_cancellation(token);

        let result = agent.run(req).await;
        assert_eq!(result.reason, ReasonCode::RunBudgetExceeded);
        assert_eq!(result.status(), PhaseStatus::Incomplete);
        assert!(h.gateway.requests().is_empty());
    }

    #[tokio::test]
    async fn test_status_events_bracket_the_run() {
        let executor = FakeExecutor::new();
        let req = request(&executor);
        let h = harness(vec![finalize_reply("ok", true)], executor, AgentSettings::default());

        h.agent.run(req).await;
        let statuses = h.artifacts.statuses.lock().unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].state, PhaseStatus::Running);
        assert_eq!(statuses[1].state, PhaseStatus::Done);
        assert_eq!(statuses[1].reason, Some(ReasonCode::Finalized));
    }
}
