//! Agent execution progress port.
//!
//! [`AgentProgressNotifier`] is an **output port** that the presentation layer
//! implements to display real-time progress to the user.
//! All callback argument types come from the domain layer.
//!
//! # Callback Categories
//!
//! - **Phase callbacks**: phase start and completion
//! - **Loop callbacks**: iterations, model retries, narration
//! - **Tool callbacks**: tool calls and their results
//! - **Plan callbacks**: plan changes and rejected finalize attempts

use patchpilot_domain::{Phase, PhaseOutput, Plan, ToolErrorKind};

/// Progress notifier for phase execution.
///
/// All methods have default no-op implementations, so implementers only
/// need to override the callbacks they care about.
pub trait AgentProgressNotifier: Send + Sync {
    /// Called when a phase run begins
    fn on_phase_start(&self, _phase: Phase, _run: u32) {}

    /// Called when a phase run ends
    fn on_phase_complete(&self, _output: &PhaseOutput) {}

    /// Called at the start of each loop iteration
    fn on_step(&self, _phase: Phase, _step: usize, _max_steps: usize) {}

    /// Called when the model reply was rejected or the transport is retried
    fn on_model_retry(&self, _attempt: usize, _reason: &str) {}

    /// Called for plain assistant narration
    fn on_assistant_message(&self, _text: &str) {}

    /// Called when a tool is invoked
    fn on_tool_call(&self, _tool_name: &str, _args: &str) {}

    /// Called when a tool returns a result
    fn on_tool_result(&self, _tool_name: &str, _success: bool) {}

    /// Called when a tool result carries an error
    fn on_tool_error(&self, _tool_name: &str, _kind: ToolErrorKind, _message: &str) {}

    /// Called after the plan changed
    fn on_plan_updated(&self, _plan: &Plan) {}

    /// Called when a finalize attempt was rejected by plan validation
    fn on_finalize_rejected(&self, _reason: &str) {}
}

/// No-op implementation of [`AgentProgressNotifier`].
pub struct NoAgentProgress;

impl AgentProgressNotifier for NoAgentProgress {}
