//! Port for persisting run artifacts.
//!
//! Defines the [`ArtifactRecorder`] trait for recording transcripts, tool
//! events, plan snapshots and status changes to durable storage.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostics, while this port captures the machine-readable
//! record a run can be inspected or replayed from.

use patchpilot_domain::{Phase, PhaseStatus, Plan, ReasonCode, RunReport, ToolErrorKind, TranscriptEntry};

/// Identifies one run of one phase (`coder-2` is the second Coder run).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhaseRunId {
    pub phase: Phase,
    pub run: u32,
}

impl PhaseRunId {
    pub fn new(phase: Phase, run: u32) -> Self {
        Self { phase, run }
    }

    pub fn label(&self) -> String {
        format!("{}-{}", self.phase.as_str(), self.run)
    }
}

/// One executed tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolEvent {
    pub run: PhaseRunId,
    pub tool: String,
    pub args_summary: String,
    pub result_summary: String,
    pub elapsed_ms: u64,
    pub error: Option<ToolErrorKind>,
}

/// A phase lifecycle change.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusEvent {
    pub run: PhaseRunId,
    pub state: PhaseStatus,
    pub step_count: usize,
    pub reason: Option<ReasonCode>,
}

/// Port for recording run artifacts.
///
/// Methods are synchronous and infallible. Implementations log their own
/// write failures.
pub trait ArtifactRecorder: Send + Sync {
    /// Append one transcript entry for a phase run.
    fn transcript(&self, run: PhaseRunId, entry: &TranscriptEntry);

    /// Record a tool execution.
    fn tool_event(&self, event: &ToolEvent);

    /// Replace the plan snapshot of a phase run.
    fn plan_snapshot(&self, run: PhaseRunId, plan: &Plan);

    /// Record a status change.
    fn status(&self, event: &StatusEvent);

    /// Record the final report of a pipeline run.
    fn run_report(&self, _report: &RunReport) {}
}

/// No-op implementation for tests and when recording is disabled.
pub struct NoArtifacts;

impl ArtifactRecorder for NoArtifacts {
    fn transcript(&self, _run: PhaseRunId, _entry: &TranscriptEntry) {}
    fn tool_event(&self, _event: &ToolEvent) {}
    fn plan_snapshot(&self, _run: PhaseRunId, _plan: &Plan) {}
    fn status(&self, _event: &StatusEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_run_label() {
        assert_eq!(PhaseRunId::new(Phase::Coder, 2).label(), "coder-2");
        assert_eq!(PhaseRunId::new(Phase::TestLint, 1).label(), "testlint-1");
    }
}
