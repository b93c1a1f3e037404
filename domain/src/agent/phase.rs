//! Phases of the pipeline and their lifecycle
//!
//! The pipeline is fixed: Analysis → Setup → Planner → Coder → TestLint,
//! with Coder ↔ TestLint repeating until tests pass or the iteration cap is
//! reached. [`next_step`] is the whole sequencing logic.

use super::result::PhaseOutput;
use serde::{Deserialize, Serialize};

/// One stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Analysis,
    Setup,
    Planner,
    Coder,
    #[serde(rename = "testlint")]
    TestLint,
}

impl Phase {
    pub const ALL: [Phase; 5] = [
        Phase::Analysis,
        Phase::Setup,
        Phase::Planner,
        Phase::Coder,
        Phase::TestLint,
    ];

    pub fn first() -> Phase {
        Phase::Analysis
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Analysis => "analysis",
            Phase::Setup => "setup",
            Phase::Planner => "planner",
            Phase::Coder => "coder",
            Phase::TestLint => "testlint",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Analysis => "Analysis",
            Phase::Setup => "Setup",
            Phase::Planner => "Planner",
            Phase::Coder => "Coder",
            Phase::TestLint => "Test & Lint",
        }
    }

    /// Tool names available to this phase's role unless configured otherwise.
    ///
    /// `finalize` is always added on top of this list.
    pub fn default_tools(&self) -> &'static [&'static str] {
        match self {
            Phase::Analysis => &["read_file", "list_dir", "search", "shell", "note_write"],
            Phase::Setup => &[
                "shell",
                "read_file",
                "write_file",
                "list_dir",
                "note_write",
                "notes_read",
            ],
            Phase::Planner => &[
                "read_file",
                "list_dir",
                "search",
                "notes_read",
                "plan_create",
                "plan_read",
            ],
            Phase::Coder => &[
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
                "plan_create",
                "plan_update",
                "plan_read",
            ],
            Phase::TestLint => &[
                "run_tests",
                "shell",
                "read_file",
                "list_dir",
                "search",
                "note_write",
                "notes_read",
            ],
        }
    }

    /// Whether a done finalize must pass plan validation. The Planner only
    /// writes the plan, so its steps are never expected to be completed.
    pub fn validates_plan_at_finalize(&self) -> bool {
        !matches!(self, Phase::Planner)
    }

    /// Phases whose failure does not end the run.
    pub fn is_preparatory(&self) -> bool {
        matches!(self, Phase::Analysis | Phase::Setup | Phase::Planner)
    }

    /// Phase that runs after this one. TestLint hands back to the Coder.
    pub fn successor(&self) -> Phase {
        match self {
            Phase::Analysis => Phase::Setup,
            Phase::Setup => Phase::Planner,
            Phase::Planner => Phase::Coder,
            Phase::Coder => Phase::TestLint,
            Phase::TestLint => Phase::Coder,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl std::str::FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace(['-', '_'], "").as_str() {
            "analysis" => Ok(Phase::Analysis),
            "setup" => Ok(Phase::Setup),
            "planner" | "planning" => Ok(Phase::Planner),
            "coder" | "coding" => Ok(Phase::Coder),
            "testlint" | "test" => Ok(Phase::TestLint),
            other => Err(format!("unknown phase: {}", other)),
        }
    }
}

/// Lifecycle status of one phase run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PhaseStatus {
    #[default]
    Pending,
    Running,
    Done,
    Incomplete,
    Failed,
}

impl PhaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseStatus::Pending => "pending",
            PhaseStatus::Running => "running",
            PhaseStatus::Done => "done",
            PhaseStatus::Incomplete => "incomplete",
            PhaseStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PhaseStatus::Done | PhaseStatus::Incomplete | PhaseStatus::Failed
        )
    }
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why a phase run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// Finalize(done=true) passed validation
    Finalized,
    /// Finalize(done=false)
    AgentGaveUp,
    /// Reached the per-phase step cap
    StepBudgetExceeded,
    /// Run-level wall clock expired or the run was cancelled
    RunBudgetExceeded,
    /// Model replies stayed invalid after retries, or transport gave up
    ProtocolError,
    UnknownTool,
    PathEscape,
}

impl ReasonCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonCode::Finalized => "finalized",
            ReasonCode::AgentGaveUp => "agent_gave_up",
            ReasonCode::StepBudgetExceeded => "step_budget_exceeded",
            ReasonCode::RunBudgetExceeded => "run_budget_exceeded",
            ReasonCode::ProtocolError => "protocol_error",
            ReasonCode::UnknownTool => "unknown_tool",
            ReasonCode::PathEscape => "path_escape",
        }
    }

    /// Terminal status a phase takes on for this reason.
    pub fn status(&self) -> PhaseStatus {
        match self {
            ReasonCode::Finalized => PhaseStatus::Done,
            ReasonCode::AgentGaveUp
            | ReasonCode::StepBudgetExceeded
            | ReasonCode::RunBudgetExceeded => PhaseStatus::Incomplete,
            ReasonCode::ProtocolError | ReasonCode::UnknownTool | ReasonCode::PathEscape => {
                PhaseStatus::Failed
            }
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Mutable lifecycle record of one phase run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseState {
    pub phase: Phase,
    pub status: PhaseStatus,
    /// Coder ↔ TestLint iteration this run belongs to (1-based)
    pub iteration: u32,
    /// Loop iterations taken so far
    pub step_count: usize,
}

impl PhaseState {
    pub fn new(phase: Phase, iteration: u32) -> Self {
        Self {
            phase,
            status: PhaseStatus::Pending,
            iteration,
            step_count: 0,
        }
    }

    pub fn start(&mut self) {
        self.status = PhaseStatus::Running;
    }

    pub fn begin_step(&mut self) -> usize {
        self.step_count += 1;
        self.step_count
    }

    pub fn finish(&mut self, reason: ReasonCode) {
        self.status = reason.status();
    }
}

/// Overall outcome of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Done,
    Incomplete,
    Failed,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Done => "done",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the controller does after a phase ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Run(Phase),
    Finish(RunStatus),
}

/// Pure sequencing function.
///
/// `coder_iterations` is the number of Coder runs so far; the Coder is
/// re-run after a failing TestLint only while it is below `max_coder_iterations`.
pub fn next_step(
    current: Phase,
    output: &PhaseOutput,
    coder_iterations: u32,
    max_coder_iterations: u32,
) -> Transition {
    if output.reason == ReasonCode::RunBudgetExceeded {
        return Transition::Finish(RunStatus::Incomplete);
    }

    match (current, output.status) {
        _ if current.is_preparatory() => Transition::Run(current.successor()),
        (_, PhaseStatus::Failed) => Transition::Finish(RunStatus::Failed),
        (Phase::TestLint, PhaseStatus::Done) => Transition::Finish(RunStatus::Done),
        (Phase::TestLint, _) if coder_iterations >= max_coder_iterations => {
            Transition::Finish(RunStatus::Incomplete)
        }
        _ => Transition::Run(current.successor()),
    }
}
