//! Input and interruption types for the agent loop.

use patchpilot_domain::{Phase, Plan, ToolSpec};
use thiserror::Error;
use tokio::time::Instant;

/// Everything one phase run needs.
#[derive(Debug, Clone)]
pub struct PhaseRequest {
    pub phase: Phase,
    /// Run number of this phase within the pipeline (1-based)
    pub run: u32,
    pub system_prompt: String,
    /// First user message: task plus prior phase outputs
    pub seed: String,
    /// The role's tools, finalize excluded
    pub tools: ToolSpec,
    /// Plan to start from; counts as this run's one plan creation
    pub seed_plan: Option<Plan>,
    pub max_steps: usize,
    /// Check the plan before accepting finalize(done=true)
    pub validate_finalize: bool,
    /// Run-level wall clock
    pub deadline: Option<Instant>,
}

impl PhaseRequest {
    pub fn new(
        phase: Phase,
        system_prompt: impl Into<String>,
        seed: impl Into<String>,
        tools: ToolSpec,
    ) -> Self {
        Self {
            phase,
            run: 1,
            system_prompt: system_prompt.into(),
            seed: seed.into(),
            tools,
            seed_plan: None,
            max_steps: 50,
            validate_finalize: phase.validates_plan_at_finalize(),
            deadline: None,
        }
    }

    pub fn with_run(mut self, run: u32) -> Self {
        self.run = run;
        self
    }

    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.seed_plan = Some(plan);
        self
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Instant>) -> Self {
        self.deadline = deadline;
        self
    }
}

/// Why a run stopped before its own logic ended it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunInterrupted {
    #[error("Operation cancelled")]
    Cancelled,

    #[error("Run time budget exhausted")]
    DeadlineReached,
}
