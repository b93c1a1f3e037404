//! Results of phase runs and of the whole pipeline

use super::phase::{Phase, PhaseState, PhaseStatus, ReasonCode, RunStatus};
use crate::plan::Plan;
use crate::session::ConversationHistory;
use serde::{Deserialize, Serialize};

/// Terminal result of one Agent Loop run.
///
/// Holds everything the loop produced, so nothing is lost when a phase ends
/// early on a budget or a fatal error.
#[derive(Debug, Clone)]
pub struct AgentRunResult {
    pub state: PhaseState,
    pub reason: ReasonCode,
    /// Finalize summary, or the error that ended the run
    pub summary: Option<String>,
    pub plan: Option<Plan>,
    pub history: ConversationHistory,
}

impl AgentRunResult {
    pub fn status(&self) -> PhaseStatus {
        self.state.status
    }

    pub fn is_done(&self) -> bool {
        self.state.status == PhaseStatus::Done
    }

    /// Artifact handed to the next phase.
    pub fn output(&self) -> PhaseOutput {
        PhaseOutput {
            phase: self.state.phase,
            run: self.state.iteration,
            status: self.state.status,
            reason: self.reason,
            summary: self.summary.clone().unwrap_or_default(),
            plan: self.plan.clone(),
            step_count: self.state.step_count,
        }
    }
}

/// Output artifact of one phase, threaded into later phases' prompts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseOutput {
    pub phase: Phase,
    pub run: u32,
    pub status: PhaseStatus,
    pub reason: ReasonCode,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
    #[serde(default)]
    pub step_count: usize,
}

impl PhaseOutput {
    pub fn new(phase: Phase, run: u32, reason: ReasonCode, summary: impl Into<String>) -> Self {
        Self {
            phase,
            run,
            status: reason.status(),
            reason,
            summary: summary.into(),
            plan: None,
            step_count: 0,
        }
    }

    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plan = Some(plan);
        self
    }

    /// Context block describing this output for a later phase.
    pub fn render(&self) -> String {
        let mut text = format!(
            "## {} (run {}): {} [{}]\n",
            self.phase.display_name(),
            self.run,
            self.status,
            self.reason
        );
        if self.summary.trim().is_empty() {
            text.push_str("(no summary)\n");
        } else {
            text.push_str(self.summary.trim());
            text.push('\n');
        }
        if let Some(plan) = &self.plan
            && !plan.is_empty()
        {
            text.push_str("\nPlan:\n");
            text.push_str(&plan.render());
            text.push('\n');
        }
        text
    }
}

/// Final report of a pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub phases: Vec<PhaseOutput>,
    pub coder_iterations: u32,
}

impl RunReport {
    /// The most recent output of `phase`, if it ran.
    pub fn last_output(&self, phase: Phase) -> Option<&PhaseOutput> {
        self.phases.iter().rev().find(|p| p.phase == phase)
    }
}
