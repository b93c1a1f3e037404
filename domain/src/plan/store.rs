//! Plan Store: the only way a plan is created or mutated during a phase run.

use super::entities::{Plan, Step, StepDraft};
use super::policy::StuckPolicy;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Default maximum share of stuck steps allowed at finalize time.
pub const DEFAULT_STUCK_RATIO_THRESHOLD: f64 = 0.6;

/// Rejected plan operations. The plan is unchanged whenever one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("no plan has been created yet")]
    NoPlan,

    #[error("a plan needs at least one step")]
    EmptyPlan,

    #[error("duplicate step id: {0}")]
    DuplicateStepId(String),

    #[error("step ids must not be empty")]
    EmptyStepId,

    #[error("no step ids given")]
    NoIds,

    #[error("unknown step id(s): {}", .0.join(", "))]
    UnknownSteps(Vec<String>),

    #[error("step {0} is already completed")]
    AlreadyCompleted(String),

    #[error(
        "{stuck} of {total} steps stuck exceeds the allowed ratio {threshold}"
    )]
    StuckRatioExceeded {
        stuck: usize,
        total: usize,
        threshold: f64,
    },

    #[error("core implementation step(s) cannot be marked stuck: {}", .0.join(", "))]
    CoreStepStuck(Vec<String>),

    #[error("plan has incomplete steps: {}", .0.join(", "))]
    IncompleteSteps(Vec<String>),
}

/// Holds the plan of one phase run and enforces its invariants.
///
/// - a plan is created at most once (a second `create` returns the existing plan)
/// - step ids are unique
/// - completed is one-way
/// - the stuck ratio never exceeds the threshold
/// - steps the [`StuckPolicy`] classifies as core are never stuck
pub struct PlanStore {
    plan: Option<Plan>,
    policy: Arc<dyn StuckPolicy>,
    threshold: f64,
}

impl std::fmt::Debug for PlanStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanStore")
            .field("plan", &self.plan)
            .field("threshold", &self.threshold)
            .finish()
    }
}

impl PlanStore {
    pub fn new(policy: Arc<dyn StuckPolicy>, threshold: f64) -> Self {
        Self {
            plan: None,
            policy,
            threshold,
        }
    }

    /// Start the store with an existing plan, which counts as this run's
    /// one creation.
    pub fn with_plan(mut self, plan: Plan) -> Self {
        self.plan = Some(plan);
        self
    }

    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    pub fn snapshot(&self) -> Option<Plan> {
        self.plan.clone()
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Create the plan. Returns the plan and whether it was newly created.
    pub fn create(&mut self, drafts: Vec<StepDraft>) -> Result<(&Plan, bool), PlanError> {
        if self.plan.is_some() {
            return Ok((self.plan.as_ref().ok_or(PlanError::NoPlan)?, false));
        }
        if drafts.is_empty() {
            return Err(PlanError::EmptyPlan);
        }

        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(drafts.len());
        for (order, draft) in drafts.into_iter().enumerate() {
            let id = draft.id.trim().to_string();
            if id.is_empty() {
                return Err(PlanError::EmptyStepId);
            }
            if !seen.insert(id.clone()) {
                return Err(PlanError::DuplicateStepId(id));
            }
            let mut step = Step::new(id, draft.description).with_rationale(draft.rationale);
            step.order = order;
            steps.push(step);
        }

        let plan: &Plan = self.plan.insert(Plan { steps });
        Ok((plan, true))
    }

    /// Mark one step as the one being worked on. Clears its stuck flag.
    pub fn mark_in_progress(&mut self, id: &str) -> Result<(), PlanError> {
        let plan = self.plan.as_mut().ok_or(PlanError::NoPlan)?;
        let step = plan
            .get(id)
            .ok_or_else(|| PlanError::UnknownSteps(vec![id.to_string()]))?;
        if step.completed {
            return Err(PlanError::AlreadyCompleted(id.to_string()));
        }
        for step in plan.steps.iter_mut() {
            step.in_progress = step.id == id;
            if step.in_progress {
                step.stuck = false;
            }
        }
        Ok(())
    }

    /// Mark steps completed. Completion also clears stuck and in-progress.
    pub fn mark_completed<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<(), PlanError> {
        let plan = self.plan.as_mut().ok_or(PlanError::NoPlan)?;
        check_ids(plan, ids)?;
        for id in ids {
            if let Some(step) = plan.get_mut(id.as_ref()) {
                step.completed = true;
                step.stuck = false;
                step.in_progress = false;
            }
        }
        Ok(())
    }

    /// Mark steps stuck, enforcing the ratio threshold and the core-step
    /// policy over the resulting plan.
    pub fn mark_stuck<S: AsRef<str>>(&mut self, ids: &[S]) -> Result<(), PlanError> {
        let plan = self.plan.as_ref().ok_or(PlanError::NoPlan)?;
        check_ids(plan, ids)?;

        let targets: HashSet<&str> = ids.iter().map(|s| s.as_ref()).collect();
        if let Some(done) = plan
            .steps
            .iter()
            .find(|s| s.completed && targets.contains(s.id.as_str()))
        {
            return Err(PlanError::AlreadyCompleted(done.id.clone()));
        }

        let core: Vec<String> = plan
            .steps
            .iter()
            .filter(|s| targets.contains(s.id.as_str()) && self.policy.is_core(s))
            .map(|s| s.id.clone())
            .collect();
        if !core.is_empty() {
            return Err(PlanError::CoreStepStuck(core));
        }

        let stuck_after = plan
            .steps
            .iter()
            .filter(|s| s.stuck || targets.contains(s.id.as_str()))
            .count();
        let total = plan.len();
        if stuck_after as f64 / total as f64 > self.threshold {
            return Err(PlanError::StuckRatioExceeded {
                stuck: stuck_after,
                total,
                threshold: self.threshold,
            });
        }

        if let Some(plan) = self.plan.as_mut() {
            for step in plan.steps.iter_mut() {
                if targets.contains(step.id.as_str()) {
                    step.stuck = true;
                    step.in_progress = false;
                }
            }
        }
        Ok(())
    }

    /// First step in creation order that is neither completed nor stuck.
    pub fn next_actionable(&self) -> Option<&Step> {
        self.plan.as_ref().and_then(|p| p.next_actionable())
    }

    /// Check whether the run may be finalized as done.
    ///
    /// Without a plan there is nothing to check. With one, every step must
    /// be completed or stuck, the stuck ratio must be within the threshold,
    /// and no stuck step may be core.
    pub fn validate_finalize(&self) -> Result<(), PlanError> {
        let Some(plan) = self.plan.as_ref() else {
            return Ok(());
        };

        let incomplete = plan.incomplete_ids();
        if !incomplete.is_empty() {
            return Err(PlanError::IncompleteSteps(incomplete));
        }

        if plan.stuck_ratio() > self.threshold {
            return Err(PlanError::StuckRatioExceeded {
                stuck: plan.stuck_count(),
                total: plan.len(),
                threshold: self.threshold,
            });
        }

        let core: Vec<String> = plan
            .steps
            .iter()
            .filter(|s| s.stuck && self.policy.is_core(s))
            .map(|s| s.id.clone())
            .collect();
        if !core.is_empty() {
            return Err(PlanError::CoreStepStuck(core));
        }

        Ok(())
    }
}

fn check_ids<S: AsRef<str>>(plan: &Plan, ids: &[S]) -> Result<(), PlanError> {
    if ids.is_empty() {
        return Err(PlanError::NoIds);
    }
    let unknown: Vec<String> = ids
        .iter()
        .map(|s| s.as_ref())
        .filter(|id| plan.get(id).is_none())
        .map(|id| id.to_string())
        .collect();
    if unknown.is_empty() {
        Ok(())
    } else {
        Err(PlanError::UnknownSteps(unknown))
    }
}
