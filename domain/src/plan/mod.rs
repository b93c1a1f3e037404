//! Plan domain
//!
//! Ordered steps with completed/stuck status, the [`PlanStore`] that guards
//! their invariants, and the pluggable [`StuckPolicy`].

pub mod entities;
pub mod policy;
pub mod store;

pub use entities::{Plan, Step, StepDraft};
pub use policy::{
    AllowAllStuckPolicy, DEFAULT_CORE_KEYWORDS, DEFAULT_OVERRIDE_KEYWORDS, FnStuckPolicy,
    KeywordStuckPolicy, StuckPolicy,
};
pub use store::{DEFAULT_STUCK_RATIO_THRESHOLD, PlanError, PlanStore};

/// Plan used when planning produced none.
pub fn default_plan() -> Plan {
    let steps = [
        ("analyze-repo", "Analyze repository layout and requirements"),
        ("implement-changes", "Make the requested code changes"),
        ("wire-tests", "Add or update tests for the changes"),
        ("iterate-on-failures", "Run the tests and fix failures"),
    ];
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
