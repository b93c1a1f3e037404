//! Agent domain
//!
//! Model actions, pipeline phases and the results of running them.

pub mod action;
pub mod phase;
pub mod result;

pub use action::{Action, FINALIZE_TOOL, finalize_definition};
pub use phase::{Phase, PhaseState, PhaseStatus, ReasonCode, RunStatus, Transition, next_step};
pub use result::{AgentRunResult, PhaseOutput, RunReport};
