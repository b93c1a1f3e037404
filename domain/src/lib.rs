//! Domain layer for patchpilot
//!
//! This crate contains the core entities and value objects of the
//! orchestration engine. It has no dependencies on infrastructure or
//! presentation concerns and performs no I/O.
//!
//! # Core Concepts
//!
//! - **Phase**: one stage of the fixed pipeline (Analysis, Setup, Planner,
//!   Coder, TestLint), sequenced by the pure [`next_step`] function
//! - **ConversationHistory**: the ordered messages of one phase run, kept
//!   under a character budget by compaction
//! - **PlanStore**: the ordered steps a phase works against, with the
//!   stuck-ratio and core-step rules that guard "done" claims
//! - **ToolSpec / ToolCall / ToolResult**: the declared tool surface and the
//!   calls made against it

pub mod agent;
pub mod config;
pub mod core;
pub mod plan;
pub mod prompt;
pub mod session;
pub mod tool;

// Re-export commonly used types
pub use agent::{
    Action, AgentRunResult, FINALIZE_TOOL, Phase, PhaseOutput, PhaseState, PhaseStatus,
    ReasonCode, RunReport, RunStatus, Transition, finalize_definition, next_step,
};
pub use config::{AgentSettings, ConfigIssue, ConfigIssueCode, RoleSettings, Severity};
pub use core::string::{clip, truncate};
pub use plan::{
    AllowAllStuckPolicy, FnStuckPolicy, KeywordStuckPolicy, Plan, PlanError, PlanStore, Step,
    StepDraft, StuckPolicy, default_plan,
};
pub use prompt::PhasePromptTemplate;
pub use session::{ConversationHistory, HistoryBudget, KeepLast, Message, Role, TranscriptEntry};
pub use tool::{
    DefaultToolValidator, ToolCall, ToolDefinition, ToolError, ToolErrorKind, ToolParameter,
    ToolResult, ToolResultMetadata, ToolSpec, ToolValidator,
};
