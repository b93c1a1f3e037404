//! Engine settings and their validation

pub mod settings;
pub mod validation;

pub use settings::{AgentSettings, RoleSettings};
pub use validation::{ConfigIssue, ConfigIssueCode, Severity};
