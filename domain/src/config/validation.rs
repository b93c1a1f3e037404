//! Settings validation
//!
//! Detects settings that cannot work (errors) or that are adjusted at
//! runtime (warnings), and reports them as structured issues.

use super::settings::AgentSettings;
use crate::agent::Phase;

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    ZeroMaxSteps,
    ZeroTimeout,
    ThresholdOutOfRange,
    KeepLastBelowUnlimited,
    UnknownTool,
    ZeroCoderIterations,
    UnknownRole,
    UnknownProvider,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }
}

impl AgentSettings {
    /// Validate the settings against the tools the executor provides.
    pub fn validate(&self, known_tools: &[&str]) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        if self.max_steps == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroMaxSteps,
                "agent.max_steps cannot be 0",
            ));
        }
        if self.shell_timeout_seconds == 0 || self.test_timeout_seconds == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroTimeout,
                "shell and test timeouts must be at least 1 second",
            ));
        }
        if !(self.stuck_ratio_threshold > 0.0 && self.stuck_ratio_threshold <= 1.0) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ThresholdOutOfRange,
                format!(
                    "agent.stuck_ratio_threshold must be in (0, 1], got {}",
                    self.stuck_ratio_threshold
                ),
            ));
        }
        if self.keep_last_messages < -1 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::KeepLastBelowUnlimited,
                format!(
                    "agent.keep_last_messages = {} is treated as -1 (unlimited)",
                    self.keep_last_messages
                ),
            ));
        }
        if self.max_coder_iterations == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroCoderIterations,
                "pipeline.max_coder_iterations cannot be 0",
            ));
        }

        for phase in Phase::ALL {
            if let Some(role) = self.roles.get(&phase) {
                if role.max_steps == Some(0) {
                    issues.push(ConfigIssue::error(
                        ConfigIssueCode::ZeroMaxSteps,
                        format!("roles.{}.max_steps cannot be 0", phase.as_str()),
                    ));
                }
                for tool in role.tools.iter().flatten() {
                    if !known_tools.contains(&tool.as_str()) {
                        issues.push(ConfigIssue::error(
                            ConfigIssueCode::UnknownTool,
                            format!("roles.{}.tools: unknown tool '{}'", phase.as_str(), tool),
                        ));
                    }
                }
            }
        }

        issues
    }
}
