//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted into the immutable
//! [`AgentSettings`] the engine is built from.

mod agent;
mod model;
mod workspace;

pub use agent::{FileAgentConfig, FilePipelineConfig, FileRoleConfig};
pub use model::FileModelConfig;
pub use workspace::FileWorkspaceConfig;

use patchpilot_domain::{AgentSettings, ConfigIssue, ConfigIssueCode, Phase};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Engine limits shared by every role
    pub agent: FileAgentConfig,
    /// Per-role overrides keyed by phase name
    pub roles: BTreeMap<String, FileRoleConfig>,
    /// Coder ↔ TestLint loop and run wall clock
    pub pipeline: FilePipelineConfig,
    /// Model provider
    pub model: FileModelConfig,
    /// Workspace and artifact locations
    pub workspace: FileWorkspaceConfig,
}

impl FileConfig {
    /// Build the engine settings. Unknown role names are skipped
    /// (see [`validate`](Self::validate)).
    pub fn to_settings(&self) -> AgentSettings {
        let agent = &self.agent;
        let mut settings = AgentSettings {
            max_steps: agent.max_steps,
            max_history_chars: agent.max_history_chars,
            keep_last_messages: agent.keep_last_messages.max(-1),
            max_tool_result_chars: agent.max_tool_result_chars,
            shell_timeout_seconds: agent.shell_timeout_seconds,
            test_timeout_seconds: agent.test_timeout_seconds,
            stuck_ratio_threshold: agent.stuck_ratio_threshold,
            core_keywords: agent.core_keywords.clone(),
            override_keywords: agent.override_keywords.clone(),
            max_coder_iterations: self.pipeline.max_coder_iterations,
            run_timeout_seconds: self.pipeline.run_timeout_seconds,
            ..AgentSettings::default()
        };
        for (name, role) in &self.roles {
            if let Ok(phase) = name.parse::<Phase>() {
                settings = settings.with_role(phase, role.to_role_settings());
            }
        }
        settings
    }

    /// Validate the entire configuration, returning all detected issues.
    ///
    /// `known_tools` are the tool names a role override may reference.
    pub fn validate(&self, known_tools: &[&str]) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        for name in self.roles.keys() {
            if name.parse::<Phase>().is_err() {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::UnknownRole,
                    format!(
                        "[roles.{}] is not a phase (expected one of {}), ignoring it",
                        name,
                        Phase::ALL.map(|p| p.as_str()).join(", ")
                    ),
                ));
            }
        }

        if let Err(e) = self.model.provider_kind() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::UnknownProvider,
                format!("model.provider: {}", e),
            ));
        }
        if self.model.timeout_seconds == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroTimeout,
                "model.timeout_seconds cannot be 0",
            ));
        }

        // Checked on the raw value; to_settings already clamps it.
        let mut settings = self.to_settings();
        settings.keep_last_messages = self.agent.keep_last_messages;
        issues.extend(settings.validate(known_tools));

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchpilot_domain::Severity;

    const TOOLS: &[&str] = &["shell", "read_file", "plan_read"];

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[agent]
max_steps = 20
keep_last_messages = -1
stuck_ratio_threshold = 0.5

[roles.coder]
max_steps = 8
tools = ["read_file", "shell"]

[pipeline]
max_coder_iterations = 5
run_timeout_seconds = 600

[model]
provider = "anthropic"
name = "claude-sonnet-4-5"

[workspace]
artifacts_dir = "out"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.validate(TOOLS).is_empty());

        let settings = config.to_settings();
        assert_eq!(settings.max_steps, 20);
        assert_eq!(settings.keep_last_messages, -1);
        assert_eq!(settings.stuck_ratio_threshold, 0.5);
        assert_eq!(settings.max_steps_for(Phase::Coder), 8);
        assert_eq!(settings.max_steps_for(Phase::Setup), 20);
        assert_eq!(settings.max_coder_iterations, 5);
        assert_eq!(settings.run_timeout_seconds, Some(600));
        assert_eq!(config.model.name, "claude-sonnet-4-5");
        assert_eq!(config.workspace.artifacts_dir.to_str(), Some("out"));
    }

    #[test]
    fn test_default_config() {
        let config = FileConfig::default();
        assert!(config.roles.is_empty());
        assert!(config.validate(TOOLS).is_empty());
        assert_eq!(config.to_settings(), AgentSettings::default());
    }

    #[test]
    fn test_validate_reports_issues() {
        let toml_str = r#"
[agent]
shell_timeout_seconds = 0
keep_last_messages = -7

[roles.reviewer]
max_steps = 3

[roles.testlint]
tools = ["launch_rockets"]

[model]
provider = "mistral"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let issues = config.validate(TOOLS);
        let codes: Vec<ConfigIssueCode> = issues.iter().map(|i| i.code).collect();

        assert!(codes.contains(&ConfigIssueCode::UnknownRole));
        assert!(codes.contains(&ConfigIssueCode::UnknownProvider));
        assert!(codes.contains(&ConfigIssueCode::ZeroTimeout));
        assert!(codes.contains(&ConfigIssueCode::UnknownTool));
        let clamp = issues
            .iter()
            .find(|i| i.code == ConfigIssueCode::KeepLastBelowUnlimited)
            .unwrap();
        assert_eq!(clamp.severity, Severity::Warning);

        // the clamp is applied when building settings
        assert_eq!(config.to_settings().keep_last_messages, -1);
    }
}
