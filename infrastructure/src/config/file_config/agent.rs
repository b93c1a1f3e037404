//! Agent configuration from TOML (`[agent]` and `[roles.<phase>]` sections)

use patchpilot_domain::{AgentSettings, RoleSettings};
use serde::{Deserialize, Serialize};

/// Raw agent configuration from TOML
///
/// # Example
///
/// ```toml
/// [agent]
/// max_steps = 50
/// max_history_chars = 100000
/// keep_last_messages = 40        # -1 = unlimited
/// max_tool_result_chars = 4000
/// shell_timeout_seconds = 60
/// test_timeout_seconds = 180
/// stuck_ratio_threshold = 0.6
/// core_keywords = ["implement", "create", "build", "develop", "add", "write"]
/// override_keywords = ["test", "lint", "setup", "config", "install", "deploy"]
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileAgentConfig {
    /// Default loop iteration cap for every role
    pub max_steps: usize,
    /// Character budget for one phase's conversation history
    pub max_history_chars: usize,
    /// Newest messages compaction always keeps (-1 = unlimited)
    pub keep_last_messages: i64,
    /// Per tool result truncation
    pub max_tool_result_chars: usize,
    pub shell_timeout_seconds: u64,
    pub test_timeout_seconds: u64,
    /// Largest stuck/total ratio a plan may have when finalized
    pub stuck_ratio_threshold: f64,
    /// Steps whose description contains one of these are core work
    pub core_keywords: Vec<String>,
    /// ...unless the description also contains one of these
    pub override_keywords: Vec<String>,
}

impl Default for FileAgentConfig {
    fn default() -> Self {
        let settings = AgentSettings::default();
        Self {
            max_steps: settings.max_steps,
            max_history_chars: settings.max_history_chars,
            keep_last_messages: settings.keep_last_messages,
            max_tool_result_chars: settings.max_tool_result_chars,
            shell_timeout_seconds: settings.shell_timeout_seconds,
            test_timeout_seconds: settings.test_timeout_seconds,
            stuck_ratio_threshold: settings.stuck_ratio_threshold,
            core_keywords: settings.core_keywords,
            override_keywords: settings.override_keywords,
        }
    }
}

/// Raw per-role overrides (`[roles.coder]`, `[roles.testlint]`, ...)
///
/// ```toml
/// [roles.coder]
/// max_steps = 8
/// tools = ["read_file", "apply_patch", "run_tests"]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRoleConfig {
    pub max_steps: Option<usize>,
    pub tools: Option<Vec<String>>,
}

impl FileRoleConfig {
    pub fn to_role_settings(&self) -> RoleSettings {
        RoleSettings {
            max_steps: self.max_steps,
            tools: self.tools.clone(),
        }
    }
}

/// Raw pipeline configuration (`[pipeline]` section)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilePipelineConfig {
    /// Cap on Coder runs in the Coder ↔ TestLint loop
    pub max_coder_iterations: u32,
    /// Wall clock for the whole run
    pub run_timeout_seconds: Option<u64>,
}

impl Default for FilePipelineConfig {
    fn default() -> Self {
        let settings = AgentSettings::default();
        Self {
            max_coder_iterations: settings.max_coder_iterations,
            run_timeout_seconds: settings.run_timeout_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_config_default_matches_settings() {
        let config = FileAgentConfig::default();
        let settings = AgentSettings::default();
        assert_eq!(config.max_steps, settings.max_steps);
        assert_eq!(config.keep_last_messages, 40);
        assert_eq!(config.stuck_ratio_threshold, 0.6);
        assert!(config.core_keywords.contains(&"implement".to_string()));
    }

    #[test]
    fn test_deserialize_partial_agent() {
        let config: FileAgentConfig = toml::from_str("max_steps = 12\nkeep_last_messages = -1").unwrap();
        assert_eq!(config.max_steps, 12);
        assert_eq!(config.keep_last_messages, -1);
        assert_eq!(config.shell_timeout_seconds, 60);
    }

    #[test]
    fn test_pipeline_defaults() {
        let config = FilePipelineConfig::default();
        assert_eq!(config.max_coder_iterations, 3);
        assert!(config.run_timeout_seconds.is_none());
    }
}
