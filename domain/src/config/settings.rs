//! Immutable engine settings
//!
//! One [`AgentSettings`] value is built at startup (from the config file
//! layer) and passed by reference into the phase controller, agent loop and
//! tool executor. Nothing reads configuration from global state.

use crate::agent::Phase;
use crate::plan::{DEFAULT_CORE_KEYWORDS, DEFAULT_OVERRIDE_KEYWORDS, DEFAULT_STUCK_RATIO_THRESHOLD};
use crate::session::{HistoryBudget, KeepLast};
use std::collections::HashMap;
use std::time::Duration;

/// Per-role overrides.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoleSettings {
    /// Loop iteration cap for this role
    pub max_steps: Option<usize>,
    /// Tool subset for this role (finalize is always added)
    pub tools: Option<Vec<String>>,
}

/// Engine settings shared by every phase.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentSettings {
    /// Default loop iteration cap
    pub max_steps: usize,
    pub max_history_chars: usize,
    /// Compaction tail size, -1 = unlimited
    pub keep_last_messages: i64,
    pub max_tool_result_chars: usize,
    pub shell_timeout_seconds: u64,
    pub test_timeout_seconds: u64,
    pub stuck_ratio_threshold: f64,
    pub core_keywords: Vec<String>,
    pub override_keywords: Vec<String>,
    pub roles: HashMap<Phase, RoleSettings>,
    /// Cap on Coder runs in the Coder ↔ TestLint loop
    pub max_coder_iterations: u32,
    /// Run-level wall clock
    pub run_timeout_seconds: Option<u64>,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_steps: 50,
            max_history_chars: 100_000,
            keep_last_messages: 40,
            max_tool_result_chars: 4_000,
            shell_timeout_seconds: 60,
            test_timeout_seconds: 180,
            stuck_ratio_threshold: DEFAULT_STUCK_RATIO_THRESHOLD,
            core_keywords: DEFAULT_CORE_KEYWORDS.iter().map(|s| s.to_string()).collect(),
            override_keywords: DEFAULT_OVERRIDE_KEYWORDS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            roles: HashMap::new(),
            max_coder_iterations: 3,
            run_timeout_seconds: None,
        }
    }
}

impl AgentSettings {
    // ==================== Builder Methods ====================

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    pub fn with_history(mut self, max_chars: usize, keep_last: i64) -> Self {
        self.max_history_chars = max_chars;
        self.keep_last_messages = keep_last;
        self
    }

    pub fn with_role(mut self, phase: Phase, role: RoleSettings) -> Self {
        self.roles.insert(phase, role);
        self
    }

    pub fn with_max_coder_iterations(mut self, iterations: u32) -> Self {
        self.max_coder_iterations = iterations;
        self
    }

    pub fn with_shell_timeout(mut self, seconds: u64) -> Self {
        self.shell_timeout_seconds = seconds;
        self
    }

    // ==================== Accessors ====================

    pub fn max_steps_for(&self, phase: Phase) -> usize {
        self.roles
            .get(&phase)
            .and_then(|r| r.max_steps)
            .unwrap_or(self.max_steps)
    }

    /// Tool names configured for `phase`, without finalize.
    pub fn tools_for(&self, phase: Phase) -> Vec<String> {
        match self.roles.get(&phase).and_then(|r| r.tools.clone()) {
            Some(tools) => tools,
            None => phase.default_tools().iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn history_budget(&self) -> HistoryBudget {
        HistoryBudget::new(
            self.max_history_chars,
            KeepLast::from_config(self.keep_last_messages),
        )
    }

    pub fn shell_timeout(&self) -> Duration {
        Duration::from_secs(self.shell_timeout_seconds)
    }

    pub fn test_timeout(&self) -> Duration {
        Duration::from_secs(self.test_timeout_seconds)
    }

    pub fn run_timeout(&self) -> Option<Duration> {
        self.run_timeout_seconds.map(Duration::from_secs)
    }
}
