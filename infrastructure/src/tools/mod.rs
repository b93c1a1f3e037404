//! Tool implementations for the agent system
//!
//! Concrete workspace tools run by [`LocalToolExecutor`]. Each module
//! exposes a name constant, a `*_definition()` and an `execute_*` handler
//! taking the shared [`ToolContext`].
//!
//! | Module | Tools |
//! |--------|-------|
//! | `command` | shell, run_tests |
//! | `file` | read_file, write_file, list_dir, replace_in_file |
//! | `search` | search |
//! | `patch` | apply_patch |
//! | `notes` | note_write, notes_read |
//!
//! Plan tools and `finalize` are not here: the agent loop owns them.

pub mod command;
pub mod file;
pub mod notes;
pub mod patch;
pub mod schema;
pub mod search;
pub mod workspace;

mod executor;

pub use executor::{BuiltinTool, LocalToolExecutor};
pub use schema::JsonSchemaToolConverter;
pub use workspace::Workspace;

use patchpilot_domain::{AgentSettings, ToolSpec};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Per-tool limits taken from the engine settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolLimits {
    /// Output cap applied to every result
    pub max_output_chars: usize,
    pub shell_timeout: Duration,
    pub test_timeout: Duration,
}

impl ToolLimits {
    pub fn from_settings(settings: &AgentSettings) -> Self {
        Self {
            max_output_chars: settings.max_tool_result_chars,
            shell_timeout: settings.shell_timeout(),
            test_timeout: settings.test_timeout(),
        }
    }
}

impl Default for ToolLimits {
    fn default() -> Self {
        Self::from_settings(&AgentSettings::default())
    }
}

/// Everything a tool handler may touch.
#[derive(Debug, Clone)]
pub struct ToolContext {
    pub workspace: Workspace,
    pub limits: ToolLimits,
    /// Append-only notes sink
    pub notes_path: PathBuf,
}

impl ToolContext {
    /// `artifacts_dir` may be relative to the workspace root.
    pub fn new(
        root: impl AsRef<Path>,
        artifacts_dir: impl AsRef<Path>,
        limits: ToolLimits,
    ) -> io::Result<Self> {
        let workspace = Workspace::new(root)?;
        let artifacts_dir = artifacts_dir.as_ref();
        let artifacts_dir = if artifacts_dir.is_absolute() {
            artifacts_dir.to_path_buf()
        } else {
            workspace.root().join(artifacts_dir)
        };
        Ok(Self {
            workspace,
            limits,
            notes_path: artifacts_dir.join("notes.jsonl"),
        })
    }
}

/// Aliases for names models commonly use instead of the canonical ones.
pub const TOOL_ALIASES: &[(&str, &str)] = &[
    ("bash", command::SHELL),
    ("run_command", command::SHELL),
    ("execute", command::SHELL),
    ("cat", file::READ_FILE),
    ("ls", file::LIST_DIR),
    ("grep", search::SEARCH),
    ("grep_search", search::SEARCH),
    ("edit_file", file::REPLACE_IN_FILE),
    ("patch", patch::APPLY_PATCH),
];

/// Create the default tool set with all workspace tools
pub fn default_tool_spec() -> ToolSpec {
    let spec = BuiltinTool::ALL
        .iter()
        .fold(ToolSpec::new(), |spec, tool| spec.register(tool.definition()));
    TOOL_ALIASES
        .iter()
        .fold(spec, |spec, (alias, canonical)| spec.register_alias(*alias, *canonical))
}
