//! Workspace configuration from TOML (`[workspace]` section)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Raw workspace configuration
///
/// ```toml
/// [workspace]
/// root = "."
/// artifacts_dir = ".patchpilot"   # relative paths live under root
/// prompts_dir = "prompts"         # optional <phase>.md overrides
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWorkspaceConfig {
    pub root: PathBuf,
    pub artifacts_dir: PathBuf,
    pub prompts_dir: Option<PathBuf>,
}

impl Default for FileWorkspaceConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            artifacts_dir: PathBuf::from(".patchpilot"),
            prompts_dir: None,
        }
    }
}

impl FileWorkspaceConfig {
    /// Artifacts directory, resolved against `root` when relative.
    pub fn artifacts_path(&self, root: &Path) -> PathBuf {
        if self.artifacts_dir.is_absolute() {
            self.artifacts_dir.clone()
        } else {
            root.join(&self.artifacts_dir)
        }
    }

    /// Prompts directory, resolved against `root` when relative.
    pub fn prompts_path(&self, root: &Path) -> Option<PathBuf> {
        self.prompts_dir.as_ref().map(|dir| {
            if dir.is_absolute() {
                dir.clone()
            } else {
                root.join(dir)
            }
        })
    }
}
