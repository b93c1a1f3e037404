//! Configuration file loading for patchpilot
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. Environment variables `PATCHPILOT_<SECTION>__<KEY>`
//! 2. `--config <path>` specified file
//! 3. Project root: `./patchpilot.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/patchpilot/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    FileAgentConfig, FileConfig, FileModelConfig, FilePipelineConfig, FileRoleConfig,
    FileWorkspaceConfig,
};
pub use loader::ConfigLoader;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to load configuration: {0}")]
    Load(Box<figment::Error>),
}
