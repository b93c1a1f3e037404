//! Presentation layer for patchpilot
//!
//! This crate contains the CLI definition, progress reporters and the
//! console summary of a run.

pub mod cli;
pub mod output;
pub mod progress;

// Re-export commonly used types
pub use cli::commands::Cli;
pub use output::console::ConsoleFormatter;
pub use progress::reporter::{ProgressReporter, SimpleProgress};
