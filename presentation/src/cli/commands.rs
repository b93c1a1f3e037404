//! CLI command definitions

use clap::Parser;
use patchpilot_domain::Phase;
use std::path::PathBuf;

/// CLI arguments for patchpilot
#[derive(Parser, Debug)]
#[command(name = "patchpilot")]
#[command(author, version, about = "Drive a language model through analysis, planning, coding and testing")]
#[command(long_about = r#"
patchpilot runs a fixed pipeline of model-driven phases against a workspace:

1. Analysis:  read the repository and record findings
2. Setup:     prepare the environment
3. Planner:   break the task into plan steps
4. Coder:     implement the plan
5. TestLint:  run tests and linters; failures send the Coder back in

Configuration files are loaded from (later sources win):
1. ~/.config/patchpilot/config.toml   User config
2. ./patchpilot.toml                  Project-level config
3. --config <path>                    Explicit config file
4. PATCHPILOT_<SECTION>__<KEY>        Environment variables

Example:
  patchpilot "Add a --json flag to the export command"
  patchpilot --workspace ../repo --provider anthropic --model claude-sonnet-4-5 "Fix the failing parser test"
  patchpilot --phase planner --task-file TASK.md
"#)]
pub struct Cli {
    /// The change to make (or use --task-file)
    pub task: Option<String>,

    /// Read the task from a file
    #[arg(long, value_name = "PATH", conflicts_with = "task")]
    pub task_file: Option<PathBuf>,

    /// Workspace root (overrides [workspace] root)
    #[arg(short, long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Model provider: openai, openrouter or anthropic
    #[arg(long, value_name = "PROVIDER")]
    pub provider: Option<String>,

    /// Model name
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Cap on Coder runs in the Coder/TestLint loop
    #[arg(long, value_name = "N")]
    pub max_coder_iterations: Option<u32>,

    /// Run a single phase only
    #[arg(long, value_name = "PHASE", value_parser = parse_phase)]
    pub phase: Option<Phase>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Also write a daily rolling log under <artifacts_dir>/logs
    #[arg(long)]
    pub log_file: bool,

    /// Print the merged configuration and its sources, then exit
    #[arg(long)]
    pub show_config: bool,
}

fn parse_phase(s: &str) -> Result<Phase, String> {
    s.parse::<Phase>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_full_invocation() {
        let cli = Cli::try_parse_from([
            "patchpilot",
            "--workspace",
            "/tmp/repo",
            "--provider",
            "anthropic",
            "--max-coder-iterations",
            "5",
            "--phase",
            "coder",
            "-vv",
            "Fix it",
        ])
        .unwrap();
        assert_eq!(cli.task.as_deref(), Some("Fix it"));
        assert_eq!(cli.workspace, Some(PathBuf::from("/tmp/repo")));
        assert_eq!(cli.provider.as_deref(), Some("anthropic"));
        assert_eq!(cli.max_coder_iterations, Some(5));
        assert_eq!(cli.phase, Some(Phase::Coder));
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_unknown_phase_is_rejected() {
        assert!(Cli::try_parse_from(["patchpilot", "--phase", "review", "x"]).is_err());
    }

    #[test]
    fn test_task_and_task_file_conflict() {
        assert!(Cli::try_parse_from(["patchpilot", "--task-file", "t.md", "inline"]).is_err());
    }
}
