//! Command execution tools: shell, run_tests
//!
//! Commands run through `sh -c` in the workspace root, in their own process
//! group. When the wall clock expires the whole group is killed, so
//! background children of the command do not outlive it.

use super::ToolContext;
use patchpilot_domain::{
    ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult, ToolResultMetadata,
};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::{debug, warn};

/// Tool name constants
pub const SHELL: &str = "shell";
pub const RUN_TESTS: &str = "run_tests";

pub fn shell_definition() -> ToolDefinition {
    ToolDefinition::new(
        SHELL,
        "Run a shell command non-interactively in the workspace root. Output is \
         `$ <command>`, `[exit N]`, then combined stdout and stderr.",
    )
    .with_parameter(ToolParameter::new("command", "The command line to run", true))
    .with_parameter(
        ToolParameter::new(
            "timeout_seconds",
            "Wall-clock limit in seconds (default from configuration)",
            false,
        )
        .with_type("integer"),
    )
}

pub fn run_tests_definition() -> ToolDefinition {
    ToolDefinition::new(
        RUN_TESTS,
        "Run the project's test or lint command in the workspace root with the longer \
         test timeout.",
    )
    .with_parameter(ToolParameter::new(
        "command",
        "Test command, e.g. `cargo test` or `pytest -q`",
        true,
    ))
}

pub async fn execute_shell(ctx: &ToolContext, call: &ToolCall) -> ToolResult {
    let command = match call.require_string("command") {
        Ok(c) => c,
        Err(e) => return ToolResult::failure(SHELL, ToolError::invalid_argument(e)),
    };

    let timeout = match call.get_i64("timeout_seconds") {
        Some(secs) if secs > 0 => Duration::from_secs(secs as u64),
        Some(secs) => {
            return ToolResult::failure(
                SHELL,
                ToolError::invalid_argument(format!(
                    "timeout_seconds must be positive, got {}",
                    secs
                )),
            );
        }
        None => ctx.limits.shell_timeout,
    };

    run_command(SHELL, command, ctx.workspace.root(), timeout).await
}

pub async fn execute_run_tests(ctx: &ToolContext, call: &ToolCall) -> ToolResult {
    let command = match call.require_string("command") {
        Ok(c) => c,
        Err(e) => return ToolResult::failure(RUN_TESTS, ToolError::invalid_argument(e)),
    };
    run_command(RUN_TESTS, command, ctx.workspace.root(), ctx.limits.test_timeout).await
}

/// Spawn `sh -c <command>` and wait for it under `timeout`.
async fn run_command(tool: &str, command: &str, cwd: &Path, timeout: Duration) -> ToolResult {
    let start = Instant::now();

    let mut cmd = Command::new(shell_program());
    cmd.arg("-c")
        .arg(command)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    cmd.process_group(0);

    let child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            return ToolResult::failure(
                tool,
                ToolError::execution_failed(format!("Failed to spawn command: {}", e)),
            );
        }
    };
    let pid = child.id();
    debug!(tool, pid, command, "Spawned command");

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) => {
            let duration_ms = start.elapsed().as_millis() as u64;
            let exit_code = output.status.code().unwrap_or(-1);

            let mut text = format!("$ {}\n[exit {}]\n", command, exit_code);
            text.push_str(&String::from_utf8_lossy(&output.stdout));
            text.push_str(&String::from_utf8_lossy(&output.stderr));

            let metadata = ToolResultMetadata {
                duration_ms: Some(duration_ms),
                bytes: Some(text.len()),
                exit_code: Some(exit_code),
                ..Default::default()
            };

            if output.status.success() {
                ToolResult::success(tool, text).with_metadata(metadata)
            } else {
                ToolResult::failure(
                    tool,
                    ToolError::execution_failed(format!("Command exited with status {}", exit_code)),
                )
                .with_output(text)
                .with_metadata(metadata)
            }
        }
        Ok(Err(e)) => ToolResult::failure(
            tool,
            ToolError::execution_failed(format!("Failed to wait for command: {}", e)),
        ),
        Err(_) => {
            kill_process_group(pid);
            warn!(tool, command, timeout_secs = timeout.as_secs(), "Command killed after timeout");
            ToolResult::failure(
                tool,
                ToolError::timeout(format!("'{}' after {}s", command, timeout.as_secs())),
            )
            .with_output(format!("$ {}\n[KILLED AFTER TIMEOUT]\n", command))
            .with_duration(start.elapsed().as_millis() as u64)
        }
    }
}

fn shell_program() -> PathBuf {
    which::which("sh").unwrap_or_else(|_| PathBuf::from("/bin/sh"))
}

#[cfg(unix)]
fn kill_process_group(pid: Option<u32>) {
    let Some(pid) = pid else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group id is the child's pid
    // because it was spawned with process_group(0).
    let rc = unsafe { libc::killpg(pid as libc::pid_t, libc::SIGKILL) };
    if rc != 0 {
        debug!(pid, "Process group already gone");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pid: Option<u32>) {}
