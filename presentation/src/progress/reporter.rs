//! Progress reporting for pipeline runs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use patchpilot_application::AgentProgressNotifier;
use patchpilot_domain::{Phase, PhaseOutput, PhaseStatus, Plan, ToolErrorKind, truncate};
use std::sync::Mutex;
use std::time::Duration;

fn status_mark(status: PhaseStatus) -> colored::ColoredString {
    match status {
        PhaseStatus::Done => "v".green(),
        PhaseStatus::Incomplete => "~".yellow(),
        _ => "x".red(),
    }
}

fn plan_line(plan: &Plan) -> String {
    format!(
        "plan: {}/{} completed, {} stuck",
        plan.completed_count(),
        plan.len(),
        plan.stuck_count()
    )
}

/// Reports progress with a spinner per phase
pub struct ProgressReporter {
    phase_bar: Mutex<Option<ProgressBar>>,
    verbose: bool,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            phase_bar: Mutex::new(None),
            verbose: false,
        }
    }

    /// Also print every tool call and narration line
    pub fn verbose() -> Self {
        Self {
            phase_bar: Mutex::new(None),
            verbose: true,
        }
    }

    fn phase_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap()
    }

    fn set_message(&self, message: String) {
        if let Ok(bar) = self.phase_bar.lock()
            && let Some(pb) = bar.as_ref()
        {
            pb.set_message(message);
        }
    }

    fn println(&self, line: String) {
        if let Ok(bar) = self.phase_bar.lock()
            && let Some(pb) = bar.as_ref()
        {
            pb.println(line);
            return;
        }
        println!("{}", line);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentProgressNotifier for ProgressReporter {
    fn on_phase_start(&self, phase: Phase, run: u32) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(Self::phase_style());
        pb.set_prefix(format!("{} (run {})", phase.display_name(), run));
        pb.set_message("starting...");
        pb.enable_steady_tick(Duration::from_millis(100));

        if let Ok(mut bar) = self.phase_bar.lock()
            && let Some(previous) = bar.replace(pb)
        {
            previous.finish_and_clear();
        }
    }

    fn on_phase_complete(&self, output: &PhaseOutput) {
        if let Ok(mut bar) = self.phase_bar.lock()
            && let Some(pb) = bar.take()
        {
            pb.finish_and_clear();
        }
        println!(
            "{} {} {} [{}] after {} step(s)",
            status_mark(output.status),
            output.phase.display_name().bold(),
            output.status,
            output.reason,
            output.step_count
        );
        if !output.summary.trim().is_empty() {
            println!("    {}", truncate(output.summary.trim(), 200).dimmed());
        }
    }

    fn on_step(&self, _phase: Phase, step: usize, max_steps: usize) {
        self.set_message(format!("step {}/{}", step, max_steps));
    }

    fn on_model_retry(&self, attempt: usize, reason: &str) {
        self.println(format!(
            "    {} model retry {}: {}",
            "!".yellow(),
            attempt,
            truncate(reason, 120)
        ));
    }

    fn on_assistant_message(&self, text: &str) {
        if self.verbose {
            self.println(format!("    {}", truncate(text.trim(), 200).dimmed()));
        }
    }

    fn on_tool_call(&self, tool_name: &str, args: &str) {
        self.set_message(format!("{} {}", tool_name.cyan(), truncate(args, 60)));
        if self.verbose {
            self.println(format!("    {} {} {}", "->".blue(), tool_name, truncate(args, 120)));
        }
    }

    fn on_tool_error(&self, tool_name: &str, kind: ToolErrorKind, message: &str) {
        self.println(format!(
            "    {} {} [{}] {}",
            "x".red(),
            tool_name,
            kind,
            truncate(message, 120)
        ));
    }

    fn on_plan_updated(&self, plan: &Plan) {
        if self.verbose {
            self.println(format!("    {}", plan_line(plan).dimmed()));
        }
    }

    fn on_finalize_rejected(&self, reason: &str) {
        self.println(format!("    {} finalize rejected: {}", "!".yellow(), reason));
    }
}

/// Simple text-based progress (no fancy UI)
pub struct SimpleProgress;

impl AgentProgressNotifier for SimpleProgress {
    fn on_phase_start(&self, phase: Phase, run: u32) {
        println!("{} {} (run {})", "->".cyan(), phase.display_name().bold(), run);
    }

    fn on_phase_complete(&self, output: &PhaseOutput) {
        println!(
            "  {} {} [{}]",
            status_mark(output.status),
            output.status,
            output.reason
        );
    }

    fn on_tool_call(&self, tool_name: &str, _args: &str) {
        println!("  {} {}", "-".dimmed(), tool_name);
    }

    fn on_tool_error(&self, tool_name: &str, kind: ToolErrorKind, _message: &str) {
        println!("  {} {} [{}]", "x".red(), tool_name, kind);
    }

    fn on_finalize_rejected(&self, reason: &str) {
        println!("  {} finalize rejected: {}", "!".yellow(), reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchpilot_domain::Step;

    #[test]
    fn test_plan_line() {
        let mut done = Step::new("a", "Add flag");
        done.completed = true;
        let mut blocked = Step::new("b", "Deploy");
        blocked.stuck = true;
        let plan = Plan {
            steps: vec![done, blocked, Step::new("c", "Write tests")],
        };
        assert_eq!(plan_line(&plan), "plan: 1/3 completed, 1 stuck");
    }

    #[test]
    fn test_reporter_without_phase_does_not_panic() {
        let reporter = ProgressReporter::new();
        reporter.on_step(Phase::Coder, 1, 10);
        reporter.on_tool_call("shell", "{\"command\":\"ls\"}");
    }
}
