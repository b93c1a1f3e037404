//! Console output for run reports

use colored::Colorize;
use patchpilot_domain::{PhaseOutput, PhaseStatus, RunReport, RunStatus};
use std::path::Path;

/// Formats run reports for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Format the complete run report
    pub fn format(report: &RunReport, artifacts_dir: Option<&Path>) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("patchpilot run"));
        output.push('\n');

        output.push_str(&Self::section_header("Phases"));
        for phase in &report.phases {
            output.push_str(&Self::phase_line(phase));
        }

        if let Some(plan) = report.phases.iter().rev().find_map(|p| p.plan.as_ref())
            && !plan.is_empty()
        {
            output.push_str(&Self::section_header("Plan"));
            output.push_str(&Self::indent(&plan.render(), "  "));
            output.push('\n');
        }

        output.push_str(&format!(
            "\n{} {}  ({} coder iteration(s))\n",
            "Result:".cyan().bold(),
            Self::status_text(report.status),
            report.coder_iterations
        ));
        if let Some(dir) = artifacts_dir {
            output.push_str(&format!("{} {}\n", "Artifacts:".cyan().bold(), dir.display()));
        }

        output.push_str(&Self::footer());
        output
    }

    /// Format as JSON
    pub fn format_json(report: &RunReport) -> String {
        serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string())
    }

    fn phase_line(phase: &PhaseOutput) -> String {
        let name = format!("{} #{}", phase.phase.display_name(), phase.run);
        let status = match phase.status {
            PhaseStatus::Done => phase.status.to_string().green(),
            PhaseStatus::Incomplete => phase.status.to_string().yellow(),
            _ => phase.status.to_string().red(),
        };
        let mut line = format!(
            "  {:<14} {:<10} {} ({} steps)\n",
            name,
            status,
            phase.reason.to_string().dimmed(),
            phase.step_count
        );
        let summary = phase.summary.trim();
        if !summary.is_empty() {
            line.push_str(&Self::indent(summary, "      "));
            line.push('\n');
        }
        line
    }

    fn status_text(status: RunStatus) -> colored::ColoredString {
        match status {
            RunStatus::Done => "DONE".green().bold(),
            RunStatus::Incomplete => "INCOMPLETE".yellow().bold(),
            RunStatus::Failed => "FAILED".red().bold(),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use patchpilot_domain::{Phase, Plan, ReasonCode, Step};

    fn report() -> RunReport {
        let plan = Plan {
            steps: vec![Step::new("flag", "Add the --json flag")],
        };
        RunReport {
            status: RunStatus::Incomplete,
            phases: vec![
                PhaseOutput::new(Phase::Analysis, 1, ReasonCode::Finalized, "Rust CLI"),
                PhaseOutput::new(Phase::Coder, 1, ReasonCode::StepBudgetExceeded, "")
                    .with_plan(plan),
            ],
            coder_iterations: 1,
        }
    }

    #[test]
    fn test_format_lists_phases_and_plan() {
        colored::control::set_override(false);
        let text = ConsoleFormatter::format(&report(), Some(Path::new("/repo/.patchpilot")));
        assert!(text.contains("Analysis #1"));
        assert!(text.contains("Rust CLI"));
        assert!(text.contains("Add the --json flag"));
        assert!(text.contains("INCOMPLETE"));
        assert!(text.contains("/repo/.patchpilot"));
    }

    #[test]
    fn test_format_json_round_trips() {
        let json = ConsoleFormatter::format_json(&report());
        let parsed: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, report());
    }

    #[test]
    fn test_indent() {
        assert_eq!(ConsoleFormatter::indent("a\nb", "> "), "> a\n> b");
    }
}
