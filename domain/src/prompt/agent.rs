//! Prompt templates for the phase roles
//!
//! Built-in role prompts can be replaced per phase with
//! `<prompts_dir>/<phase>.md`.

use crate::agent::{Phase, PhaseOutput};
use crate::plan::Plan;
use crate::tool::ToolSpec;

/// Templates for generating agent prompts
pub struct PhasePromptTemplate;

impl PhasePromptTemplate {
    /// Built-in role description for `phase`.
    pub fn role(phase: Phase) -> &'static str {
        match phase {
            Phase::Analysis => {
                "You are the analysis agent. Inspect the repository and the task. Record the \
                 language, build system, test and lint commands, and the files most relevant to \
                 the task. Do not modify files. Finalize with a structured summary of what you \
                 found."
            }
            Phase::Setup => {
                "You are the setup agent. Make the environment ready to build and test the \
                 project: install dependencies and verify the toolchain runs. Write notes about \
                 anything that could not be made to work. Finalize with the readiness status."
            }
            Phase::Planner => {
                "You are the planning agent. Break the task into a short ordered plan of concrete \
                 steps with plan_create. Each step needs a unique id, a description and a \
                 rationale. Do not modify files. Finalize once the plan exists."
            }
            Phase::Coder => {
                "You are the coding agent. Work through the plan step by step: mark a step \
                 in_progress, make the change, verify it, then mark it completed. Mark a step \
                 stuck only when it is blocked by something outside the repository. Finalize \
                 with done=true and a commit-style summary when every step is completed or \
                 stuck."
            }
            Phase::TestLint => {
                "You are the test and lint agent. Run the project's tests and linters. If \
                 everything passes, finalize with done=true. If anything fails, finalize with \
                 done=false and a summary listing each failure with file, test name and the \
                 relevant error output."
            }
        }
    }

    /// Instructions describing the response contract.
    pub fn response_contract() -> &'static str {
        r#"## Responding

Use the provided tools. If your model interface has no native tool calling,
reply with exactly one JSON object and nothing else, in one of these forms:

{"type": "message", "text": "..."}
{"type": "tool_calls", "calls": [{"name": "tool_name", "args": {"arg": "value"}}]}
{"type": "finalize", "done": true, "summary": "..."}

Tool calls run in the order given. Tool results arrive as the next messages."#
    }

    /// Full system prompt: role text (or an override), tools, and contract.
    pub fn system(phase: Phase, role_override: Option<&str>, tools: &ToolSpec) -> String {
        let role = role_override.unwrap_or_else(|| Self::role(phase));
        let tool_lines = tools
            .definitions()
            .iter()
            .map(|t| {
                let params = t
                    .parameters
                    .iter()
                    .map(|p| {
                        let required = if p.required { "" } else { "?" };
                        format!("{}{}: {}", p.name, required, p.param_type)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("- {}({}): {}", t.name, params, t.description)
            })
            .collect::<Vec<_>>()
            .join("\n");

        format!(
            "{}\n\n## Tools\n\n{}\n\n{}",
            role.trim(),
            tool_lines,
            Self::response_contract()
        )
    }

    /// First user message of a phase: the task plus prior phase outputs.
    pub fn seed(task: &str, prior: &[PhaseOutput], failure_detail: Option<&str>) -> String {
        let mut seed = format!("# Task\n\n{}\n", task.trim());
        if !prior.is_empty() {
            seed.push_str("\n# Results of earlier phases\n\n");
            for output in prior {
                seed.push_str(&output.render());
                seed.push('\n');
            }
        }
        if let Some(detail) = failure_detail {
            seed.push_str("\n# Outstanding test/lint failures\n\n");
            seed.push_str(detail.trim());
            seed.push_str("\n\nFix these failures before finalizing.\n");
        }
        seed
    }

    /// Transient per-iteration context: plan snapshot and remaining turns.
    pub fn turn_context(plan: Option<&Plan>, step: usize, max_steps: usize) -> String {
        let plan_text = match plan {
            Some(plan) if !plan.is_empty() => {
                let next = plan
                    .next_actionable()
                    .map(|s| format!("{}: {}", s.id, s.description))
                    .unwrap_or_else(|| "none (all steps completed or stuck)".to_string());
                format!("{}\n\nNext actionable step: {}", plan.render(), next)
            }
            _ => "No plan yet.".to_string(),
        };
        format!(
            "<plan>\n{}\n</plan>\n<turns>step {} of {}, {} remaining</turns>",
            plan_text,
            step,
            max_steps,
            max_steps.saturating_sub(step)
        )
    }

    /// Instruction sent after an invalid model reply.
    pub fn corrective(problem: &str) -> String {
        format!(
            "Your previous reply could not be used: {}\nReply again using one of the declared \
             tools with valid arguments, or the JSON response format.",
            problem
        )
    }

    /// Explanation appended when a finalize attempt is rejected.
    pub fn finalize_rejected(reason: &str) -> String {
        format!(
            "ValidationError: finalize rejected: {}\nContinue working: complete the remaining \
             steps, or mark genuinely blocked non-core steps stuck, then finalize again.",
            reason
        )
    }
}
