//! Phase Controller use case
//!
//! Drives the fixed pipeline Analysis → Setup → Planner → Coder → TestLint,
//! re-running the Coder with the TestLint failure summary while tests keep
//! failing and the iteration cap allows. Sequencing itself is the pure
//! [`next_step`] function; this use case builds each phase's request, runs
//! it through the [`AgentLoop`], and threads outputs forward:
//!
//! - each phase's seed carries the latest output of every earlier phase
//! - the Planner's plan seeds the Coder's plan store (or the default plan)
//! - a Coder re-run continues from the previous Coder's plan
//! - a failing TestLint summary becomes the next Coder's failure detail

use crate::use_cases::agent_loop::plan_tools::plan_tool_spec;
use crate::use_cases::agent_loop::{AgentLoop, PhaseRequest};
use patchpilot_domain::{
    AgentRunResult, FINALIZE_TOOL, Phase, PhaseOutput, PhasePromptTemplate, PhaseStatus, Plan,
    RunReport, RunStatus, ToolSpec, Transition, default_plan, next_step,
};
use std::collections::HashMap;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

/// Errors raised while assembling the controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhaseControllerError {
    #[error("Unknown tool(s) configured for the {phase} role: {}", names.join(", "))]
    UnknownTools { phase: Phase, names: Vec<String> },
}

/// Pipeline state threaded between phases.
#[derive(Default)]
struct Pipeline {
    outputs: Vec<PhaseOutput>,
    plan: Option<Plan>,
    failure: Option<String>,
    coder_iterations: u32,
}

impl Pipeline {
    /// Latest output of every phase that precedes `phase` in pipeline order.
    fn prior_for(&self, phase: Phase) -> Vec<PhaseOutput> {
        Phase::ALL
            .iter()
            .take_while(|p| **p != phase)
            .filter_map(|p| self.outputs.iter().rev().find(|o| o.phase == *p))
            .cloned()
            .collect()
    }

    fn run_number(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Coder | Phase::TestLint => self.coder_iterations.max(1),
            _ => 1,
        }
    }
}

/// Phase controller
pub struct PhaseController {
    agent: AgentLoop,
    role_tools: HashMap<Phase, ToolSpec>,
    role_prompts: HashMap<Phase, String>,
}

impl PhaseController {
    /// Build the controller, resolving every role's tool subset against the
    /// executor's tools plus the plan tools.
    pub fn new(agent: AgentLoop) -> Result<Self, PhaseControllerError> {
        let catalog = agent.executor().tool_spec().clone().merge(&plan_tool_spec());
        let mut role_tools = HashMap::new();
        for phase in Phase::ALL {
            let names: Vec<String> = agent
                .settings()
                .tools_for(phase)
                .into_iter()
                .filter(|n| n != FINALIZE_TOOL)
                .collect();
            let spec = catalog
                .subset(names.as_slice())
                .map_err(|names| PhaseControllerError::UnknownTools { phase, names })?;
            role_tools.insert(phase, spec);
        }
        Ok(Self {
            agent,
            role_tools,
            role_prompts: HashMap::new(),
        })
    }

    /// Replace the built-in role prompt of `phase`.
    pub fn with_role_prompt(mut self, phase: Phase, prompt: impl Into<String>) -> Self {
        self.role_prompts.insert(phase, prompt.into());
        self
    }

    pub fn with_role_prompts(mut self, prompts: HashMap<Phase, String>) -> Self {
        self.role_prompts.extend(prompts);
        self
    }

    /// Tools (without finalize) offered to `phase`.
    pub fn role_tools(&self, phase: Phase) -> Option<&ToolSpec> {
        self.role_tools.get(&phase)
    }

    /// Run the whole pipeline for `task`.
    pub async fn run(&self, task: &str) -> RunReport {
        let settings = self.agent.settings();
        let deadline = settings.run_timeout().map(|t| Instant::now() + t);
        let max_iterations = settings.max_coder_iterations;
        let mut pipeline = Pipeline::default();
        let mut phase = Phase::first();

        let status = loop {
            if phase == Phase::Coder {
                pipeline.coder_iterations += 1;
            }
            let result = self.run_phase(phase, task, &pipeline, deadline).await;
            let output = result.output();

            match phase {
                Phase::Planner => {
                    pipeline.plan = result.plan.filter(|p| !p.is_empty());
                    if pipeline.plan.is_none() {
                        warn!("Planner produced no plan, the Coder will use the default plan");
                    }
                }
                Phase::Coder => {
                    if let Some(plan) = result.plan {
                        pipeline.plan = Some(plan);
                    }
                }
                Phase::TestLint => {
                    pipeline.failure =
                        (output.status != PhaseStatus::Done).then(|| failure_detail(&output));
                }
                _ => {}
            }

            let transition = next_step(phase, &output, pipeline.coder_iterations, max_iterations);
            pipeline.outputs.push(output);

            match transition {
                Transition::Run(next) => phase = next,
                Transition::Finish(status) => break status,
            }
        };

        self.finish(status, pipeline)
    }

    /// Run a single phase in isolation, without earlier outputs.
    pub async fn run_only(&self, phase: Phase, task: &str) -> RunReport {
        let settings = self.agent.settings();
        let deadline = settings.run_timeout().map(|t| Instant::now() + t);
        let mut pipeline = Pipeline::default();
        if phase == Phase::Coder {
            pipeline.coder_iterations = 1;
        }

        let result = self.run_phase(phase, task, &pipeline, deadline).await;
        let output = result.output();
        let status = match output.status {
            PhaseStatus::Done => RunStatus::Done,
            PhaseStatus::Failed => RunStatus::Failed,
            _ => RunStatus::Incomplete,
        };
        pipeline.outputs.push(output);
        self.finish(status, pipeline)
    }

    async fn run_phase(
        &self,
        phase: Phase,
        task: &str,
        pipeline: &Pipeline,
        deadline: Option<Instant>,
    ) -> AgentRunResult {
        let settings = self.agent.settings();
        let tools = self.role_tools.get(&phase).cloned().unwrap_or_default();
        let role_prompt = self.role_prompts.get(&phase).map(String::as_str);
        let system_prompt = PhasePromptTemplate::system(phase, role_prompt, &tools);

        let failure = match phase {
            Phase::Coder => pipeline.failure.as_deref(),
            _ => None,
        };
        let seed = PhasePromptTemplate::seed(task, &pipeline.prior_for(phase), failure);

        let mut request = PhaseRequest::new(phase, system_prompt, seed, tools)
            .with_run(pipeline.run_number(phase))
            .with_max_steps(settings.max_steps_for(phase))
            .with_deadline(deadline);
        if phase == Phase::Coder {
            request = request.with_plan(pipeline.plan.clone().unwrap_or_else(default_plan));
        }

        self.agent.run(request).await
    }

    fn finish(&self, status: RunStatus, pipeline: Pipeline) -> RunReport {
        let report = RunReport {
            status,
            phases: pipeline.outputs,
            coder_iterations: pipeline.coder_iterations,
        };
        info!(
            status = %report.status,
            phases = report.phases.len(),
            coder_iterations = report.coder_iterations,
            "Run finished"
        );
        self.agent.recorder().run_report(&report);
        report
    }
}

/// What the next Coder run is told about a failed TestLint.
fn failure_detail(output: &PhaseOutput) -> String {
    if output.summary.trim().is_empty() {
        format!(
            "The test/lint phase ended without passing ({}) and reported no details.",
            output.reason
        )
    } else {
        output.summary.clone()
    }
}
