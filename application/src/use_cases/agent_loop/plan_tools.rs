//! Plan tools: `plan_create`, `plan_update`, `plan_read`.
//!
//! These run inside the agent loop against the phase run's own
//! [`PlanStore`], never through the tool executor. Rejected operations come
//! back as `VALIDATION` results so the model can correct itself.

use patchpilot_domain::{
    PlanStore, StepDraft, ToolCall, ToolDefinition, ToolError, ToolParameter, ToolResult, ToolSpec,
};

pub const PLAN_CREATE: &str = "plan_create";
pub const PLAN_UPDATE: &str = "plan_update";
pub const PLAN_READ: &str = "plan_read";

pub fn is_plan_tool(name: &str) -> bool {
    matches!(name, PLAN_CREATE | PLAN_UPDATE | PLAN_READ)
}

/// Definitions of the three plan tools.
pub fn plan_tool_spec() -> ToolSpec {
    ToolSpec::new()
        .register(
            ToolDefinition::new(
                PLAN_CREATE,
                "Create the plan for this phase. Only the first call creates a plan; later calls \
                 return the existing one.",
            )
            .with_parameter(
                ToolParameter::new(
                    "steps",
                    "Ordered steps, each {\"id\", \"description\", \"rationale\"}",
                    true,
                )
                .array_of("object"),
            ),
        )
        .register(
            ToolDefinition::new(
                PLAN_UPDATE,
                "Change the status of plan steps: in_progress (exactly one id), completed, or \
                 stuck (only for non-core steps blocked by something outside the repository).",
            )
            .with_parameter(ToolParameter::new("ids", "Step ids", true).array_of("string"))
            .with_parameter(ToolParameter::new(
                "status",
                "One of: in_progress, completed, stuck",
                true,
            )),
        )
        .register(ToolDefinition::new(
            PLAN_READ,
            "Show the current plan with each step's status and the next actionable step.",
        ))
}

/// Execute a plan tool. Returns the result and whether the plan changed.
pub fn execute_plan_tool(store: &mut PlanStore, call: &ToolCall) -> (ToolResult, bool) {
    let outcome = match call.tool_name.as_str() {
        PLAN_CREATE => plan_create(store, call),
        PLAN_UPDATE => plan_update(store, call),
        PLAN_READ => Ok((plan_read(store), false)),
        other => Err(ToolError::unknown_tool(other)),
    };

    match outcome {
        Ok((output, changed)) => (ToolResult::success(&call.tool_name, output), changed),
        Err(error) => {
            let output = plan_read(store);
            (ToolResult::failure(&call.tool_name, error).with_output(output), false)
        }
    }
}

fn plan_create(store: &mut PlanStore, call: &ToolCall) -> Result<(String, bool), ToolError> {
    let raw = call
        .get_array("steps")
        .ok_or_else(|| ToolError::invalid_argument("'steps' must be an array of step objects"))?;
    let drafts: Vec<StepDraft> = serde_json::from_value(serde_json::Value::Array(raw.clone()))
        .map_err(|e| {
            ToolError::invalid_argument(format!(
                "each step needs string 'id' and 'description' (and optional 'rationale'): {}",
                e
            ))
        })?;

    let (plan, created) = store
        .create(drafts)
        .map_err(|e| ToolError::validation(e.to_string()))?;

    let output = if created {
        format!("Plan created with {} steps:\n{}", plan.len(), plan.render())
    } else {
        format!(
            "A plan already exists for this phase and was kept:\n{}",
            plan.render()
        )
    };
    Ok((output, created))
}

fn plan_update(store: &mut PlanStore, call: &ToolCall) -> Result<(String, bool), ToolError> {
    let ids: Vec<String> = call
        .get_array("ids")
        .map(|ids| {
            ids.iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default();
    let status = call
        .require_string("status")
        .map_err(ToolError::invalid_argument)?;

    let result = match status {
        "in_progress" => match ids.as_slice() {
            [id] => store.mark_in_progress(id),
            _ => {
                return Err(ToolError::invalid_argument(
                    "in_progress takes exactly one step id",
                ));
            }
        },
        "completed" => store.mark_completed(ids.as_slice()),
        "stuck" => store.mark_stuck(ids.as_slice()),
        other => {
            return Err(ToolError::invalid_argument(format!(
                "unknown status '{}'; expected in_progress, completed or stuck",
                other
            )));
        }
    };
    result.map_err(|e| ToolError::validation(e.to_string()))?;

    Ok((
        format!("Marked {} as {}.\n{}", ids.join(", "), status, plan_read(store)),
        true,
    ))
}

fn plan_read(store: &PlanStore) -> String {
    let Some(plan) = store.plan() else {
        return "NO_PLAN: no plan has been created yet".to_string();
    };
    let next = store
        .next_actionable()
        .map(|s| format!("{}: {}", s.id, s.description))
        .unwrap_or_else(|| "none".to_string());
    format!(
        "{}\n\n{} of {} completed, {} stuck. Next actionable: {}",
        plan.render(),
        plan.completed_count(),
        plan.len(),
        plan.stuck_count(),
        next
    )
}
