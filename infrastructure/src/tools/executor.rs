//! Local tool executor, the concrete implementation of [`ToolExecutorPort`].
//!
//! [`LocalToolExecutor`] bridges the application layer's abstract port with
//! actual system operations on one workspace.
//!
//! # Dispatch
//!
//! ```text
//! ToolExecutorPort::execute(call)
//!   ├─ resolve alias via ToolSpec     (bash → shell)
//!   ├─ registry lookup                (missing → UNKNOWN_TOOL, nothing runs)
//!   ├─ DefaultToolValidator           (bad args → INVALID_ARGUMENT)
//!   ├─ BuiltinTool handler            (command handlers are async)
//!   └─ clip output to max_output_chars
//! ```

use super::{ToolContext, command, default_tool_spec, file, notes, patch, search};
use async_trait::async_trait;
use patchpilot_application::ports::tool_executor::ToolExecutorPort;
use patchpilot_domain::{
    DefaultToolValidator, ToolCall, ToolDefinition, ToolError, ToolResult, ToolSpec,
    ToolValidator, clip,
};
use std::collections::HashMap;
use tracing::debug;

/// The built-in tool handlers, one variant per tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinTool {
    Shell,
    RunTests,
    ReadFile,
    WriteFile,
    ListDir,
    Search,
    ReplaceInFile,
    ApplyPatch,
    NoteWrite,
    NotesRead,
}

impl BuiltinTool {
    pub const ALL: [BuiltinTool; 10] = [
        BuiltinTool::Shell,
        BuiltinTool::RunTests,
        BuiltinTool::ReadFile,
        BuiltinTool::WriteFile,
        BuiltinTool::ListDir,
        BuiltinTool::Search,
        BuiltinTool::ReplaceInFile,
        BuiltinTool::ApplyPatch,
        BuiltinTool::NoteWrite,
        BuiltinTool::NotesRead,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            BuiltinTool::Shell => command::SHELL,
            BuiltinTool::RunTests => command::RUN_TESTS,
            BuiltinTool::ReadFile => file::READ_FILE,
            BuiltinTool::WriteFile => file::WRITE_FILE,
            BuiltinTool::ListDir => file::LIST_DIR,
            BuiltinTool::Search => search::SEARCH,
            BuiltinTool::ReplaceInFile => file::REPLACE_IN_FILE,
            BuiltinTool::ApplyPatch => patch::APPLY_PATCH,
            BuiltinTool::NoteWrite => notes::NOTE_WRITE,
            BuiltinTool::NotesRead => notes::NOTES_READ,
        }
    }

    pub fn definition(&self) -> ToolDefinition {
        match self {
            BuiltinTool::Shell => command::shell_definition(),
            BuiltinTool::RunTests => command::run_tests_definition(),
            BuiltinTool::ReadFile => file::read_file_definition(),
            BuiltinTool::WriteFile => file::write_file_definition(),
            BuiltinTool::ListDir => file::list_dir_definition(),
            BuiltinTool::Search => search::search_definition(),
            BuiltinTool::ReplaceInFile => file::replace_in_file_definition(),
            BuiltinTool::ApplyPatch => patch::apply_patch_definition(),
            BuiltinTool::NoteWrite => notes::note_write_definition(),
            BuiltinTool::NotesRead => notes::notes_read_definition(),
        }
    }

    async fn run(&self, ctx: &ToolContext, call: &ToolCall) -> ToolResult {
        match self {
            BuiltinTool::Shell => command::execute_shell(ctx, call).await,
            BuiltinTool::RunTests => command::execute_run_tests(ctx, call).await,
            BuiltinTool::ReadFile => file::execute_read_file(ctx, call),
            BuiltinTool::WriteFile => file::execute_write_file(ctx, call),
            BuiltinTool::ListDir => file::execute_list_dir(ctx, call),
            BuiltinTool::Search => search::execute_search(ctx, call),
            BuiltinTool::ReplaceInFile => file::execute_replace_in_file(ctx, call),
            BuiltinTool::ApplyPatch => patch::execute_apply_patch(ctx, call),
            BuiltinTool::NoteWrite => notes::execute_note_write(ctx, call),
            BuiltinTool::NotesRead => notes::execute_notes_read(ctx, call),
        }
    }
}

/// Executor that runs tools against one workspace on the local machine.
#[derive(Debug, Clone)]
pub struct LocalToolExecutor {
    tool_spec: ToolSpec,
    registry: HashMap<String, BuiltinTool>,
    ctx: ToolContext,
}

impl LocalToolExecutor {
    /// Create an executor with every built-in tool.
    pub fn new(ctx: ToolContext) -> Self {
        let registry = BuiltinTool::ALL
            .iter()
            .map(|tool| (tool.name().to_string(), *tool))
            .collect();
        Self {
            tool_spec: default_tool_spec(),
            registry,
            ctx,
        }
    }

    /// Restrict the executor to `names`. Unknown names are ignored.
    pub fn with_only<S: AsRef<str>>(mut self, names: &[S]) -> Self {
        let keep: Vec<&str> = names.iter().map(|n| n.as_ref()).collect();
        self.registry.retain(|name, _| keep.contains(&name.as_str()));
        let kept: Vec<String> = self.registry.keys().cloned().collect();
        if let Ok(spec) = self.tool_spec.subset(kept.as_slice()) {
            self.tool_spec = spec;
        }
        self
    }

    pub fn context(&self) -> &ToolContext {
        &self.ctx
    }
}

#[async_trait]
impl ToolExecutorPort for LocalToolExecutor {
    fn tool_spec(&self) -> &ToolSpec {
        &self.tool_spec
    }

    async fn execute(&self, call: &ToolCall) -> ToolResult {
        let name = self
            .tool_spec
            .resolve(&call.tool_name)
            .unwrap_or(&call.tool_name);

        let (Some(tool), Some(definition)) = (self.registry.get(name), self.tool_spec.get(name))
        else {
            return ToolResult::failure(&call.tool_name, ToolError::unknown_tool(&call.tool_name))
                .with_call_id(&call.id);
        };

        if let Err(e) = DefaultToolValidator.validate(call, definition) {
            return ToolResult::failure(name, ToolError::invalid_argument(e)).with_call_id(&call.id);
        }

        debug!(tool = name, "Executing tool");
        let mut result = tool.run(&self.ctx, call).await;
        result.output = clip(&result.output, self.ctx.limits.max_output_chars);
        result.with_call_id(&call.id)
    }
}
