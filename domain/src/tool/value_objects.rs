//! Tool domain value objects: immutable result and error types
//!
//! Every tool execution produces a [`ToolResult`]. Failures are carried
//! inside the result rather than raised, and the [`ToolErrorKind`] decides
//! how the agent loop treats them:
//!
//! | Kind | Fatal? | Typical trigger |
//! |------|--------|-----------------|
//! | `TOOL_EXECUTION` | No | nonzero exit, I/O failure |
//! | `TIMEOUT` | No | shell command exceeded its wall clock |
//! | `NOT_FOUND` | No | file or directory missing |
//! | `INVALID_ARGUMENT` | No | bad argument value |
//! | `INVALID_CONTEXT` | No | patch/replace context did not match |
//! | `VALIDATION` | No | plan mutation rejected by policy |
//! | `PATH_ESCAPE` | Yes | path resolved outside the workspace |
//! | `UNKNOWN_TOOL` | Yes | no handler registered for the name |

use serde::{Deserialize, Serialize};

/// Classification of a tool failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolErrorKind {
    ToolExecution,
    Timeout,
    NotFound,
    InvalidArgument,
    InvalidContext,
    Validation,
    PathEscape,
    UnknownTool,
}

impl ToolErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolErrorKind::ToolExecution => "TOOL_EXECUTION",
            ToolErrorKind::Timeout => "TIMEOUT",
            ToolErrorKind::NotFound => "NOT_FOUND",
            ToolErrorKind::InvalidArgument => "INVALID_ARGUMENT",
            ToolErrorKind::InvalidContext => "INVALID_CONTEXT",
            ToolErrorKind::Validation => "VALIDATION",
            ToolErrorKind::PathEscape => "PATH_ESCAPE",
            ToolErrorKind::UnknownTool => "UNKNOWN_TOOL",
        }
    }

    /// Misuse of the tool contract ends the phase.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ToolErrorKind::PathEscape | ToolErrorKind::UnknownTool)
    }
}

impl std::fmt::Display for ToolErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error that occurred during tool execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub kind: ToolErrorKind,
    /// Human-readable error message
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ToolError {
    pub fn new(kind: ToolErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::NotFound, format!("NOT_FOUND: {}", resource.into()))
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidArgument, message)
    }

    pub fn invalid_context(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::InvalidContext, message)
    }

    pub fn execution_failed(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::ToolExecution, message)
    }

    pub fn timeout(operation: impl Into<String>) -> Self {
        Self::new(
            ToolErrorKind::Timeout,
            format!("Operation timed out: {}", operation.into()),
        )
    }

    pub fn path_escape(path: impl Into<String>) -> Self {
        Self::new(
            ToolErrorKind::PathEscape,
            format!("Path escapes the workspace root: {}", path.into()),
        )
    }

    pub fn unknown_tool(name: impl Into<String>) -> Self {
        Self::new(
            ToolErrorKind::UnknownTool,
            format!("Unknown tool: {}", name.into()),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ToolErrorKind::Validation, message)
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_fatal()
    }
}

impl std::fmt::Display for ToolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(details) = &self.details {
            write!(f, " ({})", details)?;
        }
        Ok(())
    }
}

impl std::error::Error for ToolError {}

/// Result of a tool execution, carrying output and/or error information.
///
/// A failed result may still carry output: a shell command that exits
/// nonzero reports its captured stdout/stderr alongside the error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Identifier of the call this result answers
    pub call_id: String,
    /// Name of the tool that was executed
    pub tool_name: String,
    /// Output text, already clipped to the configured cap
    #[serde(default)]
    pub output: String,
    /// Error information for failed executions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
    #[serde(default)]
    pub metadata: ToolResultMetadata,
}

/// Structured metadata about tool execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolResultMetadata {
    /// Elapsed wall-clock time in milliseconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    /// Number of bytes read or written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
    /// Affected path for file operations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Exit code for process execution
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Number of matches for search operations
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_count: Option<usize>,
}

impl ToolResult {
    /// Create a successful result
    pub fn success(tool_name: impl Into<String>, output: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            tool_name: tool_name.into(),
            output: output.into(),
            error: None,
            metadata: ToolResultMetadata::default(),
        }
    }

    /// Create a failed result
    pub fn failure(tool_name: impl Into<String>, error: ToolError) -> Self {
        Self {
            call_id: String::new(),
            tool_name: tool_name.into(),
            output: String::new(),
            error: Some(error),
            metadata: ToolResultMetadata::default(),
        }
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_metadata(mut self, metadata: ToolResultMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.metadata.duration_ms = Some(duration_ms);
        self
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn error_kind(&self) -> Option<ToolErrorKind> {
        self.error.as_ref().map(|e| e.kind)
    }

    pub fn is_fatal(&self) -> bool {
        self.error.as_ref().is_some_and(|e| e.is_fatal())
    }

    /// Text shown to the model for this result.
    pub fn render(&self) -> String {
        match &self.error {
            None => self.output.clone(),
            Some(err) if self.output.is_empty() => format!("ERROR {}", err),
            Some(err) => format!("ERROR {}\n{}", err, self.output),
        }
    }
}
