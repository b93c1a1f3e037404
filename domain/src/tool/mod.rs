//! Tool domain
//!
//! Tool definitions, the per-role [`ToolSpec`](entities::ToolSpec),
//! call/result value objects and schema validation.

pub mod entities;
pub mod traits;
pub mod value_objects;

pub use entities::{ToolCall, ToolDefinition, ToolParameter, ToolSpec};
pub use traits::{DefaultToolValidator, ToolValidator};
pub use value_objects::{ToolError, ToolErrorKind, ToolResult, ToolResultMetadata};
