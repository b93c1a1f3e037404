//! Tool domain traits
//!
//! Contains pure domain logic for validating tool calls against their
//! declared schema. The async executor port lives in the application layer.

use super::entities::{ToolCall, ToolDefinition};
use serde_json::Value;

/// Validator for tool calls
///
/// This is a pure domain trait that validates tool calls
/// against their definitions without any I/O operations.
pub trait ToolValidator {
    /// Validate a tool call against its definition
    fn validate(&self, call: &ToolCall, definition: &ToolDefinition) -> Result<(), String>;
}

/// Default implementation of ToolValidator
///
/// Checks required parameters, rejects unknown parameters, and checks the
/// JSON type of every supplied argument.
#[derive(Debug, Clone, Default)]
pub struct DefaultToolValidator;

impl ToolValidator for DefaultToolValidator {
    fn validate(&self, call: &ToolCall, definition: &ToolDefinition) -> Result<(), String> {
        for param in &definition.parameters {
            if param.required && !call.arguments.contains_key(&param.name) {
                return Err(format!(
                    "Missing required parameter '{}' for tool '{}'",
                    param.name, definition.name
                ));
            }
        }

        // Sorted so the reported error is deterministic
        let mut arg_names: Vec<&String> = call.arguments.keys().collect();
        arg_names.sort();

        for arg_name in arg_names {
            let Some(param) = definition.parameter(arg_name) else {
                return Err(format!(
                    "Unknown parameter '{}' for tool '{}'",
                    arg_name, definition.name
                ));
            };
            let value = &call.arguments[arg_name];
            if !matches_type(value, &param.param_type) {
                return Err(format!(
                    "Parameter '{}' for tool '{}' must be of type {}, got {}",
                    arg_name,
                    definition.name,
                    param.param_type,
                    json_type_name(value)
                ));
            }
            if let (Some(item_type), Value::Array(items)) = (&param.item_type, value)
                && let Some(bad) = items.iter().find(|v| !matches_type(v, item_type))
            {
                return Err(format!(
                    "Elements of '{}' for tool '{}' must be of type {}, got {}",
                    arg_name,
                    definition.name,
                    item_type,
                    json_type_name(bad)
                ));
            }
        }

        Ok(())
    }
}

/// Whether `value` conforms to the declared parameter type.
///
/// `null` is accepted for any type and treated as "not supplied".
fn matches_type(value: &Value, param_type: &str) -> bool {
    match (param_type, value) {
        (_, Value::Null) => true,
        ("string", Value::String(_)) => true,
        ("integer", Value::Number(n)) => n.is_i64() || n.is_u64(),
        ("number", Value::Number(_)) => true,
        ("boolean", Value::Bool(_)) => true,
        ("array", Value::Array(_)) => true,
        ("object", Value::Object(_)) => true,
        // Unrecognized declared types are not checked
        (other, _) => !matches!(
            other,
            "string" | "integer" | "number" | "boolean" | "array" | "object"
        ),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
