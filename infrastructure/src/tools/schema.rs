//! JSON Schema tool converter.
//!
//! Turns domain [`ToolDefinition`]s into the JSON Schema shapes the
//! providers send with each request.

use patchpilot_domain::{ToolDefinition, ToolParameter};
use serde_json::{Map, Value, json};

/// Converts tool definitions to provider wire formats.
///
/// Handles param_type → JSON Schema type mapping:
/// - `"string"`, `"integer"`, `"number"`, `"boolean"`, `"object"` pass through
/// - `"array"` → `{"type": "array", "items": {"type": <item_type>}}`
/// - anything else → `"string"`
pub struct JsonSchemaToolConverter;

impl JsonSchemaToolConverter {
    /// The `{"type": "object", ...}` schema of a tool's arguments.
    pub fn parameters_schema(tool: &ToolDefinition) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &tool.parameters {
            properties.insert(param.name.clone(), Self::parameter_schema(param));
            if param.required {
                required.push(json!(param.name));
            }
        }

        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    fn parameter_schema(param: &ToolParameter) -> Value {
        let mut prop = Map::new();
        prop.insert("type".to_string(), json!(schema_type(&param.param_type)));
        if param.param_type == "array" {
            let item_type = param.item_type.as_deref().unwrap_or("string");
            prop.insert("items".to_string(), json!({ "type": schema_type(item_type) }));
        }
        prop.insert("description".to_string(), json!(param.description));
        Value::Object(prop)
    }

    /// OpenAI chat-completions `tools[]` entry.
    pub fn to_openai(tool: &ToolDefinition) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": tool.name,
                "description": tool.description,
                "parameters": Self::parameters_schema(tool),
            }
        })
    }

    /// Anthropic Messages API `tools[]` entry.
    pub fn to_anthropic(tool: &ToolDefinition) -> Value {
        json!({
            "name": tool.name,
            "description": tool.description,
            "input_schema": Self::parameters_schema(tool),
        })
    }
}

fn schema_type(param_type: &str) -> &'static str {
    match param_type {
        "string" => "string",
        "integer" => "integer",
        "number" => "number",
        "boolean" => "boolean",
        "array" => "array",
        "object" => "object",
        _ => "string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_update() -> ToolDefinition {
        ToolDefinition::new("plan_update", "Update steps")
            .with_parameter(ToolParameter::new("ids", "Step ids", true).array_of("string"))
            .with_parameter(ToolParameter::new("status", "New status", true))
            .with_parameter(
                ToolParameter::new("note", "Optional note", false).with_type("weird"),
            )
    }

    #[test]
    fn test_parameters_schema() {
        let schema = JsonSchemaToolConverter::parameters_schema(&plan_update());

        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["ids"]["type"], "array");
        assert_eq!(schema["properties"]["ids"]["items"]["type"], "string");
        assert_eq!(schema["properties"]["status"]["type"], "string");
        // unknown types fall back to string
        assert_eq!(schema["properties"]["note"]["type"], "string");

        let required = schema["required"].as_array().unwrap();
        assert_eq!(required.len(), 2);
        assert!(required.contains(&json!("ids")));
    }

    #[test]
    fn test_openai_shape() {
        let tool = JsonSchemaToolConverter::to_openai(&plan_update());
        assert_eq!(tool["type"], "function");
        assert_eq!(tool["function"]["name"], "plan_update");
        assert_eq!(tool["function"]["parameters"]["type"], "object");
    }

    #[test]
    fn test_anthropic_shape() {
        let tool = JsonSchemaToolConverter::to_anthropic(&plan_update());
        assert_eq!(tool["name"], "plan_update");
        assert_eq!(tool["description"], "Update steps");
        assert_eq!(tool["input_schema"]["properties"]["ids"]["type"], "array");
    }
}
