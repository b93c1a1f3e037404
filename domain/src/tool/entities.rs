//! Tool domain entities
//!
//! A tool is declared by a [`ToolDefinition`] (name, description, typed
//! parameters). The set of tools visible to one role is a [`ToolSpec`].
//! A [`ToolCall`] is a model-requested invocation of one of them.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Definition of a tool that can be called by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique name of the tool (e.g., "read_file", "shell")
    pub name: String,
    /// Human-readable description of what the tool does
    pub description: String,
    /// Parameters the tool accepts
    pub parameters: Vec<ToolParameter>,
}

/// A parameter definition for a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    /// Parameter name
    pub name: String,
    /// Description of the parameter
    pub description: String,
    /// Whether this parameter is required
    pub required: bool,
    /// JSON type: "string", "integer", "number", "boolean", "array", "object"
    pub param_type: String,
    /// Element type for array parameters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }
}

impl ToolParameter {
    pub fn new(name: impl Into<String>, description: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required,
            param_type: "string".to_string(),
            item_type: None,
        }
    }

    pub fn with_type(mut self, param_type: impl Into<String>) -> Self {
        self.param_type = param_type.into();
        self
    }

    /// Mark this parameter as an array whose elements have `item_type`.
    pub fn array_of(mut self, item_type: impl Into<String>) -> Self {
        self.param_type = "array".to_string();
        self.item_type = Some(item_type.into());
        self
    }
}

/// The tools available to one role.
///
/// Tools are keyed by canonical name. Aliases map commonly hallucinated
/// names (e.g. `bash`) onto a canonical tool.
#[derive(Debug, Clone, Default)]
pub struct ToolSpec {
    tools: HashMap<String, ToolDefinition>,
    aliases: HashMap<String, String>,
}

impl ToolSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool
    pub fn register(mut self, tool: ToolDefinition) -> Self {
        self.tools.insert(tool.name.clone(), tool);
        self
    }

    /// Register an alias that resolves to a canonical tool name.
    pub fn register_alias(mut self, alias: impl Into<String>, canonical: impl Into<String>) -> Self {
        self.aliases.insert(alias.into(), canonical.into());
        self
    }

    /// Resolve a name to its canonical tool name.
    ///
    /// Canonical names win over aliases. Aliases pointing at a tool that is
    /// not registered in this spec resolve to `None`.
    pub fn resolve<'a>(&'a self, name: &'a str) -> Option<&'a str> {
        if self.tools.contains_key(name) {
            return Some(name);
        }
        self.aliases
            .get(name)
            .map(|s| s.as_str())
            .filter(|canonical| self.tools.contains_key(*canonical))
    }

    pub fn get(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All definitions, sorted by name for stable prompt and schema output.
    pub fn definitions(&self) -> Vec<&ToolDefinition> {
        let mut defs: Vec<&ToolDefinition> = self.tools.values().collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    pub fn names(&self) -> Vec<&str> {
        self.definitions().into_iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Build a new spec restricted to `names`, keeping aliases that still
    /// resolve. Names not present in this spec are returned as the error.
    pub fn subset<S: AsRef<str>>(&self, names: &[S]) -> Result<ToolSpec, Vec<String>> {
        let mut missing = Vec::new();
        let mut subset = ToolSpec::new();
        for name in names {
            match self.tools.get(name.as_ref()) {
                Some(def) => subset = subset.register(def.clone()),
                None => missing.push(name.as_ref().to_string()),
            }
        }
        if !missing.is_empty() {
            return Err(missing);
        }
        for (alias, canonical) in &self.aliases {
            if subset.contains(canonical) {
                subset = subset.register_alias(alias.clone(), canonical.clone());
            }
        }
        Ok(subset)
    }

    /// Merge another spec into this one. Entries in `other` win.
    pub fn merge(mut self, other: &ToolSpec) -> Self {
        for def in other.tools.values() {
            self.tools.insert(def.name.clone(), def.clone());
        }
        for (alias, canonical) in &other.aliases {
            self.aliases.insert(alias.clone(), canonical.clone());
        }
        self
    }
}

/// A request to call a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier, echoed back in the matching [`ToolResult`](super::value_objects::ToolResult)
    pub id: String,
    /// Name of the tool to call
    pub tool_name: String,
    /// Arguments to pass to the tool
    #[serde(default)]
    pub arguments: HashMap<String, serde_json::Value>,
}

impl ToolCall {
    pub fn new(tool_name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            tool_name: tool_name.into(),
            arguments: HashMap::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.arguments.insert(key.into(), value.into());
        self
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.arguments.get(key).and_then(|v| v.as_str())
    }

    pub fn require_string(&self, key: &str) -> Result<&str, String> {
        self.get_string(key)
            .ok_or_else(|| format!("Missing required argument: {}", key))
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.arguments.get(key).and_then(|v| v.as_i64())
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.arguments.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_array(&self, key: &str) -> Option<&Vec<serde_json::Value>> {
        self.arguments.get(key).and_then(|v| v.as_array())
    }

    /// Arguments as a compact JSON object string.
    pub fn arguments_json(&self) -> String {
        let map: serde_json::Map<String, serde_json::Value> = self
            .arguments
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        serde_json::Value::Object(map).to_string()
    }
}
