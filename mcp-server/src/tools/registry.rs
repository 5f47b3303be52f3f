//! Tool Registry: stores and retrieves tool definitions

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Tool as advertised in `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// In-memory tool registry
#[derive(Debug, Default)]
pub struct Registry {
    tools: HashMap<String, ToolDefinition>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool definition
    pub fn register_tool(&mut self, tool: ToolDefinition) {
        info!("Registered tool: {}", tool.name);
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get a tool by name
    pub fn get_tool(&self, name: &str) -> Option<&ToolDefinition> {
        self.tools.get(name)
    }

    /// All tools, sorted by name
    pub fn list_tools(&self) -> Vec<&ToolDefinition> {
        let mut tools: Vec<_> = self.tools.values().collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        tools
    }

    /// Get total tool count
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

/// Helper to create a ToolDefinition
pub fn make_tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_tool(name: &str) -> ToolDefinition {
        make_tool(name, "A test tool", json!({"type": "object"}))
    }

    #[test]
    fn test_register_and_get_tool() {
        let mut reg = Registry::new();
        reg.register_tool(sample_tool("RetrieveActivityRecords"));

        let tool = reg.get_tool("RetrieveActivityRecords").unwrap();
        assert_eq!(tool.name, "RetrieveActivityRecords");
        assert!(reg.get_tool("nonexistent").is_none());
    }

    #[test]
    fn test_list_tools_sorted() {
        let mut reg = Registry::new();
        reg.register_tool(sample_tool("b"));
        reg.register_tool(sample_tool("c"));
        reg.register_tool(sample_tool("a"));

        let names: Vec<_> = reg.list_tools().iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["a", "b", "c"]);
    }

    #[test]
    fn test_register_overwrites_existing() {
        let mut reg = Registry::new();
        reg.register_tool(make_tool("t", "Original description", json!({})));
        reg.register_tool(make_tool("t", "Updated description", json!({})));

        assert_eq!(reg.tool_count(), 1);
        assert_eq!(reg.get_tool("t").unwrap().description, "Updated description");
    }

    #[test]
    fn test_serializes_input_schema_camel_case() {
        let value = serde_json::to_value(sample_tool("t")).unwrap();
        assert_eq!(value["inputSchema"], json!({"type": "object"}));
        assert!(value.get("input_schema").is_none());
    }
}
