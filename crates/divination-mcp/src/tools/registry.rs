//! Tool registration and dispatch.

use std::collections::HashMap;

use serde_json::Value;

use crate::types::{McpError, McpResult, ToolCallResult, ToolDefinition};

use super::descriptor::ToolDescriptor;

/// The set of tools a server exposes.
///
/// Built once at startup and then shared read-only behind an `Arc`.
#[derive(Debug, Default)]
pub struct ToolRegistry {
    tools: Vec<ToolDescriptor>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: ToolDescriptor) -> McpResult<()> {
        if self.index.contains_key(tool.name()) {
            return Err(McpError::DuplicateTool(tool.name().to_string()));
        }
        tracing::debug!(tool = tool.name(), "Registered tool");
        self.index.insert(tool.name().to_string(), self.tools.len());
        self.tools.push(tool);
        Ok(())
    }

    /// Definitions in registration order.
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(ToolDescriptor::definition).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn call(&self, name: &str, arguments: Option<Value>) -> McpResult<ToolCallResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| McpError::ToolNotFound(name.to_string()))?;
        let args = arguments.unwrap_or(Value::Object(serde_json::Map::new()));
        tool.invoke(&args)
    }
}
