//! MCP tool implementations.

pub mod descriptor;
pub mod divination;
pub mod registry;

pub use descriptor::{ToolDescriptor, ToolError, ToolHandler, ToolOutput};
pub use registry::ToolRegistry;

use crate::types::McpResult;

/// Registry with every tool this server ships.
pub fn default_registry() -> McpResult<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(divination::descriptor())?;
    Ok(registry)
}
