//! Tool descriptors: a name, a description, an input schema and a handler.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::schema::{validate, SchemaNode};
use crate::types::{McpError, McpResult, ToolCallResult, ToolContent, ToolDefinition};

/// What a handler returns on success.
#[derive(Debug, Clone)]
pub enum ToolOutput {
    /// Rendered as one pretty-printed JSON text item.
    Structured(Value),
    /// Returned to the client as-is.
    Contents(Vec<ToolContent>),
}

/// A failure reported by a tool handler.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ToolError {
    pub message: String,
}

impl ToolError {
    pub fn new(message: impl fmt::Display) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

pub type ToolHandler = Arc<dyn Fn(Value) -> Result<ToolOutput, ToolError> + Send + Sync>;

#[derive(Clone)]
pub struct ToolDescriptor {
    name: String,
    description: String,
    input_schema: SchemaNode,
    handler: ToolHandler,
}

impl fmt::Debug for ToolDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ToolDescriptor")
            .field("name", &self.name)
            .field("input_schema", &self.input_schema)
            .finish_non_exhaustive()
    }
}

impl ToolDescriptor {
    pub fn new<F>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: SchemaNode,
        handler: F,
    ) -> Self
    where
        F: Fn(Value) -> Result<ToolOutput, ToolError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            handler: Arc::new(handler),
        }
    }

    /// Build a descriptor from a handler over serde types.
    ///
    /// Validated arguments are deserialized into `I`; the returned `O` is
    /// serialized and wrapped as [`ToolOutput::Structured`].
    pub fn typed<I, O, E, F>(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: SchemaNode,
        handler: F,
    ) -> Self
    where
        I: DeserializeOwned,
        O: Serialize,
        E: fmt::Display,
        F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
    {
        Self::new(name, description, input_schema, move |args: Value| {
            let input: I = serde_json::from_value(args).map_err(ToolError::new)?;
            let output = handler(input).map_err(ToolError::new)?;
            serde_json::to_value(output)
                .map(ToolOutput::Structured)
                .map_err(ToolError::new)
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn input_schema(&self) -> &SchemaNode {
        &self.input_schema
    }

    /// Discovery entry for `tools/list`.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name.clone(),
            description: Some(self.description.clone()),
            input_schema: self.input_schema.to_json_schema(),
        }
    }

    /// Validate `arguments` and run the handler.
    ///
    /// The handler is never invoked when validation fails. A handler that
    /// panics is reported as [`McpError::ToolExecution`].
    pub fn invoke(&self, arguments: &Value) -> McpResult<ToolCallResult> {
        let args = validate(&self.input_schema, arguments)?;

        let outcome = catch_unwind(AssertUnwindSafe(|| (self.handler)(args)))
            .map_err(|payload| McpError::ToolExecution(panic_message(payload.as_ref())))?;

        match outcome {
            Ok(ToolOutput::Structured(value)) => Ok(ToolCallResult::json(&value)),
            Ok(ToolOutput::Contents(content)) => Ok(ToolCallResult {
                content,
                is_error: None,
            }),
            Err(e) => Err(McpError::ToolExecution(e.message)),
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}
