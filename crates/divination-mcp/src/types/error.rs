//! Error types and JSON-RPC error codes for the MCP server and client.

use std::time::Duration;

use serde_json::{json, Value};

use super::message::{JsonRpcError, JsonRpcErrorObject, RequestId, JSONRPC_VERSION};
use crate::schema::{ValidationError, ValidationIssue};

/// Standard JSON-RPC 2.0 error codes.
pub mod error_codes {
    pub const PARSE_ERROR: i32 = -32700;
    pub const INVALID_REQUEST: i32 = -32600;
    pub const METHOD_NOT_FOUND: i32 = -32601;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const INTERNAL_ERROR: i32 = -32603;
}

/// MCP-specific error codes.
pub mod mcp_error_codes {
    pub const TOOL_NOT_FOUND: i32 = -32803;

    /// Session: a method arrived before the handshake finished, or a second `initialize`.
    pub const PROTOCOL_ORDER: i32 = -32002;
    /// Session: the session was shut down or its transport went away.
    pub const SESSION_CLOSED: i32 = -32003;
}

/// All errors that can occur on either side of an MCP session.
#[derive(thiserror::Error, Debug)]
pub enum McpError {
    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    /// Tool arguments did not satisfy the tool's input schema.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    /// The tool handler reported a failure.
    #[error("Tool execution failed: {0}")]
    ToolExecution(String),

    /// `method` was called in a session state that does not allow it.
    #[error("Protocol order violation: {0}")]
    ProtocolOrder(String),

    #[error("Session closed")]
    SessionClosed,

    #[error("Timed out after {after:?} waiting for {operation}")]
    Timeout { operation: String, after: Duration },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    pub fn code(&self) -> i32 {
        use error_codes::*;
        use mcp_error_codes::*;
        match self {
            McpError::ParseError(_) => PARSE_ERROR,
            McpError::InvalidRequest(_) => INVALID_REQUEST,
            McpError::MethodNotFound(_) => METHOD_NOT_FOUND,
            McpError::InvalidParams(_) | McpError::Validation(_) => INVALID_PARAMS,
            McpError::ToolNotFound(_) => TOOL_NOT_FOUND,
            McpError::ProtocolOrder(_) => PROTOCOL_ORDER,
            McpError::SessionClosed => SESSION_CLOSED,
            McpError::InternalError(_)
            | McpError::DuplicateTool(_)
            | McpError::ToolExecution(_)
            | McpError::Timeout { .. }
            | McpError::Transport(_)
            | McpError::Io(_) => INTERNAL_ERROR,
            McpError::Json(_) => PARSE_ERROR,
        }
    }

    /// Structured payload carried in the `data` member of the error object.
    pub fn data(&self) -> Option<Value> {
        match self {
            McpError::Validation(e) => serde_json::to_value(&e.issues).ok(),
            McpError::ToolNotFound(name) => Some(json!({ "tool": name })),
            McpError::ProtocolOrder(method) => Some(json!({ "method": method })),
            _ => None,
        }
    }

    pub fn to_json_rpc_error(&self, id: RequestId) -> JsonRpcError {
        JsonRpcError {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            error: JsonRpcErrorObject {
                code: self.code(),
                message: self.to_string(),
                data: self.data(),
            },
        }
    }

    /// Rebuild the error kind from an error object received over the wire.
    pub fn from_error_object(error: &JsonRpcErrorObject) -> Self {
        use error_codes::*;
        use mcp_error_codes::*;
        let data_str = |key: &str| {
            error
                .data
                .as_ref()
                .and_then(|d| d.get(key))
                .and_then(Value::as_str)
                .map(str::to_string)
        };
        match error.code {
            PARSE_ERROR => McpError::ParseError(error.message.clone()),
            INVALID_REQUEST => McpError::InvalidRequest(error.message.clone()),
            METHOD_NOT_FOUND => McpError::MethodNotFound(error.message.clone()),
            INVALID_PARAMS => error
                .data
                .clone()
                .and_then(|d| serde_json::from_value::<Vec<ValidationIssue>>(d).ok())
                .filter(|issues| !issues.is_empty())
                .map(|issues| McpError::Validation(ValidationError { issues }))
                .unwrap_or_else(|| McpError::InvalidParams(error.message.clone())),
            TOOL_NOT_FOUND => {
                McpError::ToolNotFound(data_str("tool").unwrap_or_else(|| error.message.clone()))
            }
            PROTOCOL_ORDER => McpError::ProtocolOrder(
                data_str("method").unwrap_or_else(|| error.message.clone()),
            ),
            SESSION_CLOSED => McpError::SessionClosed,
            _ => McpError::InternalError(error.message.clone()),
        }
    }
}

pub type McpResult<T> = Result<T, McpError>;
