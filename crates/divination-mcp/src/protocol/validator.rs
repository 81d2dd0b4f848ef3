//! JSON-RPC envelope checks applied before dispatch.

use crate::types::{JsonRpcNotification, JsonRpcRequest, McpError, McpResult, JSONRPC_VERSION};

fn check_version(version: &str) -> McpResult<()> {
    if version != JSONRPC_VERSION {
        return Err(McpError::InvalidRequest(format!(
            "Expected jsonrpc version \"{JSONRPC_VERSION}\", got \"{version}\""
        )));
    }
    Ok(())
}

/// Validate that a JSON-RPC request is well-formed.
pub fn validate_request(request: &JsonRpcRequest) -> McpResult<()> {
    check_version(&request.jsonrpc)?;

    if request.method.is_empty() {
        return Err(McpError::InvalidRequest(
            "Method name must not be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validate a notification. Failures are logged by the caller, never answered.
pub fn validate_notification(notification: &JsonRpcNotification) -> McpResult<()> {
    check_version(&notification.jsonrpc)
}
