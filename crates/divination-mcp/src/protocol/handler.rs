//! Main request dispatcher: receives JSON-RPC messages, routes to handlers.

use std::sync::Arc;
use tokio::sync::Mutex;

use serde_json::Value;

use crate::session::SessionState;
use crate::tools::ToolRegistry;
use crate::types::*;

use super::negotiation::NegotiatedCapabilities;
use super::validator::{validate_notification, validate_request};

/// One MCP session: dispatches incoming JSON-RPC messages against a shared
/// tool registry and enforces the session lifecycle.
pub struct ProtocolHandler {
    registry: Arc<ToolRegistry>,
    capabilities: Arc<Mutex<NegotiatedCapabilities>>,
    label: String,
}

impl ProtocolHandler {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            registry,
            capabilities: Arc::new(Mutex::new(NegotiatedCapabilities::default())),
            label: "local".to_string(),
        }
    }

    /// Name used in log lines, e.g. the transport or HTTP session id.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub async fn state(&self) -> SessionState {
        self.capabilities.lock().await.state
    }

    /// Move the session to `Closed`. Idempotent.
    pub async fn close(&self) {
        let mut caps = self.capabilities.lock().await;
        if !caps.state.is_closed() {
            caps.state.close();
            tracing::info!(session = %self.label, "Session closed");
        }
    }

    pub async fn handle_message(&self, msg: JsonRpcMessage) -> Option<Value> {
        match msg {
            JsonRpcMessage::Request(req) => Some(self.handle_request(req).await),
            JsonRpcMessage::Notification(notif) => {
                self.handle_notification(notif).await;
                None
            }
            _ => {
                tracing::warn!(session = %self.label, "Received unexpected message type from client");
                None
            }
        }
    }

    async fn handle_request(&self, request: JsonRpcRequest) -> Value {
        if let Err(e) = validate_request(&request) {
            return serde_json::to_value(e.to_json_rpc_error(request.id)).unwrap_or_default();
        }

        let id = request.id.clone();
        let result = self.dispatch_request(&request).await;

        match result {
            Ok(value) => serde_json::to_value(JsonRpcResponse::new(id, value)).unwrap_or_default(),
            Err(e) => {
                tracing::debug!(session = %self.label, method = %request.method, error = %e, "Request failed");
                serde_json::to_value(e.to_json_rpc_error(id)).unwrap_or_default()
            }
        }
    }

    async fn dispatch_request(&self, request: &JsonRpcRequest) -> McpResult<Value> {
        self.state().await.admit(&request.method)?;

        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.params.clone()).await,
            "shutdown" => self.handle_shutdown().await,
            "ping" => self.handle_ping().await,

            "tools/list" => self.handle_tools_list().await,
            "tools/call" => self.handle_tools_call(request.params.clone()).await,

            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }

    async fn handle_notification(&self, notification: JsonRpcNotification) {
        if let Err(e) = validate_notification(&notification) {
            tracing::warn!(session = %self.label, "Dropping malformed notification: {e}");
            return;
        }

        match notification.method.as_str() {
            "notifications/initialized" | "initialized" => {
                let mut caps = self.capabilities.lock().await;
                caps.mark_initialized();
            }
            "notifications/cancelled" | "$/cancelRequest" => {
                let params: Option<CancelledParams> = notification
                    .params
                    .and_then(|p| serde_json::from_value(p).ok());
                match params {
                    Some(p) => tracing::info!(
                        session = %self.label,
                        request_id = %p.request_id,
                        reason = p.reason.as_deref().unwrap_or(""),
                        "Received cancellation notification"
                    ),
                    None => tracing::info!(session = %self.label, "Received cancellation notification"),
                }
            }
            _ => {
                tracing::debug!(session = %self.label, "Unknown notification: {}", notification.method);
            }
        }
    }

    async fn handle_initialize(&self, params: Option<Value>) -> McpResult<Value> {
        let init_params: InitializeParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Initialize params required".to_string()))?;

        let mut caps = self.capabilities.lock().await;
        let result = caps.negotiate(init_params)?;

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_shutdown(&self) -> McpResult<Value> {
        tracing::info!(session = %self.label, "Shutdown requested");
        self.close().await;
        Ok(Value::Object(serde_json::Map::new()))
    }

    async fn handle_ping(&self) -> McpResult<Value> {
        Ok(Value::Object(serde_json::Map::new()))
    }

    async fn handle_tools_list(&self) -> McpResult<Value> {
        let result = ToolListResult {
            tools: self.list_tools().await?,
            next_cursor: None,
        };
        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    async fn handle_tools_call(&self, params: Option<Value>) -> McpResult<Value> {
        let call_params: ToolCallParams = params
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| McpError::InvalidParams(e.to_string()))?
            .ok_or_else(|| McpError::InvalidParams("Tool call params required".to_string()))?;

        let result = match self.call_tool(&call_params.name, call_params.arguments).await {
            Err(McpError::ToolExecution(message)) => {
                tracing::warn!(
                    session = %self.label,
                    tool = %call_params.name,
                    "Tool execution failed: {message}"
                );
                ToolCallResult::error(message)
            }
            other => other?,
        };

        serde_json::to_value(result).map_err(|e| McpError::InternalError(e.to_string()))
    }

    /// Tool definitions, available once the session is ready.
    pub async fn list_tools(&self) -> McpResult<Vec<ToolDefinition>> {
        self.state().await.require_ready("tools/list")?;
        Ok(self.registry.list_tools())
    }

    /// Validate and run a tool. The session lock is not held while the handler runs.
    pub async fn call_tool(&self, name: &str, arguments: Option<Value>) -> McpResult<ToolCallResult> {
        self.state().await.require_ready("tools/call")?;
        tracing::debug!(session = %self.label, tool = name, "Calling tool");
        self.registry.call(name, arguments)
    }
}
