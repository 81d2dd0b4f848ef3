//! Parameters of the client requests and notifications the server understands.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::message::RequestId;

/// `tools/call`. Absent `arguments` are treated as an empty object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallParams {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

/// `notifications/cancelled`. Logged only; running handlers are not interrupted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelledParams {
    pub request_id: RequestId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
