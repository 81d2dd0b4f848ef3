//! Handshake payloads: who is talking and what each side supports.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MCP_VERSION: &str = "2024-11-05";
pub const SERVER_NAME: &str = "divination-charting-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name and version of a client or server program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Implementation {
    pub name: String,
    pub version: String,
}

impl Implementation {
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// This server.
    pub fn server() -> Self {
        Self::new(SERVER_NAME, SERVER_VERSION)
    }
}

/// Recorded at `initialize`; the server offers nothing that depends on it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub experimental: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roots: Option<RootsCapability>,
}

/// Tools are the only server feature.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolsCapability>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootsCapability {
    #[serde(default)]
    pub list_changed: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    #[serde(default)]
    pub list_changed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    pub protocol_version: String,
    #[serde(default)]
    pub capabilities: ClientCapabilities,
    pub client_info: Implementation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    pub capabilities: ServerCapabilities,
    pub server_info: Implementation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl ServerCapabilities {
    /// The tool list is fixed at startup, so `listChanged` is never advertised.
    pub fn tools_only() -> Self {
        Self {
            tools: Some(ToolsCapability {
                list_changed: false,
            }),
        }
    }
}

const INSTRUCTIONS: &str = "占卜排盘的MCP服务器";

impl InitializeResult {
    /// What this server answers to every accepted `initialize`.
    pub fn for_server() -> Self {
        Self {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ServerCapabilities::tools_only(),
            server_info: Implementation::server(),
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }
}

impl InitializeParams {
    /// Parameters the bundled client sends when opening a session.
    pub fn for_client(name: &str) -> Self {
        Self {
            protocol_version: MCP_VERSION.to_string(),
            capabilities: ClientCapabilities::default(),
            client_info: Implementation::new(name, SERVER_VERSION),
        }
    }
}
