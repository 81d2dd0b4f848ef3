//! End-to-end demo: connect, handshake, list tools, call the first one.

use std::fmt;
use std::time::Duration;

use serde_json::{json, Value};

use crate::types::{Implementation, McpError, ToolCallResult, ToolContent, ToolDefinition};

use super::session::McpClient;
use super::stdio::StdioClientChannel;

/// Per-step deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadlines {
    pub initialize: Duration,
    pub list_tools: Duration,
    pub call_tool: Duration,
}

impl Default for Deadlines {
    fn default() -> Self {
        Self {
            initialize: Duration::from_secs(30),
            list_tools: Duration::from_secs(10),
            call_tool: Duration::from_secs(30),
        }
    }
}

/// Which server to talk to, and how.
#[derive(Debug, Clone)]
pub enum ClientBinding {
    /// Spawn `command` and speak over its stdin/stdout.
    Stdio { command: String, args: Vec<String> },
    /// URL of the SSE stream, e.g. `http://127.0.0.1:8000/sse`.
    #[cfg(feature = "http")]
    Sse { url: String },
    /// URL of the streamable HTTP endpoint, e.g. `http://127.0.0.1:8000/mcp`.
    #[cfg(feature = "http")]
    StreamableHttp { url: String },
}

impl ClientBinding {
    /// Open the channel and start a client over it.
    ///
    /// `deadline` bounds the SSE endpoint handshake; the other bindings connect lazily.
    #[cfg_attr(not(feature = "http"), allow(unused_variables))]
    pub async fn connect(&self, deadline: Duration) -> Result<McpClient, McpError> {
        match self {
            ClientBinding::Stdio { command, args } => {
                Ok(McpClient::new(StdioClientChannel::spawn(command, args)?))
            }
            #[cfg(feature = "http")]
            ClientBinding::Sse { url } => {
                let channel = super::sse::SseClientChannel::connect(url, deadline).await?;
                Ok(McpClient::new(channel))
            }
            #[cfg(feature = "http")]
            ClientBinding::StreamableHttp { url } => Ok(McpClient::new(
                super::streamable::StreamableHttpClientChannel::new(url.clone()),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessStep {
    Connect,
    Initialize,
    Initialized,
    ListTools,
    CallTool,
}

impl fmt::Display for HarnessStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HarnessStep::Connect => "connect",
            HarnessStep::Initialize => "initialize",
            HarnessStep::Initialized => "initialized notification",
            HarnessStep::ListTools => "tools/list",
            HarnessStep::CallTool => "tools/call",
        };
        f.write_str(name)
    }
}

/// A harness step failed; later steps were not attempted.
#[derive(thiserror::Error, Debug)]
#[error("{step} failed: {source}")]
pub struct HarnessError {
    pub step: HarnessStep,
    #[source]
    pub source: McpError,
}

impl HarnessError {
    fn at(step: HarnessStep) -> impl FnOnce(McpError) -> Self {
        move |source| Self { step, source }
    }
}

#[derive(Debug, Clone)]
pub struct HarnessReport {
    pub server: Implementation,
    pub tools: Vec<ToolDefinition>,
    /// Result of calling the first tool; `None` when the server offers no tools.
    pub result: Option<ToolCallResult>,
}

/// The arguments the demo passes to the first tool.
pub fn sample_arguments() -> Value {
    json!({
        "year": 2024,
        "month": 9,
        "day": 19,
        "hour": 15,
        "yaogua": [0, 1, 1, 2, 1, 3],
    })
}

/// Run the demo sequence over an already-connected client.
pub async fn run_demo(
    client: &McpClient,
    deadlines: &Deadlines,
    arguments: Value,
) -> Result<HarnessReport, HarnessError> {
    let init = client
        .initialize(deadlines.initialize)
        .await
        .map_err(HarnessError::at(HarnessStep::Initialize))?;
    client
        .initialized()
        .await
        .map_err(HarnessError::at(HarnessStep::Initialized))?;

    tracing::info!("Listing tools...");
    let tools = client
        .list_tools(deadlines.list_tools)
        .await
        .map_err(HarnessError::at(HarnessStep::ListTools))?;
    tracing::info!("Server offers {} tool(s):", tools.len());
    for tool in &tools {
        tracing::info!("- name: {}", tool.name);
        tracing::info!("  description: {}", tool.description.as_deref().unwrap_or(""));
        tracing::info!("  input schema: {}", tool.input_schema);
    }

    let Some(first) = tools.first() else {
        tracing::warn!("Server offers no tools");
        return Ok(HarnessReport {
            server: init.server_info,
            tools,
            result: None,
        });
    };

    tracing::info!("Calling tool {} with {arguments}", first.name);
    let result = client
        .call_tool(&first.name, arguments, deadlines.call_tool)
        .await
        .map_err(HarnessError::at(HarnessStep::CallTool))?;
    tracing::info!("Tool result:");
    for item in &result.content {
        match item {
            ToolContent::Text { text } => tracing::info!("{text}"),
            ToolContent::Other(raw) => tracing::info!("Non-text content ({}): {raw}", item.kind()),
        }
    }

    Ok(HarnessReport {
        server: init.server_info,
        tools,
        result: Some(result),
    })
}

/// Connect over `binding`, run the demo, and close the client.
pub async fn run_binding(
    binding: &ClientBinding,
    deadlines: &Deadlines,
    arguments: Value,
) -> Result<HarnessReport, HarnessError> {
    let client = binding
        .connect(deadlines.initialize)
        .await
        .map_err(HarnessError::at(HarnessStep::Connect))?;
    let outcome = run_demo(&client, deadlines, arguments).await;
    client.close().await;
    outcome
}
