//! Stdio transport: reads JSON-RPC from stdin, writes to stdout.

use std::sync::Arc;

use tokio::io::BufReader;

use crate::protocol::ProtocolHandler;
use crate::tools::ToolRegistry;
use crate::types::McpResult;

use super::channel::{serve_channel, LineChannel};

/// Stdio transport for desktop MCP clients. Serves exactly one session.
pub struct StdioTransport {
    handler: ProtocolHandler,
}

impl StdioTransport {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self {
            handler: ProtocolHandler::new(registry).with_label("stdio"),
        }
    }

    /// Run the transport loop until EOF on stdin or `shutdown`.
    pub async fn run(&self) -> McpResult<()> {
        let mut channel = LineChannel::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());

        tracing::info!("Stdio transport started");
        let outcome = serve_channel(&self.handler, &mut channel).await;
        tracing::info!("Stdio transport stopped");
        outcome
    }
}
