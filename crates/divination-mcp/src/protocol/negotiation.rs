//! MCP capability negotiation during initialization.

use crate::session::SessionState;
use crate::types::{
    ClientCapabilities, Implementation, InitializeParams, InitializeResult, McpResult, MCP_VERSION,
};

/// Per-session handshake record: what the client declared and where the
/// session is in its lifecycle.
#[derive(Debug, Clone, Default)]
pub struct NegotiatedCapabilities {
    pub client: ClientCapabilities,
    pub client_info: Option<Implementation>,
    pub state: SessionState,
}

impl NegotiatedCapabilities {
    pub fn negotiate(&mut self, params: InitializeParams) -> McpResult<InitializeResult> {
        self.state.begin_initialize()?;

        if params.protocol_version != MCP_VERSION {
            tracing::warn!(
                "Client requested protocol version {}, server supports {}. Proceeding with server version.",
                params.protocol_version,
                MCP_VERSION
            );
        }

        tracing::info!(
            "Initialized with client: {} v{}",
            params.client_info.name,
            params.client_info.version
        );

        self.client = params.capabilities;
        self.client_info = Some(params.client_info);

        Ok(InitializeResult::for_server())
    }

    pub fn mark_initialized(&mut self) {
        if self.state.complete_handshake() {
            tracing::info!("MCP handshake complete");
        } else {
            tracing::warn!(state = %self.state, "Ignoring initialized notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::McpError;

    #[test]
    fn test_negotiate_then_mark() {
        let mut caps = NegotiatedCapabilities::default();
        let result = caps
            .negotiate(InitializeParams::for_client("test"))
            .unwrap();
        assert_eq!(result.protocol_version, MCP_VERSION);
        assert_eq!(caps.state, SessionState::Initializing);
        assert_eq!(caps.client_info.as_ref().unwrap().name, "test");

        caps.mark_initialized();
        assert_eq!(caps.state, SessionState::Ready);

        assert!(matches!(
            caps.negotiate(InitializeParams::for_client("again")),
            Err(McpError::ProtocolOrder(_))
        ));
    }

    #[test]
    fn test_unknown_version_still_answers_with_server_version() {
        let mut caps = NegotiatedCapabilities::default();
        let mut params = InitializeParams::for_client("old");
        params.protocol_version = "2023-01-01".into();
        let result = caps.negotiate(params).unwrap();
        assert_eq!(result.protocol_version, MCP_VERSION);
    }
}
