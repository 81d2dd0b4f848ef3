//! The MCP session lifecycle.

use crate::types::{McpError, McpResult};

/// Where a session is in its lifecycle.
///
/// `Uninitialized -> Initializing -> Ready -> Closed`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Uninitialized,
    /// `initialize` answered, waiting for `notifications/initialized`.
    Initializing,
    Ready,
    Closed,
}

impl SessionState {
    /// Accept an `initialize` request.
    pub fn begin_initialize(&mut self) -> McpResult<()> {
        match self {
            SessionState::Uninitialized => {
                *self = SessionState::Initializing;
                Ok(())
            }
            SessionState::Closed => Err(McpError::SessionClosed),
            SessionState::Initializing | SessionState::Ready => {
                Err(McpError::ProtocolOrder("initialize".to_string()))
            }
        }
    }

    /// Apply `notifications/initialized`. Returns whether the state changed.
    pub fn complete_handshake(&mut self) -> bool {
        if *self == SessionState::Initializing {
            *self = SessionState::Ready;
            true
        } else {
            false
        }
    }

    /// Gate for methods that need a finished handshake.
    pub fn require_ready(&self, method: &str) -> McpResult<()> {
        match self {
            SessionState::Ready => Ok(()),
            SessionState::Closed => Err(McpError::SessionClosed),
            SessionState::Uninitialized | SessionState::Initializing => {
                Err(McpError::ProtocolOrder(method.to_string()))
            }
        }
    }

    /// Gate applied to every request before dispatch.
    ///
    /// Only `initialize` and `ping` are admitted before the handshake starts,
    /// and only `shutdown` once the session is closed.
    pub fn admit(&self, method: &str) -> McpResult<()> {
        match self {
            SessionState::Closed if method != "shutdown" => Err(McpError::SessionClosed),
            SessionState::Uninitialized if !matches!(method, "initialize" | "ping") => {
                Err(McpError::ProtocolOrder(method.to_string()))
            }
            _ => Ok(()),
        }
    }

    pub fn close(&mut self) {
        *self = SessionState::Closed;
    }

    pub fn is_closed(&self) -> bool {
        *self == SessionState::Closed
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Initializing => "initializing",
            SessionState::Ready => "ready",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}
