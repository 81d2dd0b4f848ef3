//! MCP protocol handling: JSON-RPC dispatch and the session lifecycle.

pub mod handler;
pub mod negotiation;
pub mod validator;

pub use handler::ProtocolHandler;
