//! Divination MCP server: hosts the six-line (六爻) charting tool over the
//! Model Context Protocol, with stdio, SSE and streamable HTTP transports and
//! a matching client.

pub mod client;
pub mod config;
pub mod protocol;
pub mod schema;
pub mod session;
pub mod tools;
pub mod transport;
pub mod types;

pub use client::McpClient;
pub use config::{ServerConfig, TransportKind};
pub use protocol::ProtocolHandler;
pub use tools::{default_registry, ToolDescriptor, ToolRegistry};
pub use transport::StdioTransport;
