//! Transport layer for MCP communication.

pub mod channel;
pub mod framing;
#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
pub mod sse;
pub mod sse_codec;
pub mod stdio;
#[cfg(feature = "http")]
pub mod streamable;

pub use channel::{serve_channel, ByteChannel, LineChannel, QueueChannel};
#[cfg(feature = "http")]
pub use sse::SseTransport;
pub use stdio::StdioTransport;
#[cfg(feature = "http")]
pub use streamable::StreamableHttpTransport;
