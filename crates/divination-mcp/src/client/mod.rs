//! MCP client: request correlation over any [`ByteChannel`](crate::transport::ByteChannel),
//! the client-side bindings, and the demo harness.

pub mod harness;
pub mod session;
#[cfg(feature = "http")]
pub mod sse;
pub mod stdio;
#[cfg(feature = "http")]
pub mod streamable;

pub use harness::{
    run_binding, run_demo, sample_arguments, ClientBinding, Deadlines, HarnessError,
    HarnessReport, HarnessStep,
};
pub use session::McpClient;
#[cfg(feature = "http")]
pub use sse::SseClientChannel;
pub use stdio::StdioClientChannel;
#[cfg(feature = "http")]
pub use streamable::StreamableHttpClientChannel;
