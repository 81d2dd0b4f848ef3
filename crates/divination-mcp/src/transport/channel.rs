//! Byte channels: the seam between the protocol engine and a concrete transport.

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, Lines};
use tokio::sync::mpsc;

use crate::protocol::ProtocolHandler;
use crate::types::{McpError, McpResult};

use super::framing;

/// A bidirectional stream of complete JSON-RPC message texts.
#[async_trait]
pub trait ByteChannel: Send {
    /// Next complete message, or `None` once the peer has closed the channel.
    ///
    /// Must be cancel-safe: dropping the future before it resolves loses no
    /// message, so callers may use it inside `tokio::select!`.
    async fn recv(&mut self) -> McpResult<Option<String>>;

    async fn send(&mut self, message: &str) -> McpResult<()>;

    async fn close(&mut self) -> McpResult<()>;
}

/// Newline-delimited messages over any async reader/writer pair.
pub struct LineChannel<R, W> {
    lines: Lines<R>,
    writer: Option<W>,
}

impl<R, W> LineChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            lines: reader.lines(),
            writer: Some(writer),
        }
    }
}

#[async_trait]
impl<R, W> ByteChannel for LineChannel<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn recv(&mut self) -> McpResult<Option<String>> {
        // `next_line` is cancel-safe.
        self.lines
            .next_line()
            .await
            .map_err(|e| McpError::Transport(format!("read failed: {e}")))
    }

    async fn send(&mut self, message: &str) -> McpResult<()> {
        let writer = self
            .writer
            .as_mut()
            .ok_or_else(|| McpError::Transport("channel closed".to_string()))?;
        writer.write_all(message.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> McpResult<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.shutdown().await?;
        }
        Ok(())
    }
}

/// Messages over a pair of in-process queues.
///
/// Used where the wire framing happens elsewhere, e.g. an HTTP handler feeds
/// `inbound` and an event stream drains `outbound`.
pub struct QueueChannel {
    inbound: mpsc::Receiver<String>,
    outbound: Option<mpsc::Sender<String>>,
}

impl QueueChannel {
    pub fn new(inbound: mpsc::Receiver<String>, outbound: mpsc::Sender<String>) -> Self {
        Self {
            inbound,
            outbound: Some(outbound),
        }
    }
}

#[async_trait]
impl ByteChannel for QueueChannel {
    async fn recv(&mut self) -> McpResult<Option<String>> {
        Ok(self.inbound.recv().await)
    }

    async fn send(&mut self, message: &str) -> McpResult<()> {
        let outbound = self
            .outbound
            .as_ref()
            .ok_or_else(|| McpError::Transport("channel closed".to_string()))?;
        outbound
            .send(message.to_string())
            .await
            .map_err(|_| McpError::Transport("receiver dropped".to_string()))
    }

    async fn close(&mut self) -> McpResult<()> {
        self.inbound.close();
        self.outbound = None;
        Ok(())
    }
}

/// Drive one session over `channel` until the peer goes away or the session closes.
///
/// A transport failure closes this session only and is returned to the caller.
pub async fn serve_channel<C>(handler: &ProtocolHandler, channel: &mut C) -> McpResult<()>
where
    C: ByteChannel + ?Sized,
{
    tracing::debug!(session = %handler.label(), "Session loop started");

    let outcome = loop {
        let text = match channel.recv().await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::info!(session = %handler.label(), "Peer closed the channel");
                break Ok(());
            }
            Err(e) => {
                tracing::error!(session = %handler.label(), "Transport failure: {e}");
                break Err(e);
            }
        };

        if text.trim().is_empty() {
            continue;
        }

        let reply = match framing::parse_message(&text) {
            Ok(msg) => handler.handle_message(msg).await,
            Err(e) => {
                tracing::warn!(session = %handler.label(), "Rejected message: {e}");
                Some(framing::rejection(&e))
            }
        };

        if let Some(reply) = reply {
            let sent = match framing::encode_message(&reply) {
                Ok(encoded) => channel.send(&encoded).await,
                Err(e) => Err(e),
            };
            if let Err(e) = sent {
                tracing::error!(session = %handler.label(), "Failed to send reply: {e}");
                break Err(e);
            }
        }

        if handler.state().await.is_closed() {
            break Ok(());
        }
    };

    handler.close().await;
    if let Err(e) = channel.close().await {
        tracing::debug!(session = %handler.label(), "Error while closing channel: {e}");
    }
    outcome
}
