//! Client side of the HTTP+SSE binding.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{header, Url};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::transport::sse_codec::{SseEvent, SseParser};
use crate::transport::ByteChannel;
use crate::types::{McpError, McpResult};

const EVENT_DEPTH: usize = 64;

pub struct SseClientChannel {
    http: reqwest::Client,
    endpoint: Url,
    events: mpsc::Receiver<McpResult<SseEvent>>,
    reader: JoinHandle<()>,
}

impl SseClientChannel {
    /// Open the event stream at `url` and read its `endpoint` event.
    ///
    /// `deadline` covers the whole handshake: the GET and the first event.
    pub async fn connect(url: &str, deadline: Duration) -> McpResult<Self> {
        let base = Url::parse(url)
            .map_err(|e| McpError::Transport(format!("Invalid SSE URL '{url}': {e}")))?;
        let http = reqwest::Client::new();
        let started = Instant::now();
        let timed_out = || McpError::Timeout {
            operation: "SSE connect".to_string(),
            after: deadline,
        };

        let request = http
            .get(base.clone())
            .header(header::ACCEPT, "text/event-stream")
            .send();
        let response = tokio::time::timeout(deadline, request)
            .await
            .map_err(|_| timed_out())?
            .map_err(|e| McpError::Transport(format!("Failed to connect to SSE stream: {e}")))?;
        if !response.status().is_success() {
            return Err(McpError::Transport(format!(
                "SSE stream rejected with HTTP {}",
                response.status()
            )));
        }
        tracing::info!("Connected to SSE stream at {base}");

        let (tx, mut events) = mpsc::channel(EVENT_DEPTH);
        let reader = tokio::spawn(read_events(response, tx));

        let remaining = deadline.saturating_sub(started.elapsed());
        let first = tokio::time::timeout(remaining, events.recv())
            .await
            .map_err(|_| timed_out());
        let endpoint = match first {
            Ok(Some(Ok(event))) if event.event == "endpoint" => base
                .join(event.data.trim())
                .map_err(|e| McpError::Transport(format!("Invalid endpoint '{}': {e}", event.data))),
            Ok(Some(Ok(event))) => Err(McpError::Transport(format!(
                "Expected endpoint event, got '{}'",
                event.event
            ))),
            Ok(Some(Err(e))) => Err(e),
            Ok(None) => Err(McpError::Transport(
                "SSE stream ended before the endpoint event".to_string(),
            )),
            Err(e) => Err(e),
        };
        let endpoint = match endpoint {
            Ok(endpoint) => endpoint,
            Err(e) => {
                reader.abort();
                return Err(e);
            }
        };
        tracing::debug!("Posting messages to {endpoint}");

        Ok(Self {
            http,
            endpoint,
            events,
            reader,
        })
    }
}

async fn read_events(response: reqwest::Response, tx: mpsc::Sender<McpResult<SseEvent>>) {
    let mut body = response.bytes_stream();
    let mut parser = SseParser::new();

    while let Some(chunk) = body.next().await {
        match chunk {
            Ok(bytes) => {
                for event in parser.feed(&bytes) {
                    if tx.send(Ok(event)).await.is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                let _ = tx
                    .send(Err(McpError::Transport(format!("SSE stream failed: {e}"))))
                    .await;
                return;
            }
        }
    }
}

#[async_trait]
impl ByteChannel for SseClientChannel {
    async fn recv(&mut self) -> McpResult<Option<String>> {
        loop {
            match self.events.recv().await {
                Some(Ok(event)) if event.event == "message" => return Ok(Some(event.data)),
                Some(Ok(event)) => tracing::debug!("Ignoring SSE event '{}'", event.event),
                Some(Err(e)) => return Err(e),
                None => return Ok(None),
            }
        }
    }

    async fn send(&mut self, message: &str) -> McpResult<()> {
        let response = self
            .http
            .post(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .body(message.to_string())
            .send()
            .await
            .map_err(|e| McpError::Transport(format!("POST failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::Transport(format!("POST rejected with HTTP {status}: {body}")));
        }
        Ok(())
    }

    async fn close(&mut self) -> McpResult<()> {
        self.reader.abort();
        self.events.close();
        Ok(())
    }
}
