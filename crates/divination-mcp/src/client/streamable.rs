//! Client side of the streamable HTTP binding.

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::transport::sse_codec::SseParser;
use crate::transport::streamable::SESSION_HEADER;
use crate::transport::ByteChannel;
use crate::types::{McpError, McpResult};

const INBOUND_DEPTH: usize = 64;

/// Each message is its own POST. Replies are collected from the POST
/// responses and handed to `recv` in arrival order.
///
/// `send` returns once the server has answered the POST's status line, so
/// messages reach the session in the order they were sent. Only the reply
/// body is read in the background.
pub struct StreamableHttpClientChannel {
    http: reqwest::Client,
    url: String,
    session_id: Option<String>,
    inbound_tx: mpsc::Sender<McpResult<String>>,
    inbound: mpsc::Receiver<McpResult<String>>,
    in_flight: Vec<JoinHandle<()>>,
}

impl StreamableHttpClientChannel {
    pub fn new(url: impl Into<String>) -> Self {
        let (inbound_tx, inbound) = mpsc::channel(INBOUND_DEPTH);
        Self {
            http: reqwest::Client::new(),
            url: url.into(),
            session_id: None,
            inbound_tx,
            inbound,
            in_flight: Vec::new(),
        }
    }

    /// Session id assigned by the server, once `initialize` has been answered.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// POST one message and wait for the response head.
    async fn post(&mut self, body: &str) -> McpResult<reqwest::Response> {
        let mut request = self
            .http
            .post(&self.url)
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json, text/event-stream")
            .body(body.to_string());
        if let Some(id) = &self.session_id {
            request = request.header(SESSION_HEADER, id.as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| McpError::Transport(format!("POST failed: {e}")))?;

        if let Some(id) = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
        {
            if self.session_id.as_deref() != Some(id) {
                tracing::debug!(session = %id, "Streamable HTTP session assigned");
                self.session_id = Some(id.to_string());
            }
        }

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(McpError::Transport(format!("POST rejected with HTTP {status}: {text}")));
        }
        Ok(response)
    }
}

/// Forward the reply carried by a POST response body, JSON or event stream.
async fn forward_reply(response: reqwest::Response, inbound: mpsc::Sender<McpResult<String>>) {
    let is_event_stream = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/event-stream"));

    if is_event_stream {
        let mut body = response.bytes_stream();
        let mut parser = SseParser::new();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in parser.feed(&bytes) {
                        if event.event == "message" && inbound.send(Ok(event.data)).await.is_err() {
                            return;
                        }
                    }
                }
                Err(e) => {
                    let _ = inbound
                        .send(Err(McpError::Transport(format!("Response stream failed: {e}"))))
                        .await;
                    return;
                }
            }
        }
    } else {
        let outcome = response
            .text()
            .await
            .map_err(|e| McpError::Transport(format!("Failed to read response body: {e}")));
        match outcome {
            Ok(text) if text.trim().is_empty() => {}
            other => {
                let _ = inbound.send(other).await;
            }
        }
    }
}

#[async_trait]
impl ByteChannel for StreamableHttpClientChannel {
    async fn recv(&mut self) -> McpResult<Option<String>> {
        match self.inbound.recv().await {
            Some(Ok(text)) => Ok(Some(text)),
            Some(Err(e)) => Err(e),
            None => Ok(None),
        }
    }

    async fn send(&mut self, message: &str) -> McpResult<()> {
        let response = self.post(message).await?;
        if response.status() == reqwest::StatusCode::ACCEPTED {
            return Ok(());
        }
        self.in_flight.retain(|task| !task.is_finished());
        self.in_flight
            .push(tokio::spawn(forward_reply(response, self.inbound_tx.clone())));
        Ok(())
    }

    /// Stop reading pending replies and end the server-side session.
    async fn close(&mut self) -> McpResult<()> {
        for task in self.in_flight.drain(..) {
            task.abort();
        }
        if let Some(id) = self.session_id.take() {
            let result = self
                .http
                .delete(&self.url)
                .header(SESSION_HEADER, id)
                .send()
                .await;
            match result {
                Ok(response) => tracing::debug!("Session DELETE answered {}", response.status()),
                Err(e) => tracing::debug!("Session DELETE failed: {e}"),
            }
        }
        Ok(())
    }
}
