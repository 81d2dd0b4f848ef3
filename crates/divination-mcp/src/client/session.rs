//! Client session: one background I/O task, many concurrent requests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::transport::ByteChannel;
use crate::types::*;

type Waiter = oneshot::Sender<McpResult<Value>>;
type PendingTable = Arc<Mutex<HashMap<RequestId, Waiter>>>;

const OUTGOING_DEPTH: usize = 64;
const CLOSE_GRACE: Duration = Duration::from_secs(5);

fn lock(pending: &PendingTable) -> MutexGuard<'_, HashMap<RequestId, Waiter>> {
    pending.lock().unwrap_or_else(|e| e.into_inner())
}

/// A connected MCP client.
///
/// Requests are correlated to responses by id, so calls may overlap. Each
/// call carries its own deadline; a response that arrives after its caller
/// gave up is dropped.
pub struct McpClient {
    outgoing: mpsc::Sender<String>,
    pending: PendingTable,
    next_id: AtomicI64,
    closed: Arc<AtomicBool>,
    io_task: JoinHandle<()>,
}

impl McpClient {
    /// Start the I/O task over `channel`. Must be called inside a tokio runtime.
    pub fn new<C>(channel: C) -> Self
    where
        C: ByteChannel + 'static,
    {
        let (outgoing, outgoing_rx) = mpsc::channel(OUTGOING_DEPTH);
        let pending: PendingTable = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));

        let io_task = tokio::spawn(drive(channel, outgoing_rx, pending.clone(), closed.clone()));

        Self {
            outgoing,
            pending,
            next_id: AtomicI64::new(1),
            closed,
            io_task,
        }
    }

    /// True once the transport has gone away.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a request and wait up to `deadline` for its response.
    pub async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        deadline: Duration,
    ) -> McpResult<Value> {
        if self.is_closed() {
            return Err(McpError::SessionClosed);
        }

        let id = RequestId::Number(self.next_id.fetch_add(1, Ordering::SeqCst));
        let text = serde_json::to_string(&JsonRpcRequest::new(id.clone(), method, params))?;
        let (tx, rx) = oneshot::channel();
        lock(&self.pending).insert(id.clone(), tx);

        // The I/O task may have drained the table between the check above and the insert.
        if self.is_closed() {
            lock(&self.pending).remove(&id);
            return Err(McpError::SessionClosed);
        }

        tracing::trace!(%id, method, "Sending request");

        let exchange = async {
            self.outgoing
                .send(text)
                .await
                .map_err(|_| McpError::SessionClosed)?;
            rx.await.map_err(|_| McpError::SessionClosed)?
        };

        match tokio::time::timeout(deadline, exchange).await {
            Ok(result) => {
                if result.is_err() {
                    lock(&self.pending).remove(&id);
                }
                result
            }
            Err(_) => {
                lock(&self.pending).remove(&id);
                tracing::warn!(%id, method, "Request timed out after {deadline:?}");
                Err(McpError::Timeout {
                    operation: method.to_string(),
                    after: deadline,
                })
            }
        }
    }

    /// Send a notification. No response is expected.
    pub async fn notify(&self, method: &str, params: Option<Value>) -> McpResult<()> {
        if self.is_closed() {
            return Err(McpError::SessionClosed);
        }
        let text = serde_json::to_string(&JsonRpcNotification::new(method, params))?;
        self.outgoing
            .send(text)
            .await
            .map_err(|_| McpError::SessionClosed)
    }

    pub async fn initialize(&self, deadline: Duration) -> McpResult<InitializeResult> {
        let params = serde_json::to_value(InitializeParams::for_client("divination-mcp-client"))?;
        let result = self.request("initialize", Some(params), deadline).await?;
        let result: InitializeResult = serde_json::from_value(result)?;
        tracing::info!(
            "Connected to {} v{} (protocol {})",
            result.server_info.name,
            result.server_info.version,
            result.protocol_version
        );
        Ok(result)
    }

    /// Finish the handshake.
    pub async fn initialized(&self) -> McpResult<()> {
        self.notify("notifications/initialized", None).await
    }

    pub async fn ping(&self, deadline: Duration) -> McpResult<()> {
        self.request("ping", None, deadline).await.map(|_| ())
    }

    pub async fn list_tools(&self, deadline: Duration) -> McpResult<Vec<ToolDefinition>> {
        let result = self.request("tools/list", None, deadline).await?;
        let result: ToolListResult = serde_json::from_value(result)?;
        Ok(result.tools)
    }

    /// Call a tool. A result flagged `isError` comes back as [`McpError::ToolExecution`].
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
        deadline: Duration,
    ) -> McpResult<ToolCallResult> {
        let params = serde_json::to_value(ToolCallParams {
            name: name.to_string(),
            arguments: Some(arguments),
        })?;
        let result = self.request("tools/call", Some(params), deadline).await?;
        let result: ToolCallResult = serde_json::from_value(result)?;
        if result.is_error() {
            return Err(McpError::ToolExecution(result.joined_text()));
        }
        Ok(result)
    }

    /// Close the channel and wait briefly for the I/O task to finish.
    pub async fn close(self) {
        let McpClient {
            outgoing, io_task, ..
        } = self;
        drop(outgoing);
        if tokio::time::timeout(CLOSE_GRACE, io_task).await.is_err() {
            tracing::warn!("Client I/O task did not stop within {CLOSE_GRACE:?}");
        }
    }
}

async fn drive<C>(
    mut channel: C,
    mut outgoing: mpsc::Receiver<String>,
    pending: PendingTable,
    closed: Arc<AtomicBool>,
) where
    C: ByteChannel,
{
    let failure = loop {
        tokio::select! {
            next = outgoing.recv() => match next {
                Some(text) => {
                    if let Err(e) = channel.send(&text).await {
                        break Some(e.to_string());
                    }
                }
                None => break None,
            },
            incoming = channel.recv() => match incoming {
                Ok(Some(text)) => route_incoming(&pending, &text),
                Ok(None) => break Some("server closed the connection".to_string()),
                Err(e) => break Some(e.to_string()),
            },
        }
    };

    closed.store(true, Ordering::SeqCst);
    if let Err(e) = channel.close().await {
        tracing::debug!("Error while closing client channel: {e}");
    }

    let waiters: Vec<Waiter> = lock(&pending).drain().map(|(_, w)| w).collect();
    for waiter in waiters {
        let err = match &failure {
            Some(reason) => McpError::Transport(reason.clone()),
            None => McpError::SessionClosed,
        };
        let _ = waiter.send(Err(err));
    }

    match failure {
        Some(reason) => tracing::warn!("Client session closed: {reason}"),
        None => tracing::debug!("Client session closed"),
    }
}

fn route_incoming(pending: &PendingTable, text: &str) {
    let msg: JsonRpcMessage = match serde_json::from_str(text) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("Ignoring unparseable message from server: {e}");
            return;
        }
    };

    let (id, outcome) = match msg {
        JsonRpcMessage::Response(resp) => (resp.id, Ok(resp.result)),
        JsonRpcMessage::Error(err) => (err.id, Err(McpError::from_error_object(&err.error))),
        JsonRpcMessage::Request(req) => {
            tracing::debug!("Ignoring server request: {}", req.method);
            return;
        }
        JsonRpcMessage::Notification(notif) => {
            tracing::debug!("Server notification: {}", notif.method);
            return;
        }
    };

    let waiter = lock(pending).remove(&id);
    match waiter {
        Some(waiter) => {
            let _ = waiter.send(outcome);
        }
        None => tracing::debug!(%id, "Dropping late or unknown response"),
    }
}
