//! Streamable HTTP transport (MCP 2025-03-26), one endpoint for everything.
//!
//! `POST` carries one JSON-RPC message. An `initialize` request without an
//! `Mcp-Session-Id` header opens a session and the id is returned in that
//! header; every later message must carry it. `DELETE` ends the session.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{
        sse::{Event, Sse},
        IntoResponse, Json as AxumJson, Response,
    },
    routing::post,
    Router,
};
use tokio::sync::{mpsc, Mutex};

use crate::config::HttpConfig;
use crate::protocol::ProtocolHandler;
use crate::session::{SessionManager, SessionState};
use crate::tools::ToolRegistry;
use crate::types::{JsonRpcMessage, McpError, McpResult};

use super::channel::{serve_channel, QueueChannel};
use super::{framing, http};

pub const SESSION_HEADER: &str = "mcp-session-id";

/// Messages buffered per direction before senders wait.
const QUEUE_DEPTH: usize = 64;

/// One live session: its handler plus the queues of the loop serving it.
///
/// Dropping the last reference closes the inbound queue, which ends the loop.
struct SessionLink {
    handler: Arc<ProtocolHandler>,
    queues: Mutex<Queues>,
}

struct Queues {
    inbound: mpsc::Sender<String>,
    outbound: mpsc::Receiver<String>,
}

impl SessionLink {
    /// Hand one message to the session loop and, for a request, wait for its reply.
    ///
    /// The queues stay locked for the whole exchange, so concurrent POSTs on
    /// one session are answered one at a time and in arrival order.
    async fn exchange(&self, body: String, expects_reply: bool) -> McpResult<Option<String>> {
        let mut queues = self.queues.lock().await;
        queues
            .inbound
            .send(body)
            .await
            .map_err(|_| McpError::SessionClosed)?;
        if !expects_reply {
            return Ok(None);
        }
        queues.outbound.recv().await.map(Some).ok_or(McpError::SessionClosed)
    }
}

struct StreamableState {
    registry: Arc<ToolRegistry>,
    sessions: SessionManager<Arc<SessionLink>>,
    json_response: bool,
}

impl StreamableState {
    /// Register a session and start its loop.
    fn open_session(&self) -> (String, Arc<SessionLink>) {
        let (inbound_tx, inbound_rx) = mpsc::channel(QUEUE_DEPTH);
        let (outbound_tx, outbound_rx) = mpsc::channel(QUEUE_DEPTH);

        let (id, link) = self.sessions.create_with(|id| {
            Arc::new(SessionLink {
                handler: Arc::new(
                    ProtocolHandler::new(self.registry.clone()).with_label(format!("http:{id}")),
                ),
                queues: Mutex::new(Queues {
                    inbound: inbound_tx,
                    outbound: outbound_rx,
                }),
            })
        });

        let handler = link.handler.clone();
        let sessions = self.sessions.clone();
        let loop_id = id.clone();
        tokio::spawn(async move {
            let mut channel = QueueChannel::new(inbound_rx, outbound_tx);
            if let Err(e) = serve_channel(&handler, &mut channel).await {
                tracing::warn!(session = %loop_id, "Streamable HTTP session ended with error: {e}");
            }
            sessions.remove(&loop_id);
        });

        tracing::info!(session = %id, "Streamable HTTP session opened");
        (id, link)
    }
}

pub struct StreamableHttpTransport {
    state: Arc<StreamableState>,
    path: String,
}

impl StreamableHttpTransport {
    pub fn new(registry: Arc<ToolRegistry>, config: &HttpConfig) -> Self {
        Self {
            state: Arc::new(StreamableState {
                registry,
                sessions: SessionManager::new(),
                json_response: config.json_response,
            }),
            path: config.streamable_path.clone(),
        }
    }

    pub fn router(&self) -> Router {
        let app = Router::new()
            .route(
                &self.path,
                post(handle_post)
                    .delete(handle_delete)
                    .get(handle_get),
            )
            .with_state(self.state.clone());
        http::finish_router(app)
    }

    pub fn session_count(&self) -> usize {
        self.state.sessions.len()
    }

    /// Run the HTTP server on the given address.
    pub async fn run(&self, addr: &str) -> McpResult<()> {
        http::serve(addr, self.router()).await
    }
}

fn session_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

fn accepts_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("text/event-stream"))
}

fn with_session_id(mut response: Response, session_id: &str) -> Response {
    if let Ok(value) = HeaderValue::from_str(session_id) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(SESSION_HEADER), value);
    }
    response
}

fn is_initialize(msg: &JsonRpcMessage) -> bool {
    msg.is_request() && msg.method() == Some("initialize")
}

async fn handle_post(
    State(state): State<Arc<StreamableState>>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let msg = match framing::parse_message(&body) {
        Ok(msg) => msg,
        Err(e) => {
            tracing::warn!("Rejected POST body: {e}");
            return (StatusCode::BAD_REQUEST, AxumJson(framing::rejection(&e))).into_response();
        }
    };

    let (session_id, link, created) = match session_header(&headers) {
        Some(id) => match state.sessions.get(id) {
            Some(link) => (id.to_string(), link, false),
            None => return (StatusCode::NOT_FOUND, "Session not found").into_response(),
        },
        None if is_initialize(&msg) => {
            let (id, link) = state.open_session();
            (id, link, true)
        }
        None => {
            return (StatusCode::BAD_REQUEST, "Bad Request: Missing session ID").into_response();
        }
    };

    let reply = match link.exchange(body, msg.is_request()).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(session = %session_id, "Session loop is gone: {e}");
            state.sessions.remove(&session_id);
            return (StatusCode::NOT_FOUND, "Session is closed").into_response();
        }
    };

    let session_state = link.handler.state().await;
    let rejected_initialize = created && session_state == SessionState::Uninitialized;
    if session_state.is_closed() || rejected_initialize {
        state.sessions.remove(&session_id);
    }

    let response = match reply {
        Some(reply) => render_reply(reply, &headers, state.json_response),
        None => StatusCode::ACCEPTED.into_response(),
    };
    if rejected_initialize {
        return response;
    }
    with_session_id(response, &session_id)
}

/// `reply` is an already encoded JSON-RPC message.
fn render_reply(reply: String, headers: &HeaderMap, json_response: bool) -> Response {
    if json_response || !accepts_event_stream(headers) {
        return ([(header::CONTENT_TYPE, "application/json")], reply).into_response();
    }
    let event = Event::default().event("message").data(reply);
    Sse::new(tokio_stream::once(Ok::<_, Infallible>(event))).into_response()
}

async fn handle_delete(State(state): State<Arc<StreamableState>>, headers: HeaderMap) -> Response {
    let Some(id) = session_header(&headers) else {
        return (StatusCode::BAD_REQUEST, "Bad Request: Missing session ID").into_response();
    };
    match state.sessions.remove(id) {
        Some(link) => {
            link.handler.close().await;
            tracing::info!(session = %id, "Streamable HTTP session deleted");
            StatusCode::OK.into_response()
        }
        None => (StatusCode::NOT_FOUND, "Session not found").into_response(),
    }
}

/// Server-initiated streams are not offered.
async fn handle_get() -> Response {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        [(header::ALLOW, "POST, DELETE")],
        "Method Not Allowed",
    )
        .into_response()
}
