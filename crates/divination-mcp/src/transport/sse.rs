//! SSE transport (HTTP+SSE, MCP 2024-11-05).
//!
//! `GET /sse` opens an event stream whose first event, `endpoint`, names the
//! URL the client must POST its messages to. Replies travel back as
//! `message` events on the same stream.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json as AxumJson, Response,
    },
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::config::HttpConfig;
use crate::protocol::ProtocolHandler;
use crate::session::SessionManager;
use crate::tools::ToolRegistry;
use crate::types::McpResult;

use super::channel::{serve_channel, QueueChannel};
use super::{framing, http};

/// Messages buffered per direction before senders wait.
const QUEUE_DEPTH: usize = 64;

struct SseState {
    registry: Arc<ToolRegistry>,
    /// Inbound queue of each live session.
    sessions: SessionManager<mpsc::Sender<String>>,
    message_path: String,
}

/// SSE transport for web-based MCP clients.
pub struct SseTransport {
    state: Arc<SseState>,
    sse_path: String,
}

impl SseTransport {
    pub fn new(registry: Arc<ToolRegistry>, config: &HttpConfig) -> Self {
        Self {
            state: Arc::new(SseState {
                registry,
                sessions: SessionManager::new(),
                message_path: config.message_path.clone(),
            }),
            sse_path: config.sse_path.clone(),
        }
    }

    pub fn router(&self) -> Router {
        let app = Router::new()
            .route(&self.sse_path, get(handle_stream))
            .route(&self.state.message_path, post(handle_post))
            .with_state(self.state.clone());
        http::finish_router(app)
    }

    /// Number of open event streams.
    pub fn session_count(&self) -> usize {
        self.state.sessions.len()
    }

    /// Run the HTTP server on the given address.
    pub async fn run(&self, addr: &str) -> McpResult<()> {
        http::serve(addr, self.router()).await
    }
}

/// Removes the session when its event stream is dropped, which ends the
/// session loop by closing its inbound queue.
struct StreamGuard {
    sessions: SessionManager<mpsc::Sender<String>>,
    id: String,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        if self.sessions.remove(&self.id).is_some() {
            tracing::info!(session = %self.id, "SSE stream closed by client");
        }
    }
}

async fn handle_stream(
    State(state): State<Arc<SseState>>,
) -> Sse<impl futures::Stream<Item = Result<Event, Infallible>>> {
    let (inbound_tx, inbound_rx) = mpsc::channel::<String>(QUEUE_DEPTH);
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(QUEUE_DEPTH);

    let session_id = state.sessions.create(inbound_tx);
    let endpoint = format!("{}?session_id={}", state.message_path, session_id);
    tracing::info!(session = %session_id, "SSE stream opened");

    let handler =
        ProtocolHandler::new(state.registry.clone()).with_label(format!("sse:{session_id}"));
    let sessions = state.sessions.clone();
    let id = session_id.clone();
    tokio::spawn(async move {
        let mut channel = QueueChannel::new(inbound_rx, outbound_tx);
        if let Err(e) = serve_channel(&handler, &mut channel).await {
            tracing::warn!(session = %id, "SSE session ended with error: {e}");
        }
        sessions.remove(&id);
    });

    let guard = StreamGuard {
        sessions: state.sessions.clone(),
        id: session_id,
    };
    let stream = async_stream::stream! {
        let _guard = guard;
        yield Ok(Event::default().event("endpoint").data(endpoint));
        while let Some(message) = outbound_rx.recv().await {
            yield Ok(Event::default().event("message").data(message));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
struct MessageQuery {
    session_id: Option<String>,
}

async fn handle_post(
    State(state): State<Arc<SseState>>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Response {
    let Some(session_id) = query.session_id else {
        return (StatusCode::BAD_REQUEST, "session_id is required").into_response();
    };
    let Some(inbound) = state.sessions.get(&session_id) else {
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    };

    if let Err(e) = framing::parse_message(&body) {
        tracing::warn!(session = %session_id, "Rejected POST body: {e}");
        return (StatusCode::BAD_REQUEST, AxumJson(framing::rejection(&e))).into_response();
    }

    if inbound.send(body).await.is_err() {
        state.sessions.remove(&session_id);
        return (StatusCode::NOT_FOUND, "Session is closed").into_response();
    }

    (StatusCode::ACCEPTED, "Accepted").into_response()
}
