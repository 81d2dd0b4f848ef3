//! HTTP+SSE binding: routing and status codes against the router, and the
//! client harness against a live server.

#![cfg(feature = "http")]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use divination_mcp::client::{run_binding, sample_arguments, ClientBinding, Deadlines, HarnessStep};
use divination_mcp::config::HttpConfig;
use divination_mcp::default_registry;
use divination_mcp::transport::sse_codec::SseParser;
use divination_mcp::transport::SseTransport;
use divination_mcp::types::McpError;

// ─────────────────────── helpers ───────────────────────

fn transport() -> SseTransport {
    SseTransport::new(Arc::new(default_registry().unwrap()), &HttpConfig::default())
}

/// Serve `app` on an ephemeral local port.
async fn spawn_server(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn deadlines() -> Deadlines {
    Deadlines {
        initialize: Duration::from_secs(10),
        list_tools: Duration::from_secs(10),
        call_tool: Duration::from_secs(10),
    }
}

// ═══════════════════════════════════════════════════════
// ROUTER
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_health() {
    let resp = transport()
        .router()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header(header::ORIGIN, "http://example.test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");

    let body: Value = serde_json::from_slice(&to_bytes(resp.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["server"], "divination-charting-mcp");
}

#[tokio::test]
async fn test_post_needs_a_live_session() {
    let app = transport().router();
    let ping = r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#;

    let resp = app.clone().oneshot(post("/messages/", ping)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = app
        .oneshot(post("/messages/?session_id=0123456789abcdef", ping))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_stream_lifecycle() {
    let sse = transport();
    let app = sse.router();

    let resp = app.clone().oneshot(get("/sse")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(resp.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(sse.session_count(), 1);

    let mut stream = resp.into_body().into_data_stream();
    let mut parser = SseParser::new();
    let mut events = Vec::new();
    while events.is_empty() {
        let chunk = stream.next().await.unwrap().unwrap();
        events.extend(parser.feed(&chunk));
    }
    assert_eq!(events[0].event, "endpoint");
    let endpoint = events[0].data.clone();
    let session_id = endpoint.strip_prefix("/messages/?session_id=").unwrap();
    assert_eq!(session_id.len(), 32, "{endpoint}");
    assert!(session_id.chars().all(|c| c.is_ascii_hexdigit()));

    let resp = app
        .clone()
        .oneshot(post(&endpoint, r#"{"jsonrpc":"2.0","id":7,"method":"ping"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::ACCEPTED);

    // The reply arrives on the stream, not in the POST response.
    let reply = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let chunk = stream.next().await.unwrap().unwrap();
            if let Some(event) = parser.feed(&chunk).into_iter().find(|e| e.event == "message") {
                return event;
            }
        }
    })
    .await
    .unwrap();
    let reply: Value = serde_json::from_str(&reply.data).unwrap();
    assert_eq!(reply["id"], 7);
    assert_eq!(reply["result"], json!({}));

    let resp = app.clone().oneshot(post(&endpoint, r#"{"broken":"#)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = serde_json::from_slice(&to_bytes(resp.into_body(), usize::MAX).await.unwrap()).unwrap();
    assert_eq!(body["error"]["code"], -32700);

    // Dropping the stream ends the session.
    drop(stream);
    assert_eq!(sse.session_count(), 0);
    let resp = app
        .oneshot(post(&endpoint, r#"{"jsonrpc":"2.0","id":8,"method":"ping"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_streams_are_independent_sessions() {
    let sse = transport();
    let app = sse.router();

    let first = app.clone().oneshot(get("/sse")).await.unwrap();
    let second = app.clone().oneshot(get("/sse")).await.unwrap();
    assert_eq!(sse.session_count(), 2);

    drop(first);
    assert_eq!(sse.session_count(), 1);
    drop(second);
    assert_eq!(sse.session_count(), 0);
}

// ═══════════════════════════════════════════════════════
// LIVE SERVER
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_demo_over_sse() {
    let addr = spawn_server(transport().router()).await;
    let binding = ClientBinding::Sse {
        url: format!("http://{addr}/sse"),
    };

    let report = tokio_test::assert_ok!(run_binding(&binding, &deadlines(), sample_arguments()).await);
    assert_eq!(report.server.name, "divination-charting-mcp");
    assert_eq!(report.tools[0].name, "divination_liu_yao");

    let chart: Value = serde_json::from_str(&report.result.unwrap().joined_text()).unwrap();
    assert_eq!(chart["original"]["number"], 57);
    assert_eq!(chart["moving_lines"], json!([1, 6]));
}

#[tokio::test]
async fn test_sse_connect_to_wrong_path_fails() {
    let addr = spawn_server(transport().router()).await;
    let binding = ClientBinding::Sse {
        url: format!("http://{addr}/not-here"),
    };

    let err = tokio_test::assert_err!(run_binding(&binding, &deadlines(), sample_arguments()).await);
    assert_eq!(err.step, HarnessStep::Connect);
    assert!(matches!(err.source, McpError::Transport(_)), "{err}");
}

#[tokio::test]
async fn test_sse_connect_to_silent_server_times_out() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    // Accept connections and never write a byte.
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    let binding = ClientBinding::Sse {
        url: format!("http://{addr}/sse"),
    };
    let deadlines = Deadlines {
        initialize: Duration::from_millis(500),
        ..deadlines()
    };
    let outcome = tokio::time::timeout(
        Duration::from_secs(10),
        run_binding(&binding, &deadlines, sample_arguments()),
    )
    .await;
    let result = tokio_test::assert_ok!(outcome, "SSE connect ignored its deadline");
    let err = tokio_test::assert_err!(result);
    assert_eq!(err.step, HarnessStep::Connect);
    assert!(
        matches!(err.source, McpError::Timeout { after, .. } if after == Duration::from_millis(500)),
        "{err}"
    );
}
