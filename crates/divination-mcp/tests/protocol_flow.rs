//! Protocol engine integration tests: lifecycle ordering, discovery,
//! validation and error kinds, driven message by message.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};

use divination_mcp::protocol::ProtocolHandler;
use divination_mcp::schema::SchemaNode;
use divination_mcp::session::SessionState;
use divination_mcp::tools::{default_registry, divination, ToolDescriptor, ToolError, ToolOutput, ToolRegistry};
use divination_mcp::transport::framing;
use divination_mcp::types::*;

// ─────────────────────── helpers ───────────────────────

/// Build an MCP JSON-RPC request.
fn mcp_request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

/// Build an MCP JSON-RPC notification.
fn mcp_notification(method: &str) -> Value {
    json!({ "jsonrpc": "2.0", "method": method })
}

/// Build an initialize request.
fn init_request() -> Value {
    mcp_request(
        0,
        "initialize",
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0" }
        }),
    )
}

fn divination_handler() -> ProtocolHandler {
    ProtocolHandler::new(Arc::new(default_registry().unwrap()))
}

/// Send a JSON-RPC message through the handler and return the response.
async fn send(handler: &ProtocolHandler, msg: Value) -> Option<Value> {
    let parsed: JsonRpcMessage = serde_json::from_value(msg).unwrap();
    handler.handle_message(parsed).await
}

/// Send and unwrap the response.
async fn send_unwrap(handler: &ProtocolHandler, msg: Value) -> Value {
    send(handler, msg).await.expect("expected response")
}

/// Run the initialize handshake to completion.
async fn handshake(handler: &ProtocolHandler) {
    let resp = send_unwrap(handler, init_request()).await;
    assert!(resp.get("result").is_some(), "initialize failed: {resp}");
    assert!(send(handler, mcp_notification("notifications/initialized")).await.is_none());
}

async fn call_divination(handler: &ProtocolHandler, id: i64, arguments: Value) -> Value {
    send_unwrap(
        handler,
        mcp_request(
            id,
            "tools/call",
            json!({ "name": "divination_liu_yao", "arguments": arguments }),
        ),
    )
    .await
}

/// Parse the single text content item of a successful call as JSON.
fn chart_of(resp: &Value) -> Value {
    assert!(resp.get("error").is_none(), "call failed: {resp}");
    assert_ne!(resp["result"]["isError"], true, "call failed: {resp}");
    let text = resp["result"]["content"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

/// Registry with one tool that counts how often its handler runs.
fn counting_registry(calls: Arc<AtomicUsize>) -> ToolRegistry {
    let schema = SchemaNode::object()
        .field("n", SchemaNode::integer().range(0, 10))
        .optional_field("label", SchemaNode::string().length(1, 8), Some(json!("none")));
    let tool = ToolDescriptor::new("count", "Counts its invocations.", schema, move |args| {
        calls.fetch_add(1, Ordering::SeqCst);
        if args["n"] == 0 {
            return Err(ToolError::new("zero is not countable"));
        }
        Ok(ToolOutput::Structured(args))
    });
    let mut registry = ToolRegistry::new();
    registry.register(tool).unwrap();
    registry
}

/// Divination arguments with an explicit cast.
fn cast(year: i64, month: i64, day: i64, hour: i64, yaogua: Value) -> Value {
    json!({ "year": year, "month": month, "day": day, "hour": hour, "yaogua": yaogua })
}

/// The divination input schema in front of a handler that only counts.
fn counting_divination(calls: Arc<AtomicUsize>) -> ProtocolHandler {
    let tool = ToolDescriptor::new(
        divination::TOOL_NAME,
        "Counts its invocations.",
        divination::input_schema(),
        move |args| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(ToolOutput::Structured(args))
        },
    );
    let mut registry = ToolRegistry::new();
    registry.register(tool).unwrap();
    ProtocolHandler::new(Arc::new(registry))
}

// ═══════════════════════════════════════════════════════
// LIFECYCLE
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_tools_before_initialize_are_order_errors() {
    let handler = divination_handler();

    for (id, method) in [(1, "tools/list"), (2, "tools/call")] {
        let resp = send_unwrap(&handler, mcp_request(id, method, json!({"name": "divination_liu_yao"}))).await;
        assert_eq!(resp["id"], id);
        assert_eq!(resp["error"]["code"], -32002, "{method}: {resp}");
        assert_eq!(resp["error"]["data"]["method"], method);
    }
    assert_eq!(handler.state().await, SessionState::Uninitialized);
}

#[tokio::test]
async fn test_only_initialize_and_ping_before_initialize() {
    let handler = divination_handler();

    for (id, method) in [(1, "shutdown"), (2, "resources/list"), (3, "unknown/method")] {
        let resp = send_unwrap(&handler, mcp_request(id, method, json!(null))).await;
        assert_eq!(resp["error"]["code"], -32002, "{method}: {resp}");
        assert_eq!(resp["error"]["data"]["method"], method);
    }
    assert_eq!(handler.state().await, SessionState::Uninitialized);

    // The rejected shutdown left the session open for a normal handshake.
    handshake(&handler).await;
    assert_eq!(handler.state().await, SessionState::Ready);
    let resp = send_unwrap(&handler, mcp_request(4, "unknown/method", json!(null))).await;
    assert_eq!(resp["error"]["code"], -32601);
}

#[tokio::test]
async fn test_tools_between_initialize_and_initialized() {
    let handler = divination_handler();
    send_unwrap(&handler, init_request()).await;
    assert_eq!(handler.state().await, SessionState::Initializing);

    let resp = send_unwrap(&handler, mcp_request(1, "tools/list", json!(null))).await;
    assert_eq!(resp["error"]["code"], -32002);

    // The legacy notification name is accepted too.
    send(&handler, mcp_notification("initialized")).await;
    assert_eq!(handler.state().await, SessionState::Ready);
    let resp = send_unwrap(&handler, mcp_request(2, "tools/list", json!(null))).await;
    assert_eq!(resp["result"]["tools"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_initialize_result_shape() {
    let handler = divination_handler();
    let resp = send_unwrap(&handler, init_request()).await;
    let result = &resp["result"];
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"]["name"], "divination-charting-mcp");
    assert!(result["capabilities"]["tools"].is_object());
    assert!(result["instructions"].as_str().is_some());
}

#[tokio::test]
async fn test_second_initialize_is_rejected() {
    let handler = divination_handler();
    handshake(&handler).await;

    let resp = send_unwrap(&handler, init_request()).await;
    assert_eq!(resp["error"]["code"], -32002, "re-initialize must fail: {resp}");
    assert_eq!(handler.state().await, SessionState::Ready);
}

#[tokio::test]
async fn test_ping_in_every_open_state() {
    let handler = divination_handler();
    let ping = || mcp_request(9, "ping", json!(null));

    assert_eq!(send_unwrap(&handler, ping()).await["result"], json!({}));
    send_unwrap(&handler, init_request()).await;
    assert_eq!(send_unwrap(&handler, ping()).await["result"], json!({}));
    send(&handler, mcp_notification("notifications/initialized")).await;
    assert_eq!(send_unwrap(&handler, ping()).await["result"], json!({}));

    send_unwrap(&handler, mcp_request(10, "shutdown", json!(null))).await;
    assert_eq!(send_unwrap(&handler, ping()).await["error"]["code"], -32003);
}

#[tokio::test]
async fn test_shutdown_then_everything_is_session_closed() {
    let handler = divination_handler();
    handshake(&handler).await;

    let resp = send_unwrap(&handler, mcp_request(1, "shutdown", json!(null))).await;
    assert_eq!(resp["result"], json!({}));
    assert_eq!(handler.state().await, SessionState::Closed);

    for method in ["tools/list", "tools/call", "initialize", "unknown/method"] {
        let resp = send_unwrap(&handler, mcp_request(2, method, json!({}))).await;
        assert_eq!(resp["error"]["code"], -32003, "{method}: {resp}");
    }
}

#[tokio::test]
async fn test_cancellation_notification_is_ignored() {
    let handler = divination_handler();
    handshake(&handler).await;

    let cancel = json!({
        "jsonrpc": "2.0",
        "method": "notifications/cancelled",
        "params": { "requestId": 3, "reason": "user" }
    });
    assert!(send(&handler, cancel).await.is_none());
    assert_eq!(handler.state().await, SessionState::Ready);
}

// ═══════════════════════════════════════════════════════
// DISCOVERY AND CALLS
// ═══════════════════════════════════════════════════════

#[tokio::test]
async fn test_tools_list_is_stable() {
    let handler = divination_handler();
    handshake(&handler).await;

    let first = send_unwrap(&handler, mcp_request(1, "tools/list", json!(null))).await;
    let second = send_unwrap(&handler, mcp_request(2, "tools/list", json!(null))).await;
    assert_eq!(first["result"], second["result"]);

    let tool = &first["result"]["tools"][0];
    assert_eq!(tool["name"], "divination_liu_yao");
    assert_eq!(tool["inputSchema"]["type"], "object");
    assert_eq!(tool["inputSchema"]["required"], json!(["year", "month", "day", "hour"]));
    assert!(tool["description"].as_str().unwrap().contains("JSON Schema"));
}

#[tokio::test]
async fn test_sample_cast() {
    let handler = divination_handler();
    handshake(&handler).await;

    let resp = call_divination(
        &handler,
        1,
        json!({"year": 2024, "month": 9, "day": 19, "hour": 15, "yaogua": [0, 1, 1, 2, 1, 3]}),
    )
    .await;
    let chart = chart_of(&resp);
    assert_eq!(chart["yaogua"], json!([0, 1, 1, 2, 1, 3]));
    assert_eq!(chart["moving_lines"], json!([1, 6]));
}

#[tokio::test]
async fn test_lenient_integers() {
    let handler = divination_handler();
    handshake(&handler).await;

    let resp = call_divination(
        &handler,
        1,
        json!({"year": "2024", "month": 9.0, "day": 19, "hour": 15, "yaogua": [0, 1, 1, 2, 1, 3], "extra": true}),
    )
    .await;
    let chart = chart_of(&resp);
    assert_eq!(chart["yaogua"], json!([0, 1, 1, 2, 1, 3]));
}

#[tokio::test]
async fn test_random_cast_when_yaogua_missing_or_null() {
    let handler = divination_handler();
    handshake(&handler).await;

    for (id, args) in [
        (1, json!({"year": 2024, "month": 9, "day": 19, "hour": 15})),
        (2, json!({"year": 2024, "month": 9, "day": 19, "hour": 15, "yaogua": null})),
    ] {
        let chart = chart_of(&call_divination(&handler, id, args).await);
        let lines = chart["yaogua"].as_array().unwrap();
        assert_eq!(lines.len(), 6);
        assert!(lines.iter().all(|v| v.as_u64().is_some_and(|n| n <= 3)));
    }
}

#[tokio::test]
async fn test_out_of_range_hour_is_validation_error() {
    let handler = divination_handler();
    handshake(&handler).await;

    let resp = call_divination(&handler, 4, json!({"year": 2024, "month": 9, "day": 19, "hour": 24})).await;
    let error = &resp["error"];
    assert_eq!(error["code"], -32602, "{resp}");
    assert_eq!(
        error["message"],
        "Invalid arguments: hour: 24 is out of range (expected 0 to 23)"
    );
    assert_eq!(error["data"][0]["path"], "hour");
    assert_eq!(error["data"][0]["reason"]["kind"], "out_of_range");
}

#[tokio::test]
async fn test_inclusive_bounds_are_accepted() {
    let handler = divination_handler();
    handshake(&handler).await;

    let sample = json!([0, 1, 1, 2, 1, 3]);
    let rows = [
        cast(1900, 9, 19, 15, sample.clone()),
        cast(2100, 9, 19, 15, sample.clone()),
        cast(2024, 12, 19, 15, sample.clone()),
        cast(2024, 1, 31, 15, sample.clone()),
        cast(2024, 9, 19, 0, sample.clone()),
        cast(2024, 9, 19, 23, sample.clone()),
        cast(2024, 9, 19, 15, json!([0, 0, 0, 0, 0, 0])),
        cast(2024, 9, 19, 15, json!([3, 3, 3, 3, 3, 3])),
    ];

    for (id, arguments) in rows.into_iter().enumerate() {
        let chart = chart_of(&call_divination(&handler, id as i64, arguments.clone()).await);
        assert_eq!(chart["yaogua"], arguments["yaogua"], "{arguments}");
    }
}

#[tokio::test]
async fn test_single_bound_violations_are_rejected() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler = counting_divination(calls.clone());
    handshake(&handler).await;

    let sample = json!([0, 1, 1, 2, 1, 3]);
    let rows = [
        (cast(1899, 9, 19, 15, sample.clone()), "year"),
        (cast(2101, 9, 19, 15, sample.clone()), "year"),
        (cast(2024, 0, 19, 15, sample.clone()), "month"),
        (cast(2024, 13, 19, 15, sample.clone()), "month"),
        (cast(2024, 9, 0, 15, sample.clone()), "day"),
        (cast(2024, 9, 32, 15, sample.clone()), "day"),
        (cast(2024, 9, 19, -1, sample.clone()), "hour"),
        (cast(2024, 9, 19, 15, json!([0, 1, 1, 2, 1, 3, 0])), "yaogua"),
    ];

    for (id, (arguments, path)) in rows.into_iter().enumerate() {
        let resp = call_divination(&handler, id as i64, arguments.clone()).await;
        assert_eq!(resp["error"]["code"], -32602, "{arguments}: {resp}");
        let issues = resp["error"]["data"].as_array().unwrap();
        assert_eq!(issues.len(), 1, "{arguments}: {resp}");
        assert_eq!(issues[0]["path"], path, "{arguments}");
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    // The same schema lets a valid cast through to the handler.
    let resp = call_divination(&handler, 99, cast(2024, 9, 19, 15, sample)).await;
    assert!(resp.get("error").is_none(), "{resp}");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_every_violation_is_reported() {
    let handler = divination_handler();
    handshake(&handler).await;

    let resp = call_divination(&handler, 5, json!({"month": 13, "day": 1, "hour": 0, "yaogua": [0, 1, 4]})).await;
    let paths: Vec<&str> = resp["error"]["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|issue| issue["path"].as_str().unwrap())
        .collect();
    assert!(paths.contains(&"year"), "{paths:?}");
    assert!(paths.contains(&"month"), "{paths:?}");
    assert!(paths.contains(&"yaogua"), "{paths:?}");
    assert!(paths.contains(&"yaogua[2]"), "{paths:?}");
}

#[tokio::test]
async fn test_handler_not_invoked_on_invalid_arguments() {
    let calls = Arc::new(AtomicUsize::new(0));
    let handler = ProtocolHandler::new(Arc::new(counting_registry(calls.clone())));
    handshake(&handler).await;

    let call = |id: i64, arguments: Value| {
        mcp_request(id, "tools/call", json!({ "name": "count", "arguments": arguments }))
    };

    let resp = send_unwrap(&handler, call(1, json!({"n": 11}))).await;
    assert_eq!(resp["error"]["code"], -32602);
    let resp = send_unwrap(&handler, call(2, json!({"n": 3, "label": ""}))).await;
    assert_eq!(resp["error"]["code"], -32602);
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    let resp = send_unwrap(&handler, call(3, json!({"n": 3}))).await;
    let echoed: Value = serde_json::from_str(resp["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
    assert_eq!(echoed, json!({"n": 3, "label": "none"}));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_execution_error_keeps_session_usable() {
    let handler = divination_handler();
    handshake(&handler).await;

    let resp = call_divination(&handler, 1, json!({"year": 2023, "month": 2, "day": 29, "hour": 1})).await;
    assert!(resp.get("error").is_none(), "{resp}");
    assert_eq!(resp["result"]["isError"], true);
    assert!(!resp["result"]["content"][0]["text"].as_str().unwrap().is_empty());

    let resp = call_divination(&handler, 2, json!({"year": 2024, "month": 2, "day": 29, "hour": 1})).await;
    chart_of(&resp);
    assert_eq!(handler.state().await, SessionState::Ready);
}

#[tokio::test]
async fn test_unknown_tool() {
    let handler = divination_handler();
    handshake(&handler).await;

    let resp = send_unwrap(
        &handler,
        mcp_request(7, "tools/call", json!({"name": "nonexistent_tool", "arguments": {}})),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32803);
    assert_eq!(resp["error"]["data"]["tool"], "nonexistent_tool");
}

#[tokio::test]
async fn test_unknown_method() {
    let handler = divination_handler();
    handshake(&handler).await;

    let resp = send_unwrap(&handler, mcp_request(8, "resources/list", json!(null))).await;
    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(resp["id"], 8);
}

#[tokio::test]
async fn test_missing_call_params() {
    let handler = divination_handler();
    handshake(&handler).await;

    let resp = send_unwrap(&handler, mcp_request(9, "tools/call", json!(null))).await;
    assert_eq!(resp["error"]["code"], -32602);
}

// ═══════════════════════════════════════════════════════
// FRAMING
// ═══════════════════════════════════════════════════════

#[test]
fn test_malformed_json() {
    let err = framing::parse_message(r#"{"broken":"#).unwrap_err();
    assert_eq!(err.code(), -32700);
    assert!(framing::parse_message("").is_err());

    let rejection = framing::rejection(&err);
    assert_eq!(rejection["id"], Value::Null);
    assert_eq!(rejection["error"]["code"], -32700);
}

#[test]
fn test_json_that_is_not_a_message() {
    let err = framing::parse_message("[1, 2, 3]").unwrap_err();
    assert_eq!(err.code(), -32600);
}
