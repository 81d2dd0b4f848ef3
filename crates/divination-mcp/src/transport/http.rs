//! Pieces shared by the HTTP transports.

use axum::{response::Json, routing::get, Router};
use tower_http::cors::{Any, CorsLayer};

use crate::types::{McpError, McpResult, SERVER_NAME};

/// Permissive CORS, browsers may connect from any origin.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any)
}

/// Attach `/health` and CORS to a transport router.
pub fn finish_router(router: Router) -> Router {
    router.route("/health", get(handle_health)).layer(cors_layer())
}

/// Health check endpoint.
async fn handle_health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server": SERVER_NAME,
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Bind `addr` and serve `app` until Ctrl-C.
pub async fn serve(addr: &str, app: Router) -> McpResult<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(McpError::Io)?;

    tracing::info!("HTTP transport listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| McpError::Transport(e.to_string()))?;

    tracing::info!("HTTP transport stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Ctrl-C received, shutting down");
}
