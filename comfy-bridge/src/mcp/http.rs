//! JSON-RPC over HTTP: one message per `POST /mcp`.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::McpServer;

/// Build the http router.
pub fn router(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(server)
}

/// Bind the configured address and serve until the process exits.
pub async fn run(server: Arc<McpServer>) -> std::io::Result<()> {
    let api = &server.state().config.api;
    let addr = format!("{}:{}", api.host, api.port);
    let app = router(server.clone());

    tracing::info!("Serving MCP over http on {}", addr);
    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await
}

/// POST /mcp - handle one JSON-RPC message.
///
/// Notifications have no response body and get `202 Accepted`.
async fn handle_mcp(State(server): State<Arc<McpServer>>, body: String) -> Response {
    match server.handle_text(&body).await {
        Some(response) => Json(response).into_response(),
        None => StatusCode::ACCEPTED.into_response(),
    }
}

/// GET /health - liveness of the bridge itself, not the engine.
async fn health() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}
