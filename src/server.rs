//! MCP transports.
//!
//! Two ways to reach the same [`McpBridge`]:
//!
//! | Transport | Entry point | Notes |
//! |-----------|-------------|-------|
//! | stdio | [`run_stdio`] | What MCP hosts spawn. Stdout carries JSON-RPC only. |
//! | Streamable HTTP | [`run_http`] | `POST /mcp` plus `GET /health` |
//!
//! # Host configuration
//!
//! ```json
//! {
//!   "mcpServers": {
//!     "confluence": {
//!       "command": "confluence-mcp",
//!       "args": ["serve", "stdio"],
//!       "env": {
//!         "CONFLUENCE_HOSTING": "cloud",
//!         "CONFLUENCE_BASE_URL": "https://acme.atlassian.net",
//!         "CONFLUENCE_EMAIL": "me@acme.com",
//!         "CONFLUENCE_API_TOKEN": "..."
//!       }
//!     }
//!   }
//! }
//! ```

use axum::{routing::get, Json, Router};
use rmcp::transport::streamable_http_server::{
    session::local::LocalSessionManager, StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::ServiceExt;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};

use crate::mcp::McpBridge;

/// Serves MCP over stdin/stdout until the client disconnects.
pub async fn run_stdio(bridge: McpBridge) -> anyhow::Result<()> {
    tracing::info!("MCP server listening on stdio");
    let service = bridge.serve(rmcp::transport::stdio()).await?;
    let reason = service.waiting().await?;
    tracing::info!(?reason, "MCP stdio session ended");
    Ok(())
}

/// Serves MCP over Streamable HTTP at `bind` until the process is stopped.
pub async fn run_http(bridge: McpBridge, bind: &str) -> anyhow::Result<()> {
    let app = router(bridge);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    tracing::info!(addr = %listener.local_addr()?, "MCP server listening on http://{}/mcp", bind);
    axum::serve(listener, app).await?;

    Ok(())
}

/// The HTTP app: `/mcp` for MCP sessions, `/health` for liveness checks.
pub fn router(bridge: McpBridge) -> Router {
    let mcp_service = StreamableHttpService::new(
        move || Ok(bridge.clone()),
        LocalSessionManager::default().into(),
        StreamableHttpServerConfig::default(),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .nest_service("/mcp", mcp_service)
        .layer(cors)
}

/// JSON response body for `GET /health`.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
