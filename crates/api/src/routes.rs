use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers::*, AppState};

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Health and metrics
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
        // MCP over plain HTTP
        .route("/mcp", post(mcp_request))
        // MCP over SSE
        .route("/sse/connect", get(sse_connect))
        .route("/sse/mcp", post(sse_mcp_request))
        .route("/sse/status", get(sse_status))
}

pub fn build_router(state: AppState) -> Router {
    create_router().with_state(state)
}
