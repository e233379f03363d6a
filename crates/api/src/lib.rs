pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod stream;

pub use handlers::*;
pub use middleware::*;
pub use routes::*;
pub use state::*;

use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

/// The full application: routes plus the server-wide middleware.
pub fn build_app(state: AppState) -> Router {
    let config = state.config.clone();
    apply_middleware(build_router(state), &config.server)
}

/// Serve on `listener` until `state.shutdown` is cancelled, then drain
/// in-flight requests.
pub async fn start_server(
    state: AppState,
    listener: TcpListener,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let shutdown = state.shutdown.clone();
    let app = build_app(state);

    info!("Calculator MCP Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.cancelled().await;
            info!("HTTP server shutting down gracefully");
        })
        .await?;
    Ok(())
}
