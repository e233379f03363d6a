//! Server bootstrap for the Calculator MCP Server: binding, signal handling,
//! graceful shutdown and the container health probe.

use anyhow::{bail, Context, Result};
use calc_api::{start_server, AppState};
use calc_metrics::TracingService;
use calc_models::{Config, HealthReport};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Bind, serve until SIGINT/SIGTERM, then give in-flight requests
/// `shutdown_grace_secs` to finish.
pub async fn run(config: Config) -> Result<()> {
    let grace = Duration::from_secs(config.server.shutdown_grace_secs);
    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    let state = AppState::new(config)?;
    let shutdown = state.shutdown.clone();

    let server = tokio::spawn(async move {
        if let Err(e) = start_server(state, listener).await {
            error!("HTTP server error: {}", e);
        }
    });

    let reason = shutdown_signal(shutdown.clone()).await;
    TracingService::log_shutdown(reason);
    shutdown.cancel();

    match tokio::time::timeout(grace, server).await {
        Ok(Ok(())) => info!("Calculator MCP Server shutdown complete"),
        Ok(Err(e)) => error!("Server task failed: {}", e),
        Err(_) => warn!("In-flight requests still running after {:?}, exiting", grace),
    }
    Ok(())
}

/// Resolves with the name of the signal that arrived, or when `shutdown`
/// is cancelled from elsewhere.
pub async fn shutdown_signal(shutdown: CancellationToken) -> &'static str {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Unable to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Unable to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
        _ = shutdown.cancelled() => "cancelled",
    }
}

/// Probe `url` (the `/health` endpoint). Healthy means HTTP 200 with
/// `status: "healthy"`.
pub async fn healthcheck(url: &str, timeout: Duration) -> Result<HealthReport> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("health probe to {url} failed"))?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        bail!("health probe returned HTTP {status}");
    }
    let report: HealthReport = response.json().await?;
    if !report.is_healthy() {
        bail!("server reported status {:?}", report.status);
    }
    Ok(report)
}

/// `http://127.0.0.1:<port>/health`, the probe target inside a container
/// where the server may be bound to `0.0.0.0`.
pub fn local_health_url(config: &Config) -> String {
    format!("http://127.0.0.1:{}/health", config.server.port)
}
