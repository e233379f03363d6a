use anyhow::Result;
use calc_api::{start_server, AppState};
use calc_models::Config;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::CalcClient;

/// A server running in-process on an ephemeral port.
pub struct TestServer {
    pub base_url: String,
    pub state: AppState,
    handle: JoinHandle<()>,
}

impl TestServer {
    pub fn client(&self) -> CalcClient {
        CalcClient::new(self.base_url.clone())
    }

    /// Cancel the shutdown token and wait for the server task to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.state.shutdown.cancel();
        self.handle.await?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct ConfigOverride {
    pub precision: Option<u32>,
    pub max_value: Option<f64>,
    pub heartbeat_interval_secs: Option<u64>,
    pub queue_capacity: Option<usize>,
    pub server_name: Option<String>,
}

impl ConfigOverride {
    pub fn apply(self, config: &mut Config) {
        if let Some(precision) = self.precision {
            config.calculator.precision = precision;
        }
        if let Some(max_value) = self.max_value {
            config.calculator.max_value = max_value;
        }
        if let Some(secs) = self.heartbeat_interval_secs {
            config.sse.heartbeat_interval_secs = secs;
        }
        if let Some(capacity) = self.queue_capacity {
            config.sse.queue_capacity = capacity;
        }
        if let Some(name) = self.server_name {
            config.server.name = name;
        }
    }
}

pub async fn spawn_server(config_override: Option<ConfigOverride>) -> Result<TestServer> {
    let mut config = Config::default();
    config.server.bind = "127.0.0.1".to_string();
    config.server.port = 0;
    if let Some(config_override) = config_override {
        config_override.apply(&mut config);
    }
    config.validate()?;
    spawn_with_config(config).await
}

pub async fn spawn_with_config(config: Config) -> Result<TestServer> {
    let listener = TcpListener::bind(config.bind_address()).await?;
    let base_url = format!("http://{}", listener.local_addr()?);
    let state = AppState::new(config)?;

    let server_state = state.clone();
    let handle = tokio::spawn(async move {
        if let Err(e) = start_server(server_state, listener).await {
            eprintln!("test server exited with error: {e}");
        }
    });

    Ok(TestServer {
        base_url,
        state,
        handle,
    })
}
