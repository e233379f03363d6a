use std::sync::Arc;
use std::time::Duration;

use calc_control::{McpDispatcher, SessionRegistry, ToolObserver, ToolRegistry};
use calc_engine::CalculatorEngine;
use calc_metrics::{MetricsService, TracingService};
use calc_models::{CalcError, Config, ToolOutcome};
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: McpDispatcher,
    pub sessions: SessionRegistry,
    pub metrics: Arc<MetricsService>,
    /// Cancelled when the server begins shutting down; open SSE streams end.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, CalcError> {
        let engine = CalculatorEngine::new(config.calculator.clone(), &config.parser).map_err(
            |e| CalcError::ConfigError {
                reason: e.to_string(),
            },
        )?;
        let tools = Arc::new(ToolRegistry::new(Arc::new(engine)));
        let metrics = Arc::new(MetricsService::new()?);
        let dispatcher = McpDispatcher::new(tools, &config.server).with_observer(
            Arc::new(MetricsObserver {
                metrics: metrics.clone(),
            }),
        );
        let sessions = SessionRegistry::new(config.sse.queue_capacity);

        Ok(Self {
            config: Arc::new(config),
            dispatcher,
            sessions,
            metrics,
            shutdown: CancellationToken::new(),
        })
    }
}

/// Feeds tool-call results into Prometheus and the structured log.
struct MetricsObserver {
    metrics: Arc<MetricsService>,
}

impl ToolObserver for MetricsObserver {
    fn tool_called(&self, tool: &str, outcome: &ToolOutcome, elapsed: Duration) {
        let duration_ms = elapsed.as_secs_f64() * 1000.0;
        self.metrics
            .record_tool_call(tool, outcome.is_error(), duration_ms);
        TracingService::log_tool_call(tool, outcome, duration_ms);
    }
}
