use calc_models::CalcError;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use tracing::{debug, instrument};

fn internal(e: prometheus::Error) -> CalcError {
    CalcError::InternalError {
        reason: e.to_string(),
    }
}

/// Prometheus collectors for the server, kept in a private registry so that
/// several instances (one per test server) never collide.
pub struct MetricsService {
    registry: Registry,
    requests_total: IntCounterVec,
    tool_calls_total: IntCounterVec,
    tool_errors_total: IntCounterVec,
    tool_duration_ms: Histogram,
    sse_connections_active: IntGauge,
    sse_messages_total: IntCounter,
}

impl MetricsService {
    pub fn new() -> Result<Self, CalcError> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            Opts::new("calc_mcp_requests_total", "Total number of MCP requests"),
            &["transport", "method"],
        )
        .map_err(internal)?;

        let tool_calls_total = IntCounterVec::new(
            Opts::new("calc_tool_calls_total", "Total number of tool calls"),
            &["tool"],
        )
        .map_err(internal)?;

        let tool_errors_total = IntCounterVec::new(
            Opts::new(
                "calc_tool_errors_total",
                "Total number of tool calls that returned an error",
            ),
            &["tool"],
        )
        .map_err(internal)?;

        let tool_duration_ms = Histogram::with_opts(
            HistogramOpts::new("calc_tool_duration_ms", "Tool execution duration in milliseconds")
                .buckets(vec![0.05, 0.1, 0.5, 1.0, 5.0, 10.0, 50.0, 100.0, 500.0]),
        )
        .map_err(internal)?;

        let sse_connections_active = IntGauge::new(
            "calc_sse_connections_active",
            "Number of connected SSE clients",
        )
        .map_err(internal)?;

        let sse_messages_total = IntCounter::new(
            "calc_sse_messages_total",
            "Total number of responses queued to SSE clients",
        )
        .map_err(internal)?;

        registry
            .register(Box::new(requests_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(tool_calls_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(tool_errors_total.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(tool_duration_ms.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(sse_connections_active.clone()))
            .map_err(internal)?;
        registry
            .register(Box::new(sse_messages_total.clone()))
            .map_err(internal)?;

        Ok(Self {
            registry,
            requests_total,
            tool_calls_total,
            tool_errors_total,
            tool_duration_ms,
            sse_connections_active,
            sse_messages_total,
        })
    }

    pub fn record_request(&self, transport: &str, method: &str) {
        self.requests_total
            .with_label_values(&[transport, method])
            .inc();
    }

    #[instrument(skip(self))]
    pub fn record_tool_call(&self, tool: &str, failed: bool, duration_ms: f64) {
        self.tool_calls_total.with_label_values(&[tool]).inc();
        if failed {
            self.tool_errors_total.with_label_values(&[tool]).inc();
        }
        self.tool_duration_ms.observe(duration_ms);
        debug!("Recorded tool call");
    }

    pub fn set_sse_connections(&self, active: usize) {
        self.sse_connections_active.set(active as i64);
    }

    pub fn record_sse_message(&self) {
        self.sse_messages_total.inc();
    }

    /// Text exposition of every collector.
    pub fn render(&self) -> Result<String, CalcError> {
        let metric_families = self.registry.gather();
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(internal)?;

        String::from_utf8(buffer).map_err(|e| CalcError::InternalError {
            reason: e.to_string(),
        })
    }
}
