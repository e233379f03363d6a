use calc_models::{CalcError, Config, LoggingConfig, ToolOutcome};
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Crates whose chatter is held to `warn` unless `RUST_LOG` says otherwise.
const NOISY_TARGETS: [&str; 3] = ["hyper", "h2", "tower_http"];

pub struct TracingService;

impl TracingService {
    /// Install the global subscriber. `RUST_LOG`, when set, replaces the
    /// filter built from the configured level.
    pub fn init(config: &LoggingConfig) -> Result<(), CalcError> {
        let filter = Self::filter(config, std::env::var("RUST_LOG").ok().as_deref())?;
        let builder = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_timer(UtcTime::rfc_3339());

        let installed = if config.is_json() {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        installed.map_err(|e| CalcError::ConfigError {
            reason: format!("failed to install tracing subscriber: {e}"),
        })
    }

    /// Filter directives for `config`, or for `rust_log` when it is set and
    /// non-empty.
    pub fn directives(config: &LoggingConfig, rust_log: Option<&str>) -> Result<String, CalcError> {
        if let Some(directives) = rust_log.map(str::trim).filter(|s| !s.is_empty()) {
            return Ok(directives.to_string());
        }
        let level = config
            .normalized_level()
            .ok_or_else(|| CalcError::ConfigError {
                reason: format!("unknown log level '{}'", config.level),
            })?;
        let cap = if level == "error" { "error" } else { "warn" };
        let mut directives = vec![level.to_string()];
        directives.extend(NOISY_TARGETS.iter().map(|target| format!("{target}={cap}")));
        Ok(directives.join(","))
    }

    fn filter(config: &LoggingConfig, rust_log: Option<&str>) -> Result<EnvFilter, CalcError> {
        let directives = Self::directives(config, rust_log)?;
        EnvFilter::try_new(&directives).map_err(|e| CalcError::ConfigError {
            reason: format!("invalid log filter '{directives}': {e}"),
        })
    }

    pub fn log_startup(config: &Config) {
        info!(
            server = %config.server.name,
            version = %config.server.version,
            address = %config.bind_address(),
            precision = config.calculator.precision,
            max_value = config.calculator.max_value,
            sse_heartbeat_secs = config.sse.heartbeat_interval_secs,
            log_level = %config.logging.level,
            log_format = %config.logging.format,
            "Calculator MCP Server starting"
        );
    }

    pub fn log_tool_call(tool: &str, outcome: &ToolOutcome, duration_ms: f64) {
        match outcome {
            ToolOutcome::Result(value) => info!(
                tool = %tool,
                result = %value,
                duration_ms = duration_ms,
                "Tool call completed"
            ),
            ToolOutcome::Error(message) => warn!(
                tool = %tool,
                error_message = %message,
                duration_ms = duration_ms,
                "Tool call returned an error"
            ),
        }
    }

    pub fn log_shutdown(reason: &str) {
        info!(reason = %reason, "Calculator MCP Server shutting down");
    }
}
