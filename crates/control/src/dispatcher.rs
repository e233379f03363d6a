use std::sync::Arc;
use std::time::{Duration, Instant};

use calc_models::{CalcError, JsonRpcRequest, JsonRpcResponse, ServerConfig, ToolOutcome};
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::ToolRegistry;

/// MCP protocol revision reported by `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Receives one notification per completed tool call.
pub trait ToolObserver: Send + Sync {
    fn tool_called(&self, tool: &str, outcome: &ToolOutcome, elapsed: Duration);
}

pub struct NoopObserver;

impl ToolObserver for NoopObserver {
    fn tool_called(&self, _tool: &str, _outcome: &ToolOutcome, _elapsed: Duration) {}
}

/// Routes JSON-RPC requests to the protocol methods. Shared by the plain
/// HTTP endpoint and the SSE transport.
#[derive(Clone)]
pub struct McpDispatcher {
    tools: Arc<ToolRegistry>,
    server_name: String,
    server_version: String,
    observer: Arc<dyn ToolObserver>,
}

impl McpDispatcher {
    pub fn new(tools: Arc<ToolRegistry>, server: &ServerConfig) -> Self {
        Self {
            tools,
            server_name: server.name.clone(),
            server_version: server.version.clone(),
            observer: Arc::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ToolObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Produce the `result` member for `request`, or the error to report.
    #[instrument(skip(self, request), fields(method = %request.method_name()))]
    pub fn handle(&self, request: &JsonRpcRequest) -> Result<Value, CalcError> {
        debug!("MCP request with params: {}", request.params);
        match request.method.as_deref() {
            Some("initialize") => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "serverInfo": {
                    "name": self.server_name,
                    "version": self.server_version,
                },
                "capabilities": {"tools": {}},
            })),
            Some("ping") => Ok(json!({})),
            Some("tools/list") => Ok(json!({ "tools": self.tools.list() })),
            Some("tools/call") => self.call_tool(&request.params),
            _ => Err(CalcError::MethodNotFound {
                method: request.method_name().to_string(),
            }),
        }
    }

    /// Like [`handle`](Self::handle), but always yields a response envelope.
    pub fn respond(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::from_outcome(request.id.clone(), self.handle(request))
    }

    fn call_tool(&self, params: &Value) -> Result<Value, CalcError> {
        static NO_ARGUMENTS: Value = Value::Null;

        if !(params.is_null() || params.is_object()) {
            return Err(CalcError::InvalidParams {
                reason: "params must be an object".to_string(),
            });
        }
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| CalcError::InvalidParams {
                reason: "missing tool name".to_string(),
            })?;
        let arguments = params.get("arguments").unwrap_or(&NO_ARGUMENTS);

        let started = Instant::now();
        let outcome = self.tools.call(name, arguments)?;
        self.observer.tool_called(name, &outcome, started.elapsed());

        serde_json::to_value(&outcome).map_err(|e| CalcError::InternalError {
            reason: e.to_string(),
        })
    }
}
