use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Body returned by the plain (non JSON-RPC) endpoints on failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalcError {
    #[error("Parse error")]
    ParseError,

    #[error("Invalid JSON data")]
    InvalidJson,

    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("Invalid params: {reason}")]
    InvalidParams { reason: String },

    #[error("Method not found: {method}")]
    MethodNotFound { method: String },

    #[error("Tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("Client ID required")]
    ClientIdRequired,

    #[error("Client not connected")]
    ClientNotConnected { client_id: String },

    #[error("Client queue full")]
    SessionQueueFull { client_id: String },

    #[error("Internal error: {reason}")]
    InternalError { reason: String },

    #[error("Configuration error: {reason}")]
    ConfigError { reason: String },
}

impl CalcError {
    pub fn to_error_body(&self) -> ErrorBody {
        ErrorBody {
            error: self.to_string(),
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            CalcError::ParseError => 400,
            CalcError::InvalidJson => 400,
            CalcError::InvalidRequest { .. } => 400,
            CalcError::InvalidParams { .. } => 400,
            CalcError::MethodNotFound { .. } => 404,
            CalcError::ToolNotFound { .. } => 404,
            CalcError::ClientIdRequired => 400,
            CalcError::ClientNotConnected { .. } => 404,
            CalcError::SessionQueueFull { .. } => 503,
            CalcError::InternalError { .. } => 500,
            CalcError::ConfigError { .. } => 500,
        }
    }

    /// JSON-RPC 2.0 error code for this error.
    pub fn rpc_code(&self) -> i32 {
        match self {
            CalcError::ParseError => -32700,
            CalcError::InvalidJson => -32700,
            CalcError::InvalidRequest { .. } => -32600,
            CalcError::MethodNotFound { .. } => -32601,
            CalcError::ToolNotFound { .. } => -32601,
            CalcError::InvalidParams { .. } => -32602,
            CalcError::ClientIdRequired => -32600,
            CalcError::ClientNotConnected { .. } => -32603,
            CalcError::SessionQueueFull { .. } => -32603,
            CalcError::InternalError { .. } => -32603,
            CalcError::ConfigError { .. } => -32603,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_errors_share_the_method_not_found_code() {
        let tool = CalcError::ToolNotFound {
            name: "cube".into(),
        };
        let method = CalcError::MethodNotFound {
            method: "resources/list".into(),
        };
        assert_eq!(tool.rpc_code(), -32601);
        assert_eq!(method.rpc_code(), -32601);
        assert_eq!(tool.http_status(), 404);
        assert_eq!(tool.to_string(), "Tool not found: cube");
    }

    #[test]
    fn session_errors_keep_legacy_messages() {
        let err = CalcError::ClientNotConnected {
            client_id: "abc".into(),
        };
        assert_eq!(err.to_error_body().error, "Client not connected");
        assert_eq!(CalcError::ClientIdRequired.http_status(), 400);
        assert_eq!(
            CalcError::SessionQueueFull {
                client_id: "abc".into()
            }
            .http_status(),
            503
        );
    }
}
