use crate::CalcError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Value,
}

impl JsonRpcRequest {
    pub fn new(method: &str, params: Value, id: Value) -> Self {
        Self {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            method: Some(method.to_string()),
            params,
            id,
        }
    }

    /// Decode a request from an already-parsed JSON body. Clients are not
    /// required to send `jsonrpc`; a missing `method` is reported by the
    /// dispatcher, not here.
    pub fn from_value(value: Value) -> Result<Self, CalcError> {
        if !value.is_object() {
            return Err(CalcError::InvalidRequest {
                reason: "request must be a JSON object".to_string(),
            });
        }
        serde_json::from_value(value).map_err(|e| CalcError::InvalidRequest {
            reason: e.to_string(),
        })
    }

    pub fn method_name(&self) -> &str {
        self.method.as_deref().unwrap_or("None")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Value,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: Some(result),
            error: None,
            id,
        }
    }

    pub fn failure(id: Value, error: &CalcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            result: None,
            error: Some(JsonRpcError {
                code: error.rpc_code(),
                message: error.to_string(),
            }),
            id,
        }
    }

    pub fn from_outcome(id: Value, outcome: Result<Value, CalcError>) -> Self {
        match outcome {
            Ok(result) => Self::success(id, result),
            Err(e) => Self::failure(id, &e),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
