use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use calc_control::SseStatus;
use calc_models::{CalcError, ErrorBody, HealthReport, JsonRpcRequest, JsonRpcResponse};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

use crate::{stream::session_events, AppState};

/// Header carrying the SSE client id on `POST /sse/mcp`.
pub const CLIENT_ID_HEADER: &str = "x-client-id";

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

fn status_of(e: &CalcError) -> StatusCode {
    StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

fn error_response(e: &CalcError) -> (StatusCode, Json<ErrorBody>) {
    (status_of(e), Json(e.to_error_body()))
}

fn rpc_error_response(id: Value, e: &CalcError) -> Response {
    (status_of(e), Json(JsonRpcResponse::failure(id, e))).into_response()
}

/// A JSON object body, or `None` for anything else (malformed JSON, arrays,
/// scalars and the empty object).
fn json_object(body: &[u8]) -> Option<Value> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) if !map.is_empty() => Some(Value::Object(map)),
        _ => None,
    }
}

#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthReport> {
    Json(HealthReport::healthy(
        &state.config.server.name,
        &state.config.server.version,
    ))
}

#[instrument(skip(state))]
pub async fn metrics(State(state): State<AppState>) -> Result<Response, (StatusCode, Json<ErrorBody>)> {
    state.metrics.set_sse_connections(state.sessions.len());
    match state.metrics.render() {
        Ok(text) => Ok(([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], text).into_response()),
        Err(e) => {
            error!("Failed to render metrics: {}", e);
            Err(error_response(&e))
        }
    }
}

#[instrument(skip(state, body))]
pub async fn mcp_request(State(state): State<AppState>, body: Bytes) -> Response {
    let Some(value) = json_object(&body) else {
        warn!("Rejected MCP request with unparseable body");
        return rpc_error_response(Value::Null, &CalcError::ParseError);
    };
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request = match JsonRpcRequest::from_value(value) {
        Ok(request) => request,
        Err(e) => return rpc_error_response(id, &e),
    };

    state
        .metrics
        .record_request("http", request.method_name());

    match state.dispatcher.handle(&request) {
        Ok(result) => Json(JsonRpcResponse::success(request.id, result)).into_response(),
        Err(e) => {
            warn!("MCP request failed: {}", e);
            rpc_error_response(request.id, &e)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub client_id: Option<String>,
}

#[instrument(skip(state))]
pub async fn sse_connect(
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
) -> impl IntoResponse {
    let (guard, receiver) = state.sessions.register(params.client_id);
    info!("SSE connection request from client {}", guard.client_id());
    state.metrics.set_sse_connections(state.sessions.len());

    let heartbeat = Duration::from_secs(state.config.sse.heartbeat_interval_secs);
    let events = session_events(guard, receiver, heartbeat, state.shutdown.clone());
    (
        [(
            HeaderName::from_static("x-accel-buffering"),
            HeaderValue::from_static("no"),
        )],
        events,
    )
}

fn client_id(headers: &HeaderMap, body: &Value) -> Option<String> {
    headers
        .get(CLIENT_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .or_else(|| {
            body.get("client_id")
                .and_then(Value::as_str)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        })
}

#[instrument(skip(state, headers, body))]
pub async fn sse_mcp_request(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Value>), (StatusCode, Json<ErrorBody>)> {
    let value = json_object(&body).ok_or_else(|| error_response(&CalcError::InvalidJson))?;
    let client_id =
        client_id(&headers, &value).ok_or_else(|| error_response(&CalcError::ClientIdRequired))?;
    let request = JsonRpcRequest::from_value(value).map_err(|e| error_response(&e))?;

    if !state.sessions.is_connected(&client_id) {
        return Err(error_response(&CalcError::ClientNotConnected { client_id }));
    }

    state.metrics.record_request("sse", request.method_name());
    let response = state.dispatcher.respond(&request);

    match state.sessions.deliver(&client_id, response) {
        Ok(()) => {
            state.metrics.record_sse_message();
            Ok((
                StatusCode::ACCEPTED,
                Json(json!({"status": "queued", "request_id": request.id})),
            ))
        }
        Err(e) => {
            warn!("Could not queue response for client {}: {}", client_id, e);
            Err(error_response(&e))
        }
    }
}

#[instrument(skip(state))]
pub async fn sse_status(State(state): State<AppState>) -> Json<SseStatus> {
    Json(state.sessions.status())
}
