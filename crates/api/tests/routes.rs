use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use calc_api::{build_app, AppState};
use calc_models::Config;
use serde_json::{json, Value};
use tower::util::ServiceExt;

fn create_test_app() -> Router {
    build_app(AppState::new(Config::default()).unwrap())
}

async fn body_json(res: axum::response::Response) -> Value {
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn health_endpoint_works() {
    let res = create_test_app()
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let body = body_json(res).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["server"], "calculator-server");
    assert_eq!(body["version"], "1.0");
    assert!(body["timestamp"].as_f64().unwrap() > 0.0);
    assert_eq!(
        body["services"],
        json!({"calculator_engine": true, "mcp_protocol": true, "sse_transport": true})
    );
}

#[tokio::test]
async fn metrics_endpoint_works() {
    let app = create_test_app();
    let call = json!({
        "jsonrpc": "2.0",
        "method": "tools/call",
        "params": {"name": "add", "arguments": {"numbers": [1, 2]}},
        "id": 1
    });
    app.clone()
        .oneshot(post_json("/mcp", &call.to_string()))
        .await
        .unwrap();

    let res = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains(r#"calc_tool_calls_total{tool="add"} 1"#));
    assert!(text.contains("calc_sse_connections_active 0"));
}

#[tokio::test]
async fn tools_list_over_http() {
    let res = create_test_app()
        .oneshot(post_json(
            "/mcp",
            r#"{"jsonrpc":"2.0","method":"tools/list","id":1}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body = body_json(res).await;
    assert_eq!(body["id"], 1);
    assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn tools_call_over_http() {
    let res = create_test_app()
        .oneshot(post_json(
            "/mcp",
            r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"divide","arguments":{"dividend":10,"divisors":[0]}},"id":"x"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        body_json(res).await,
        json!({"jsonrpc": "2.0", "result": {"error": "Division by zero"}, "id": "x"})
    );
}

#[tokio::test]
async fn unknown_tool_is_404() {
    let res = create_test_app()
        .oneshot(post_json(
            "/mcp",
            r#"{"jsonrpc":"2.0","method":"tools/call","params":{"name":"cube"},"id":5}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], -32601);
    assert_eq!(body["error"]["message"], "Tool not found: cube");
    assert_eq!(body["id"], 5);
}

#[tokio::test]
async fn unknown_method_is_404() {
    let res = create_test_app()
        .oneshot(post_json(
            "/mcp",
            r#"{"jsonrpc":"2.0","method":"resources/list","id":2}"#,
        ))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    let body = body_json(res).await;
    assert_eq!(body["error"]["message"], "Method not found: resources/list");
}

#[tokio::test]
async fn unparseable_bodies_are_parse_errors() {
    for body in ["not json", "{}", "[1,2]", ""] {
        let res = create_test_app()
            .oneshot(post_json("/mcp", body))
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST, "body {body:?}");
        let json = body_json(res).await;
        assert_eq!(json["error"]["code"], -32700);
        assert_eq!(json["error"]["message"], "Parse error");
        assert_eq!(json["id"], Value::Null);
    }
}

#[tokio::test]
async fn mistyped_request_is_invalid() {
    let res = create_test_app()
        .oneshot(post_json("/mcp", r#"{"method": 42, "id": 9}"#))
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body = body_json(res).await;
    assert_eq!(body["error"]["code"], -32600);
    assert_eq!(body["id"], 9);
}

#[tokio::test]
async fn cors_is_permissive() {
    let res = create_test_app()
        .oneshot(
            Request::get("/health")
                .header(header::ORIGIN, "http://example.com")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
