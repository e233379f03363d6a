mod common;

use calc_control::PROTOCOL_VERSION;
use calc_models::{CalcError, JsonRpcRequest};
use serde_json::{json, Value};

#[test]
fn initialize_reports_server_info() {
    let dispatcher = common::dispatcher();
    let request = JsonRpcRequest::new("initialize", Value::Null, json!(1));
    let result = dispatcher.handle(&request).unwrap();
    assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
    assert_eq!(result["serverInfo"]["name"], "calculator-server");
    assert_eq!(result["serverInfo"]["version"], "1.0");
    assert!(result["capabilities"]["tools"].is_object());
}

#[test]
fn ping_returns_empty_object() {
    let dispatcher = common::dispatcher();
    let request = JsonRpcRequest::new("ping", Value::Null, json!("p"));
    assert_eq!(dispatcher.handle(&request), Ok(json!({})));
}

#[test]
fn tools_list_uses_wire_names() {
    let dispatcher = common::dispatcher();
    let request = JsonRpcRequest::new("tools/list", json!({}), json!(1));
    let result = dispatcher.handle(&request).unwrap();
    let tools = result["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 10);
    assert_eq!(tools[0]["name"], "add");
    assert!(tools[0]["inputSchema"]["properties"]["numbers"].is_object());
}

#[test]
fn tools_call_wraps_outcome() {
    let dispatcher = common::dispatcher();
    let request = JsonRpcRequest::new(
        "tools/call",
        json!({"name": "multiply", "arguments": {"numbers": [4, 5]}}),
        json!(3),
    );
    let response = dispatcher.respond(&request);
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({"jsonrpc": "2.0", "result": {"result": 20}, "id": 3})
    );
}

#[test]
fn tools_call_without_arguments_uses_defaults() {
    let dispatcher = common::dispatcher();
    let request = JsonRpcRequest::new("tools/call", json!({"name": "add"}), json!(1));
    let result = dispatcher.handle(&request).unwrap();
    assert!(result["error"]
        .as_str()
        .unwrap()
        .contains("at least 2 numbers"));
}

#[test]
fn protocol_errors() {
    let dispatcher = common::dispatcher();

    let unknown = JsonRpcRequest::new("resources/list", Value::Null, json!(1));
    let response = dispatcher.respond(&unknown);
    let error = response.error.unwrap();
    assert_eq!(error.code, -32601);
    assert_eq!(error.message, "Method not found: resources/list");

    let missing_method = JsonRpcRequest::from_value(json!({"id": 2})).unwrap();
    assert_eq!(
        dispatcher.handle(&missing_method),
        Err(CalcError::MethodNotFound {
            method: "None".into()
        })
    );

    let no_name = JsonRpcRequest::new("tools/call", json!({"arguments": {}}), json!(3));
    let response = dispatcher.respond(&no_name);
    assert_eq!(response.error.unwrap().code, -32602);
    assert_eq!(response.id, json!(3));

    let bad_tool = JsonRpcRequest::new("tools/call", json!({"name": "cube"}), json!(4));
    let error = dispatcher.respond(&bad_tool).error.unwrap();
    assert_eq!(error.code, -32601);
    assert_eq!(error.message, "Tool not found: cube");
}
