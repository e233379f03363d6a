mod common;

use calc_models::{CalcError, Number, ToolOutcome};
use serde_json::json;

fn result(value: i64) -> ToolOutcome {
    ToolOutcome::Result(Number::Int(value))
}

fn error_text(outcome: ToolOutcome) -> String {
    match outcome {
        ToolOutcome::Error(message) => message,
        other => panic!("expected an error outcome, got {other:?}"),
    }
}

#[test]
fn lists_ten_tools_in_order() {
    let tools = common::registry();
    let names: Vec<&str> = tools.list().iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "add",
            "subtract",
            "multiply",
            "divide",
            "power",
            "sqrt",
            "factorial",
            "modulo",
            "absolute",
            "parse_expression"
        ]
    );
    for tool in tools.list() {
        assert_eq!(tool.input_schema["type"], "object");
        assert!(!tool.description.is_empty());
    }
}

#[test]
fn calls_each_tool() {
    let tools = common::registry();
    let cases = [
        ("add", json!({"numbers": [5, 3]}), result(8)),
        ("subtract", json!({"minuend": 100, "subtrahends": [10, 5, 2]}), result(83)),
        ("multiply", json!({"numbers": [2, 3, 4]}), result(24)),
        (
            "divide",
            json!({"dividend": 7, "divisors": [2]}),
            ToolOutcome::Result(Number::Float(3.5)),
        ),
        ("power", json!({"base": 2, "exponent": 3}), result(8)),
        ("sqrt", json!({"number": 25}), ToolOutcome::Result(Number::Float(5.0))),
        ("factorial", json!({"number": 5}), result(120)),
        ("modulo", json!({"dividend": -7, "divisor": 5}), result(3)),
        ("absolute", json!({"number": -5}), result(5)),
        ("parse_expression", json!({"expression": "five plus three"}), result(8)),
    ];
    for (name, arguments, expected) in cases {
        assert_eq!(tools.call(name, &arguments), Ok(expected), "tool {name}");
    }
}

#[test]
fn unknown_tool_is_an_error() {
    let tools = common::registry();
    assert_eq!(
        tools.call("cube", &json!({})),
        Err(CalcError::ToolNotFound {
            name: "cube".into()
        })
    );
}

#[test]
fn calculation_failures_are_outcomes() {
    let tools = common::registry();
    let outcome = tools
        .call("divide", &json!({"dividend": 10, "divisors": [0]}))
        .unwrap();
    assert_eq!(error_text(outcome), "Division by zero");

    let outcome = tools.call("add", &json!({"numbers": [1]})).unwrap();
    assert!(error_text(outcome).contains("at least 2 numbers"));
}

#[test]
fn argument_problems_are_outcomes() {
    let tools = common::registry();

    let outcome = tools.call("sqrt", &json!({})).unwrap();
    assert_eq!(error_text(outcome), "Invalid number type: null");

    let outcome = tools.call("add", &json!({"numbers": ["x", 5]})).unwrap();
    assert_eq!(error_text(outcome), "Invalid number type: string");

    let outcome = tools.call("add", &json!({})).unwrap();
    assert!(error_text(outcome).contains("at least 2 numbers"));

    let outcome = tools.call("parse_expression", &json!({})).unwrap();
    assert!(error_text(outcome).starts_with("Could not parse expression"));
}
