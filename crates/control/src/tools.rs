use std::sync::Arc;

use calc_engine::{CalculatorEngine, EvalError};
use calc_models::{json_type_name, CalcError, Number, ToolDefinition, ToolOutcome};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// The calculator tools, in the order they are advertised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
    Sqrt,
    Factorial,
    Modulo,
    Absolute,
    ParseExpression,
}

impl Tool {
    pub const ALL: [Tool; 10] = [
        Tool::Add,
        Tool::Subtract,
        Tool::Multiply,
        Tool::Divide,
        Tool::Power,
        Tool::Sqrt,
        Tool::Factorial,
        Tool::Modulo,
        Tool::Absolute,
        Tool::ParseExpression,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::Add => "add",
            Tool::Subtract => "subtract",
            Tool::Multiply => "multiply",
            Tool::Divide => "divide",
            Tool::Power => "power",
            Tool::Sqrt => "sqrt",
            Tool::Factorial => "factorial",
            Tool::Modulo => "modulo",
            Tool::Absolute => "absolute",
            Tool::ParseExpression => "parse_expression",
        }
    }

    pub fn from_name(name: &str) -> Option<Tool> {
        Tool::ALL.into_iter().find(|tool| tool.name() == name)
    }

    fn description(self) -> &'static str {
        match self {
            Tool::Add => "Add multiple numbers together. Can handle 2 or more numbers.",
            Tool::Subtract => "Subtract numbers. First number minus all subsequent numbers.",
            Tool::Multiply => "Multiply multiple numbers together. Can handle 2 or more numbers.",
            Tool::Divide => "Divide numbers. First number divided by all subsequent numbers.",
            Tool::Power => "Calculate exponentiation (base raised to the power of exponent).",
            Tool::Sqrt => "Calculate square root of a number.",
            Tool::Factorial => "Calculate factorial of a number (n!).",
            Tool::Modulo => "Calculate modulo (remainder of division).",
            Tool::Absolute => "Calculate absolute value of a number.",
            Tool::ParseExpression => {
                "Parse and evaluate complex mathematical expressions from natural language. \
                 Handles multi-number operations, mixed symbols/words, and complex expressions."
            }
        }
    }

    fn input_schema(self) -> Value {
        fn number(description: &str) -> Value {
            json!({"type": "number", "description": description})
        }
        fn numbers(description: &str) -> Value {
            json!({"type": "array", "items": {"type": "number"}, "description": description})
        }
        fn object(properties: Value, required: &[&str]) -> Value {
            json!({"type": "object", "properties": properties, "required": required})
        }

        match self {
            Tool::Add => object(
                json!({"numbers": numbers("List of numbers to add")}),
                &["numbers"],
            ),
            Tool::Subtract => object(
                json!({
                    "minuend": number("The number to subtract from"),
                    "subtrahends": numbers("List of numbers to subtract"),
                }),
                &["minuend", "subtrahends"],
            ),
            Tool::Multiply => object(
                json!({"numbers": numbers("List of numbers to multiply")}),
                &["numbers"],
            ),
            Tool::Divide => object(
                json!({
                    "dividend": number("The number to be divided"),
                    "divisors": numbers("List of numbers to divide by"),
                }),
                &["dividend", "divisors"],
            ),
            Tool::Power => object(
                json!({
                    "base": number("The base number"),
                    "exponent": number("The exponent"),
                }),
                &["base", "exponent"],
            ),
            Tool::Sqrt => object(
                json!({"number": number("The number to find square root of")}),
                &["number"],
            ),
            Tool::Factorial => object(
                json!({"number": {
                    "type": "integer",
                    "description": "The number to calculate factorial of (must be non-negative integer)",
                }}),
                &["number"],
            ),
            Tool::Modulo => object(
                json!({
                    "dividend": number("The number to be divided"),
                    "divisor": number("The number to divide by"),
                }),
                &["dividend", "divisor"],
            ),
            Tool::Absolute => object(
                json!({"number": number("The number to find absolute value of")}),
                &["number"],
            ),
            Tool::ParseExpression => object(
                json!({"expression": {
                    "type": "string",
                    "description": "Natural language mathematical expression",
                }}),
                &["expression"],
            ),
        }
    }

    pub fn definition(self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// Typed view over a `tools/call` arguments object.
struct Arguments<'a> {
    map: Option<&'a Map<String, Value>>,
}

impl<'a> Arguments<'a> {
    fn new(value: &'a Value) -> Result<Self, String> {
        match value {
            Value::Null => Ok(Self { map: None }),
            Value::Object(map) => Ok(Self { map: Some(map) }),
            other => Err(format!(
                "Invalid arguments: expected an object, got {}",
                json_type_name(other)
            )),
        }
    }

    fn get(&self, key: &str) -> &'a Value {
        static MISSING: Value = Value::Null;
        self.map.and_then(|m| m.get(key)).unwrap_or(&MISSING)
    }

    /// A required scalar; absence reads as `null` and is rejected as such.
    fn number(&self, key: &str) -> Result<Number, String> {
        Number::try_from(self.get(key)).map_err(invalid_type)
    }

    /// An array of numbers; absence reads as an empty list.
    fn numbers(&self, key: &str) -> Result<Vec<Number>, String> {
        match self.get(key) {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => items
                .iter()
                .map(|item| Number::try_from(item).map_err(invalid_type))
                .collect(),
            other => Err(format!(
                "{key} must be an array of numbers, got {}",
                json_type_name(other)
            )),
        }
    }

    fn text(&self, key: &str) -> Result<&'a str, String> {
        match self.get(key) {
            Value::Null => Ok(""),
            Value::String(s) => Ok(s.as_str()),
            other => Err(format!("{key} must be a string, got {}", json_type_name(other))),
        }
    }
}

fn invalid_type(type_name: &str) -> String {
    EvalError::InvalidNumberType {
        type_name: type_name.to_string(),
    }
    .to_string()
}

/// Holds the calculator engine and maps tool calls onto it.
pub struct ToolRegistry {
    engine: Arc<CalculatorEngine>,
    definitions: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new(engine: Arc<CalculatorEngine>) -> Self {
        Self {
            engine,
            definitions: Tool::ALL.into_iter().map(Tool::definition).collect(),
        }
    }

    pub fn list(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Run a tool. Only an unknown tool name is an `Err`; bad arguments and
    /// failed calculations come back as [`ToolOutcome::Error`].
    pub fn call(&self, name: &str, arguments: &Value) -> Result<ToolOutcome, CalcError> {
        let tool = Tool::from_name(name).ok_or_else(|| CalcError::ToolNotFound {
            name: name.to_string(),
        })?;
        debug!("Calling tool {} with arguments {}", name, arguments);

        let outcome = match self.dispatch(tool, arguments) {
            Ok(value) => ToolOutcome::Result(value),
            Err(message) => {
                warn!("Tool {} failed: {}", name, message);
                ToolOutcome::Error(message)
            }
        };
        Ok(outcome)
    }

    fn dispatch(&self, tool: Tool, arguments: &Value) -> Result<Number, String> {
        let args = Arguments::new(arguments)?;
        let engine = &self.engine;
        let result = match tool {
            Tool::Add => engine.add(&args.numbers("numbers")?),
            Tool::Subtract => {
                let minuend = args.number("minuend")?;
                engine.subtract(minuend, &args.numbers("subtrahends")?)
            }
            Tool::Multiply => engine.multiply(&args.numbers("numbers")?),
            Tool::Divide => {
                let dividend = args.number("dividend")?;
                engine.divide(dividend, &args.numbers("divisors")?)
            }
            Tool::Power => engine.power(args.number("base")?, args.number("exponent")?),
            Tool::Sqrt => engine.sqrt(args.number("number")?),
            Tool::Factorial => engine.factorial(args.number("number")?),
            Tool::Modulo => engine.modulo(args.number("dividend")?, args.number("divisor")?),
            Tool::Absolute => engine.absolute(args.number("number")?),
            Tool::ParseExpression => engine.parse_expression(args.text("expression")?),
        };
        result.map_err(|e| e.to_string())
    }
}
