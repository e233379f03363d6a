use calc_models::Number;
use thiserror::Error;

/// A failed calculation. The Display text is what callers see in the
/// `{"error": ...}` tool outcome.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("{operation} requires at least 2 numbers")]
    NotEnoughOperands { operation: &'static str },

    #[error("Invalid number type: {type_name}")]
    InvalidNumberType { type_name: String },

    #[error("Number too large: {value} (max: {max})")]
    NumberTooLarge { value: Number, max: f64 },

    #[error("Result too large: {value} (max: {max})")]
    ResultTooLarge { value: Number, max: f64 },

    #[error("Result too large during {operation} (max: {max})")]
    RunningResultTooLarge { operation: &'static str, max: f64 },

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Division by zero in modulo operation")]
    ModuloByZero,

    #[error("Exponent too large (max: {max})")]
    ExponentTooLarge { max: u32 },

    #[error("Mathematical overflow in power calculation")]
    PowerOverflow,

    #[error("Mathematical overflow")]
    Overflow,

    #[error("Result is not a real number")]
    NotReal,

    #[error("math domain error")]
    MathDomain,

    #[error("Cannot calculate square root of negative number")]
    NegativeSquareRoot,

    #[error("Factorial requires a non-negative integer")]
    FactorialDomain,

    #[error("Number too large for factorial calculation (max: {max})")]
    FactorialTooLarge { max: u32 },

    #[error("Could not parse expression: {0}")]
    Expression(Box<ExprError>),
}

/// Why an expression could not be turned into a value.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExprError {
    #[error("Empty expression")]
    Empty,

    #[error("Expression too long: {length} characters (max: {max})")]
    TooLong { length: usize, max: usize },

    #[error("Expression nested too deeply (max depth: {max})")]
    TooDeep { max: usize },

    #[error("Potentially dangerous expression: {expression}")]
    Dangerous { expression: String },

    #[error("Invalid mathematical expression: unexpected character '{ch}' at position {position}")]
    UnexpectedCharacter { ch: char, position: usize },

    #[error("Invalid mathematical expression: unexpected '{token}' at position {position}")]
    UnexpectedToken { token: String, position: usize },

    #[error("Invalid mathematical expression: unexpected end of input")]
    UnexpectedEnd,

    #[error("Invalid mathematical expression: invalid number literal '{literal}'")]
    InvalidNumber { literal: String },

    #[error("Invalid mathematical expression: name '{name}' is not defined")]
    UnknownName { name: String },

    #[error("Invalid mathematical expression: {function}() takes {expected} ({given} given)")]
    Arity {
        function: String,
        expected: &'static str,
        given: usize,
    },

    #[error("{0}")]
    Arithmetic(EvalError),
}

impl From<EvalError> for ExprError {
    fn from(err: EvalError) -> Self {
        ExprError::Arithmetic(err)
    }
}

impl From<ExprError> for EvalError {
    fn from(err: ExprError) -> Self {
        EvalError::Expression(Box::new(err))
    }
}

/// A configured parser pattern that does not compile.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("invalid parser pattern '{pattern}': {reason}")]
pub struct ParserBuildError {
    pub pattern: String,
    pub reason: String,
}
