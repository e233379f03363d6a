//! Calculation core: integer-preserving arithmetic, the engine behind the
//! calculator tools, and the natural-language expression parser.

pub mod arith;
mod calculator;
mod error;
pub mod parser;

pub use calculator::CalculatorEngine;
pub use error::{EvalError, ExprError, ParserBuildError};
pub use parser::ExpressionParser;
