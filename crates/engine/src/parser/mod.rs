//! Natural-language expression parser.
//!
//! Input goes through four stages: [`Rewriter::normalize`] and
//! [`Rewriter::convert`] turn words into symbols, the security guard rejects
//! anything matching a dangerous pattern, and the evaluator computes the
//! value. Nothing is ever executed beyond the whitelisted functions.

mod eval;
mod lexer;
mod rewrite;

use crate::{EvalError, ExprError, ParserBuildError};
use calc_models::{Number, ParserConfig};
use eval::Evaluator;
use regex::{Regex, RegexBuilder};
use rewrite::Rewriter;
use tracing::debug;

pub struct ExpressionParser {
    rewriter: Rewriter,
    dangerous: Vec<Regex>,
    max_length: usize,
    max_depth: usize,
    max_value: f64,
}

impl ExpressionParser {
    pub fn new(config: &ParserConfig, max_value: f64) -> Result<Self, ParserBuildError> {
        let dangerous = config
            .security
            .dangerous_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ParserBuildError {
                        pattern: pattern.clone(),
                        reason: e.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!(
            "Parser initialized with {} word-to-number mappings and {} operation words",
            config.word_to_number.len(),
            config.operation_words.len()
        );

        Ok(Self {
            rewriter: Rewriter::new(config)?,
            dangerous,
            max_length: config.security.max_length,
            max_depth: config.security.max_depth,
            max_value,
        })
    }

    /// Rewrite `expression` into symbolic form without evaluating it.
    pub fn to_math_expression(&self, expression: &str) -> Result<String, ExprError> {
        let length = expression.chars().count();
        if length > self.max_length {
            return Err(ExprError::TooLong {
                length,
                max: self.max_length,
            });
        }

        let normalized = self.rewriter.normalize(expression);
        debug!("Normalized: {}", normalized);
        let math = self.rewriter.convert(&normalized);
        debug!("Math expression: {}", math);

        if math.is_empty() {
            return Err(ExprError::Empty);
        }
        if self.dangerous.iter().any(|re| re.is_match(&math)) {
            return Err(ExprError::Dangerous { expression: math });
        }
        Ok(math)
    }

    /// Evaluate `expression`. Float results are returned unrounded; the
    /// magnitude limit is enforced on the final value only.
    pub fn parse_and_evaluate(&self, expression: &str) -> Result<Number, ExprError> {
        let math = self.to_math_expression(expression)?;
        let tokens = lexer::tokenize(&math)?;
        let value = Evaluator::new(&tokens, self.max_depth).evaluate()?;

        if !value.as_f64().is_finite() {
            return Err(EvalError::Overflow.into());
        }
        if value.abs_f64() > self.max_value {
            return Err(EvalError::ResultTooLarge {
                value,
                max: self.max_value,
            }
            .into());
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> ExpressionParser {
        ExpressionParser::new(&ParserConfig::default(), 1e15).unwrap()
    }

    #[test]
    fn rejects_dangerous_input_before_evaluation() {
        let p = parser();
        for expression in ["__import__('os')", "exec(1)", "EVAL(2)", "os.system", "1; 2"] {
            assert!(
                matches!(
                    p.parse_and_evaluate(expression),
                    Err(ExprError::Dangerous { .. })
                ),
                "{expression}"
            );
        }
    }

    #[test]
    fn length_limit() {
        let p = parser();
        let long = "1+".repeat(600) + "1";
        assert!(matches!(
            p.parse_and_evaluate(&long),
            Err(ExprError::TooLong { max: 1000, .. })
        ));
    }

    #[test]
    fn invalid_pattern_is_reported() {
        let mut config = ParserConfig::default();
        config.security.dangerous_patterns.push("(".to_string());
        let err = ExpressionParser::new(&config, 1e15).err().unwrap();
        assert_eq!(err.pattern, "(");
    }

    #[test]
    fn result_limit() {
        let p = parser();
        assert!(matches!(
            p.parse_and_evaluate("999999999999999 * 999999999999999"),
            Err(ExprError::Arithmetic(EvalError::ResultTooLarge { .. }))
        ));
    }
}
