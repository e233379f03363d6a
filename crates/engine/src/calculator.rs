use crate::arith;
use crate::parser::ExpressionParser;
use crate::{EvalError, ParserBuildError};
use calc_models::{CalculatorConfig, Number, ParserConfig};
use tracing::{error, info};

pub struct CalculatorEngine {
    config: CalculatorConfig,
    parser: ExpressionParser,
}

fn join(numbers: &[Number], separator: &str) -> String {
    numbers
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(separator)
}

impl CalculatorEngine {
    pub fn new(
        config: CalculatorConfig,
        parser_config: &ParserConfig,
    ) -> Result<Self, ParserBuildError> {
        let parser = ExpressionParser::new(parser_config, config.max_value)?;
        Ok(Self { config, parser })
    }

    pub fn max_value(&self) -> f64 {
        self.config.max_value
    }

    fn validate(&self, numbers: &[Number]) -> Result<(), EvalError> {
        for &value in numbers {
            if value.abs_f64() > self.config.max_value {
                return Err(EvalError::NumberTooLarge {
                    value,
                    max: self.config.max_value,
                });
            }
        }
        Ok(())
    }

    fn check_result(&self, value: Number) -> Result<Number, EvalError> {
        if value.abs_f64() > self.config.max_value {
            return Err(EvalError::ResultTooLarge {
                value,
                max: self.config.max_value,
            });
        }
        Ok(value)
    }

    fn check_running(&self, value: Number, operation: &'static str) -> Result<Number, EvalError> {
        if value.abs_f64() > self.config.max_value {
            return Err(EvalError::RunningResultTooLarge {
                operation,
                max: self.config.max_value,
            });
        }
        Ok(value)
    }

    /// Apply the configured precision to float results.
    fn finish(&self, value: Number) -> Number {
        match value {
            Number::Float(f) => Number::Float(arith::round_to_places(f, self.config.precision)),
            other => other,
        }
    }

    fn logged(
        &self,
        operation: &str,
        result: Result<Number, EvalError>,
        describe: impl FnOnce(Number) -> String,
    ) -> Result<Number, EvalError> {
        match &result {
            Ok(value) => info!("{}: {}", operation, describe(*value)),
            Err(e) => error!("{} error: {}", operation, e),
        }
        result
    }

    pub fn add(&self, numbers: &[Number]) -> Result<Number, EvalError> {
        let result = (|| -> Result<Number, EvalError> {
            if numbers.len() < 2 {
                return Err(EvalError::NotEnoughOperands {
                    operation: "Addition",
                });
            }
            self.validate(numbers)?;
            let sum = numbers[1..].iter().fold(numbers[0], |acc, &n| arith::add(acc, n));
            self.check_result(sum).map(|v| self.finish(v))
        })();
        self.logged("Addition", result, |r| format!("{} = {}", join(numbers, " + "), r))
    }

    pub fn subtract(&self, minuend: Number, subtrahends: &[Number]) -> Result<Number, EvalError> {
        let result = (|| -> Result<Number, EvalError> {
            if subtrahends.is_empty() {
                return Err(EvalError::NotEnoughOperands {
                    operation: "Subtraction",
                });
            }
            self.validate(&[minuend])?;
            self.validate(subtrahends)?;
            let total = subtrahends
                .iter()
                .fold(Number::Int(0), |acc, &n| arith::add(acc, n));
            self.check_result(arith::sub(minuend, total)).map(|v| self.finish(v))
        })();
        self.logged("Subtraction", result, |r| {
            format!("{} - {} = {}", minuend, join(subtrahends, " - "), r)
        })
    }

    pub fn multiply(&self, numbers: &[Number]) -> Result<Number, EvalError> {
        let result = (|| -> Result<Number, EvalError> {
            if numbers.len() < 2 {
                return Err(EvalError::NotEnoughOperands {
                    operation: "Multiplication",
                });
            }
            self.validate(numbers)?;
            let mut product = Number::Int(1);
            for &n in numbers {
                product = self.check_running(arith::mul(product, n), "multiplication")?;
            }
            Ok(self.finish(product))
        })();
        self.logged("Multiplication", result, |r| {
            format!("{} = {}", join(numbers, " × "), r)
        })
    }

    pub fn divide(&self, dividend: Number, divisors: &[Number]) -> Result<Number, EvalError> {
        let result = (|| -> Result<Number, EvalError> {
            if divisors.is_empty() {
                return Err(EvalError::NotEnoughOperands {
                    operation: "Division",
                });
            }
            self.validate(&[dividend])?;
            self.validate(divisors)?;
            if divisors.iter().any(|d| d.is_zero()) {
                return Err(EvalError::DivisionByZero);
            }
            let mut quotient = dividend;
            for &d in divisors {
                quotient = self.check_running(arith::true_div(quotient, d)?, "division")?;
            }
            Ok(self.finish(quotient))
        })();
        self.logged("Division", result, |r| {
            format!("{} ÷ {} = {}", dividend, join(divisors, " ÷ "), r)
        })
    }

    pub fn power(&self, base: Number, exponent: Number) -> Result<Number, EvalError> {
        let result = (|| -> Result<Number, EvalError> {
            self.validate(&[base, exponent])?;
            let value = arith::pow(base, exponent)?;
            self.check_result(value).map(|v| self.finish(v))
        })();
        self.logged("Power", result, |r| format!("{}^{} = {}", base, exponent, r))
    }

    pub fn sqrt(&self, number: Number) -> Result<Number, EvalError> {
        let result = (|| -> Result<Number, EvalError> {
            self.validate(&[number])?;
            arith::sqrt(number).map(|v| self.finish(v))
        })();
        self.logged("Square root", result, |r| format!("√{} = {}", number, r))
    }

    pub fn factorial(&self, number: Number) -> Result<Number, EvalError> {
        let result = (|| -> Result<Number, EvalError> {
            let value = arith::factorial(number)?;
            self.check_result(value)
        })();
        self.logged("Factorial", result, |r| format!("{}! = {}", number, r))
    }

    pub fn modulo(&self, dividend: Number, divisor: Number) -> Result<Number, EvalError> {
        let result = (|| -> Result<Number, EvalError> {
            self.validate(&[dividend, divisor])?;
            if divisor.is_zero() {
                return Err(EvalError::ModuloByZero);
            }
            arith::modulo(dividend, divisor).map(|v| self.finish(v))
        })();
        self.logged("Modulo", result, |r| format!("{} % {} = {}", dividend, divisor, r))
    }

    pub fn absolute(&self, number: Number) -> Result<Number, EvalError> {
        let result = (|| -> Result<Number, EvalError> {
            self.validate(&[number])?;
            Ok(arith::abs(number))
        })();
        self.logged("Absolute", result, |r| format!("|{}| = {}", number, r))
    }

    /// Evaluate a natural-language or symbolic expression.
    pub fn parse_expression(&self, expression: &str) -> Result<Number, EvalError> {
        info!("Parsing expression: {}", expression);
        let result = self
            .parser
            .parse_and_evaluate(expression)
            .map(|v| self.finish(v).normalize_integral())
            .map_err(EvalError::from);
        match &result {
            Ok(value) => info!("Expression result: {} = {}", expression, value),
            Err(e) => error!("Expression parsing error: {}", e),
        }
        result
    }
}
