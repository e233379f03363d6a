//! Recursive-descent evaluation over the token stream.
//!
//! Grammar, loosest binding first:
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := factor (('*' | '/' | '//' | '%') factor)*
//! factor  := ('-' | '+') factor | power
//! power   := primary ('**' factor)?
//! primary := NUMBER | NAME | NAME '(' args ')' | '(' expr ')'
//! ```

use super::lexer::{Spanned, Token};
use crate::arith;
use crate::{EvalError, ExprError};
use calc_models::{fits_i64, Number};
use std::f64::consts;

pub(crate) struct Evaluator<'a> {
    tokens: &'a [Spanned],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Evaluator<'a> {
    pub(crate) fn new(tokens: &'a [Spanned], max_depth: usize) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    /// Evaluate the whole stream; trailing tokens are an error.
    pub(crate) fn evaluate(mut self) -> Result<Number, ExprError> {
        if self.tokens.is_empty() {
            return Err(ExprError::Empty);
        }
        let value = self.expr()?;
        match self.tokens.get(self.pos) {
            None => Ok(value),
            Some(extra) => Err(unexpected(extra)),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn next(&mut self) -> Result<&'a Spanned, ExprError> {
        let spanned = self.tokens.get(self.pos).ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(spanned)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ExprError> {
        let spanned = self.next()?;
        if spanned.token == expected {
            Ok(())
        } else {
            Err(unexpected(spanned))
        }
    }

    /// Unary plus is only accepted where an expression starts.
    fn at_expression_start(&self) -> bool {
        self.pos == 0
            || matches!(
                self.tokens[self.pos - 1].token,
                Token::LParen | Token::Comma
            )
    }

    fn expr(&mut self) -> Result<Number, ExprError> {
        let mut value = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value = arith::add(value, self.term()?);
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value = arith::sub(value, self.term()?);
                }
                _ => return Ok(value),
            }
        }
    }

    fn term(&mut self) -> Result<Number, ExprError> {
        let mut value = self.factor()?;
        loop {
            value = match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    arith::mul(value, self.factor()?)
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    arith::true_div(value, self.factor()?)?
                }
                Some(Token::SlashSlash) => {
                    self.pos += 1;
                    arith::floor_div(value, self.factor()?)?
                }
                Some(Token::Percent) => {
                    self.pos += 1;
                    arith::modulo(value, self.factor()?)?
                }
                _ => return Ok(value),
            };
        }
    }

    fn factor(&mut self) -> Result<Number, ExprError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(ExprError::TooDeep {
                max: self.max_depth,
            });
        }
        let result = match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.factor().map(arith::neg)
            }
            Some(Token::Plus) if self.at_expression_start() => {
                self.pos += 1;
                self.factor()
            }
            _ => self.power(),
        };
        self.depth -= 1;
        result
    }

    fn power(&mut self) -> Result<Number, ExprError> {
        let base = self.primary()?;
        if self.peek() == Some(&Token::StarStar) {
            self.pos += 1;
            let exponent = self.factor()?;
            return Ok(arith::pow(base, exponent)?);
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Number, ExprError> {
        let spanned = self.next()?;
        match &spanned.token {
            Token::Num(n) => Ok(*n),
            Token::LParen => {
                let value = self.expr()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Token::Ident(raw) => {
                let name = raw.strip_prefix("math.").unwrap_or(raw);
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    let args = self.arguments()?;
                    call(name, &args)
                } else {
                    constant(name).ok_or_else(|| ExprError::UnknownName { name: raw.clone() })
                }
            }
            _ => Err(unexpected(spanned)),
        }
    }

    /// Comma-separated arguments after an opening parenthesis, through the
    /// closing one.
    fn arguments(&mut self) -> Result<Vec<Number>, ExprError> {
        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            let spanned = self.next()?;
            match spanned.token {
                Token::Comma => continue,
                Token::RParen => return Ok(args),
                _ => return Err(unexpected(spanned)),
            }
        }
    }
}

fn unexpected(spanned: &Spanned) -> ExprError {
    ExprError::UnexpectedToken {
        token: spanned.token.describe(),
        position: spanned.position,
    }
}

fn constant(name: &str) -> Option<Number> {
    match name {
        "pi" => Some(Number::Float(consts::PI)),
        "e" => Some(Number::Float(consts::E)),
        "tau" => Some(Number::Float(consts::TAU)),
        _ => None,
    }
}

fn arity(
    function: &str,
    args: &[Number],
    expected: &'static str,
    ok: bool,
) -> Result<(), ExprError> {
    if ok {
        Ok(())
    } else {
        Err(ExprError::Arity {
            function: function.to_string(),
            expected,
            given: args.len(),
        })
    }
}

fn float(value: f64) -> Result<Number, ExprError> {
    if value.is_finite() {
        Ok(Number::Float(value))
    } else {
        Err(EvalError::Overflow.into())
    }
}

fn integral(value: f64) -> Number {
    if fits_i64(value) {
        Number::Int(value as i64)
    } else {
        Number::Float(value)
    }
}

fn positive(value: Number) -> Result<f64, ExprError> {
    let v = value.as_f64();
    if v <= 0.0 {
        return Err(EvalError::MathDomain.into());
    }
    Ok(v)
}

fn call(name: &str, args: &[Number]) -> Result<Number, ExprError> {
    let one = || arity(name, args, "exactly one argument", args.len() == 1);

    match name {
        "abs" => {
            one()?;
            Ok(arith::abs(args[0]))
        }
        "round" => {
            arity(name, args, "1 or 2 arguments", (1..=2).contains(&args.len()))?;
            let digits = match args.get(1) {
                None => None,
                Some(d) => Some(d.to_i64().filter(|_| matches!(d, Number::Int(_))).ok_or(
                    EvalError::InvalidNumberType {
                        type_name: "float".to_string(),
                    },
                )?),
            };
            Ok(arith::round(args[0], digits)?)
        }
        "max" | "min" => {
            arity(name, args, "at least 2 arguments", args.len() >= 2)?;
            let pick_max = name == "max";
            let mut best = args[0];
            for &candidate in &args[1..] {
                let better = if pick_max {
                    candidate.as_f64() > best.as_f64()
                } else {
                    candidate.as_f64() < best.as_f64()
                };
                if better {
                    best = candidate;
                }
            }
            Ok(best)
        }
        "pow" => {
            arity(name, args, "exactly 2 arguments", args.len() == 2)?;
            Ok(arith::pow(args[0], args[1])?)
        }
        "sqrt" => {
            one()?;
            if args[0].as_f64() < 0.0 {
                return Err(EvalError::MathDomain.into());
            }
            Ok(arith::sqrt(args[0])?)
        }
        "factorial" => {
            one()?;
            Ok(arith::factorial(args[0])?)
        }
        "floor" => {
            one()?;
            Ok(match args[0] {
                Number::Int(_) => args[0],
                Number::Float(f) => integral(f.floor()),
            })
        }
        "ceil" => {
            one()?;
            Ok(match args[0] {
                Number::Int(_) => args[0],
                Number::Float(f) => integral(f.ceil()),
            })
        }
        "exp" => {
            one()?;
            float(args[0].as_f64().exp())
        }
        "log" => {
            arity(name, args, "1 or 2 arguments", (1..=2).contains(&args.len()))?;
            let x = positive(args[0])?;
            match args.get(1) {
                None => float(x.ln()),
                Some(&base) => {
                    let b = positive(base)?;
                    if b == 1.0 {
                        return Err(EvalError::DivisionByZero.into());
                    }
                    float(x.ln() / b.ln())
                }
            }
        }
        "log10" => {
            one()?;
            float(positive(args[0])?.log10())
        }
        "sin" => {
            one()?;
            float(args[0].as_f64().sin())
        }
        "cos" => {
            one()?;
            float(args[0].as_f64().cos())
        }
        "tan" => {
            one()?;
            float(args[0].as_f64().tan())
        }
        _ => Err(ExprError::UnknownName {
            name: name.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::super::lexer::tokenize;
    use super::*;

    fn eval(source: &str) -> Result<Number, ExprError> {
        let tokens = tokenize(source)?;
        Evaluator::new(&tokens, 64).evaluate()
    }

    #[test]
    fn precedence_and_associativity() {
        assert_eq!(eval("2+3*4"), Ok(Number::Int(14)));
        assert_eq!(eval("(2+3)*4"), Ok(Number::Int(20)));
        assert_eq!(eval("2**3**2"), Ok(Number::Int(512)));
        assert_eq!(eval("-2**2"), Ok(Number::Int(-4)));
        assert_eq!(eval("10-4-3"), Ok(Number::Int(3)));
        assert_eq!(eval("2**-1"), Ok(Number::Float(0.5)));
    }

    #[test]
    fn unary_plus_only_at_expression_start() {
        assert_eq!(eval("+3"), Ok(Number::Int(3)));
        assert_eq!(eval("max(+1,+2)"), Ok(Number::Int(2)));
        assert!(matches!(
            eval("2++3"),
            Err(ExprError::UnexpectedToken { .. })
        ));
    }

    #[test]
    fn functions_and_constants() {
        assert_eq!(eval("max(1,2,3)"), Ok(Number::Int(3)));
        assert_eq!(eval("min(5,3,8)"), Ok(Number::Int(3)));
        assert_eq!(eval("abs(-5)"), Ok(Number::Int(5)));
        assert_eq!(eval("round(3.7)"), Ok(Number::Int(4)));
        assert_eq!(eval("math.floor(2.5)"), Ok(Number::Int(2)));
        assert_eq!(eval("log(8,2)"), Ok(Number::Float(3.0)));
        assert_eq!(eval("pi"), Ok(Number::Float(consts::PI)));
    }

    #[test]
    fn errors() {
        assert_eq!(
            eval("abc+1"),
            Err(ExprError::UnknownName { name: "abc".into() })
        );
        assert_eq!(eval("5/0"), Err(EvalError::DivisionByZero.into()));
        assert_eq!(eval("sqrt(-1)"), Err(EvalError::MathDomain.into()));
        assert_eq!(eval("(1+2"), Err(ExprError::UnexpectedEnd));
        assert!(matches!(eval("/5"), Err(ExprError::UnexpectedToken { .. })));
        assert!(matches!(eval("abs(1,2)"), Err(ExprError::Arity { .. })));
    }

    #[test]
    fn nesting_is_bounded() {
        let deep = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        let tokens = tokenize(&deep).unwrap();
        assert_eq!(
            Evaluator::new(&tokens, 64).evaluate(),
            Err(ExprError::TooDeep { max: 64 })
        );
    }
}
