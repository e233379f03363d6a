//! Arithmetic on [`Number`] with integer-preserving semantics: integer
//! operands give integer results unless the operation is inherently
//! fractional or the i64 range is exceeded, in which case the result
//! degrades to a float and the caller's magnitude check decides.

use crate::EvalError;
use calc_models::{fits_i64, Number};

/// Largest exponent magnitude accepted by [`pow`].
pub const MAX_EXPONENT: u32 = 1000;

/// Largest argument accepted by [`factorial`]; 171! overflows f64.
pub const MAX_FACTORIAL: u32 = 170;

pub fn add(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_add(y)
            .map(Number::Int)
            .unwrap_or_else(|| Number::Float(x as f64 + y as f64)),
        (x, y) => Number::Float(x.as_f64() + y.as_f64()),
    }
}

pub fn sub(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_sub(y)
            .map(Number::Int)
            .unwrap_or_else(|| Number::Float(x as f64 - y as f64)),
        (x, y) => Number::Float(x.as_f64() - y.as_f64()),
    }
}

pub fn mul(a: Number, b: Number) -> Number {
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => x
            .checked_mul(y)
            .map(Number::Int)
            .unwrap_or_else(|| Number::Float(x as f64 * y as f64)),
        (x, y) => Number::Float(x.as_f64() * y.as_f64()),
    }
}

pub fn neg(a: Number) -> Number {
    match a {
        Number::Int(x) => x
            .checked_neg()
            .map(Number::Int)
            .unwrap_or(Number::Float(-(x as f64))),
        Number::Float(f) => Number::Float(-f),
    }
}

pub fn abs(a: Number) -> Number {
    match a {
        Number::Int(x) => x
            .checked_abs()
            .map(Number::Int)
            .unwrap_or(Number::Float((x as f64).abs())),
        Number::Float(f) => Number::Float(f.abs()),
    }
}

/// True division; always a float.
pub fn true_div(a: Number, b: Number) -> Result<Number, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    Ok(Number::Float(a.as_f64() / b.as_f64()))
}

/// Division rounded toward negative infinity.
pub fn floor_div(a: Number, b: Number) -> Result<Number, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => match (x.checked_div(y), x.checked_rem(y)) {
            (Some(q), Some(r)) => {
                let q = if r != 0 && ((r < 0) != (y < 0)) { q - 1 } else { q };
                Ok(Number::Int(q))
            }
            _ => Ok(Number::Float((x as f64 / y as f64).floor())),
        },
        (x, y) => Ok(Number::Float((x.as_f64() / y.as_f64()).floor())),
    }
}

/// Floored modulo: the result takes the sign of the divisor, so
/// `-7 mod 5 == 3`.
pub fn modulo(a: Number, b: Number) -> Result<Number, EvalError> {
    if b.is_zero() {
        return Err(EvalError::DivisionByZero);
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => match x.checked_rem(y) {
            Some(r) if r != 0 && ((r < 0) != (y < 0)) => Ok(Number::Int(r + y)),
            Some(r) => Ok(Number::Int(r)),
            None => Ok(Number::Int(0)),
        },
        (x, y) => {
            let (x, y) = (x.as_f64(), y.as_f64());
            let r = x % y;
            if r != 0.0 && ((r < 0.0) != (y < 0.0)) {
                Ok(Number::Float(r + y))
            } else {
                Ok(Number::Float(r))
            }
        }
    }
}

pub fn pow(base: Number, exponent: Number) -> Result<Number, EvalError> {
    if exponent.abs_f64() > MAX_EXPONENT as f64 {
        return Err(EvalError::ExponentTooLarge { max: MAX_EXPONENT });
    }

    if let (Number::Int(b), Number::Int(e)) = (base, exponent) {
        if e >= 0 {
            // |e| <= MAX_EXPONENT, so the cast is lossless.
            if let Some(v) = b.checked_pow(e as u32) {
                return Ok(Number::Int(v));
            }
            let v = (b as f64).powi(e as i32);
            return if v.is_finite() {
                Ok(Number::Float(v))
            } else {
                Err(EvalError::PowerOverflow)
            };
        }
        if b == 0 {
            return Err(EvalError::DivisionByZero);
        }
        return Ok(Number::Float((b as f64).powi(e as i32)));
    }

    let (b, e) = (base.as_f64(), exponent.as_f64());
    if b == 0.0 && e < 0.0 {
        return Err(EvalError::DivisionByZero);
    }
    if b < 0.0 && e.fract() != 0.0 {
        return Err(EvalError::NotReal);
    }
    let v = b.powf(e);
    if v.is_finite() {
        Ok(Number::Float(v))
    } else {
        Err(EvalError::PowerOverflow)
    }
}

pub fn sqrt(a: Number) -> Result<Number, EvalError> {
    let v = a.as_f64();
    if v < 0.0 {
        return Err(EvalError::NegativeSquareRoot);
    }
    Ok(Number::Float(v.sqrt()))
}

/// n! for a non-negative integral `n` no larger than [`MAX_FACTORIAL`].
/// Exact while the product fits in i64, a float beyond that.
pub fn factorial(n: Number) -> Result<Number, EvalError> {
    if !n.is_integral() {
        return Err(EvalError::FactorialDomain);
    }
    let value = n.as_f64();
    if value < 0.0 {
        return Err(EvalError::FactorialDomain);
    }
    if value > MAX_FACTORIAL as f64 {
        return Err(EvalError::FactorialTooLarge { max: MAX_FACTORIAL });
    }

    let n = value as u32;
    let mut exact: Option<i64> = Some(1);
    let mut approx = 1.0_f64;
    for k in 2..=n {
        exact = exact.and_then(|acc| acc.checked_mul(k as i64));
        approx *= k as f64;
    }
    Ok(match exact {
        Some(v) => Number::Int(v),
        None => Number::Float(approx),
    })
}

/// Round half to even, the way the `round` builtin behaves. With `digits`
/// the result keeps its type; without, it is always an integer.
pub fn round(a: Number, digits: Option<i64>) -> Result<Number, EvalError> {
    match digits {
        None => match a {
            Number::Int(_) => Ok(a),
            Number::Float(f) => {
                let r = f.round_ties_even();
                if !r.is_finite() {
                    Err(EvalError::Overflow)
                } else if fits_i64(r) {
                    Ok(Number::Int(r as i64))
                } else {
                    Ok(Number::Float(r))
                }
            }
        },
        Some(d) => match a {
            Number::Int(_) if d >= 0 => Ok(a),
            _ => {
                let factor = 10f64.powi(d.clamp(-308, 308) as i32);
                let scaled = a.as_f64() * factor;
                if !scaled.is_finite() {
                    return Ok(a);
                }
                let r = scaled.round_ties_even() / factor;
                Ok(match a {
                    Number::Int(_) => Number::Int(r as i64),
                    Number::Float(_) => Number::Float(r),
                })
            }
        },
    }
}

/// Round a float to `places` decimal places. Values whose scaled form is
/// beyond f64's exact integer range are returned unchanged.
pub fn round_to_places(value: f64, places: u32) -> f64 {
    const EXACT_LIMIT: f64 = 9_007_199_254_740_992.0; // 2^53
    let factor = 10f64.powi(places as i32);
    let scaled = value * factor;
    if !scaled.is_finite() || scaled.abs() >= EXACT_LIMIT {
        return value;
    }
    scaled.round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(v: i64) -> Number {
        Number::Int(v)
    }

    fn float(v: f64) -> Number {
        Number::Float(v)
    }

    #[test]
    fn integer_ops_stay_integral() {
        assert!(matches!(add(int(2), int(3)), Number::Int(5)));
        assert!(matches!(mul(int(4), int(-6)), Number::Int(-24)));
        assert!(matches!(add(int(2), float(0.5)), Number::Float(_)));
    }

    #[test]
    fn overflow_degrades_to_float() {
        assert!(matches!(mul(int(i64::MAX), int(2)), Number::Float(_)));
        assert!(matches!(add(int(i64::MAX), int(1)), Number::Float(_)));
    }

    #[test]
    fn modulo_follows_divisor_sign() {
        assert_eq!(modulo(int(-7), int(5)), Ok(int(3)));
        assert_eq!(modulo(int(7), int(-5)), Ok(int(-3)));
        assert_eq!(modulo(int(10), int(3)), Ok(int(1)));
        assert_eq!(modulo(float(-7.5), int(2)), Ok(float(0.5)));
        assert_eq!(modulo(int(1), int(0)), Err(EvalError::DivisionByZero));
    }

    #[test]
    fn floor_division_rounds_down() {
        assert_eq!(floor_div(int(7), int(2)), Ok(int(3)));
        assert_eq!(floor_div(int(-7), int(2)), Ok(int(-4)));
        assert_eq!(floor_div(float(7.5), int(2)), Ok(float(3.0)));
    }

    #[test]
    fn power_rules() {
        assert!(matches!(pow(int(2), int(10)), Ok(Number::Int(1024))));
        assert_eq!(pow(int(2), int(-2)), Ok(float(0.25)));
        assert_eq!(pow(int(0), int(-1)), Err(EvalError::DivisionByZero));
        assert_eq!(pow(float(-8.0), float(0.5)), Err(EvalError::NotReal));
        assert_eq!(
            pow(int(2), int(1001)),
            Err(EvalError::ExponentTooLarge { max: 1000 })
        );
        assert_eq!(pow(float(10.0), int(400)), Err(EvalError::PowerOverflow));
    }

    #[test]
    fn factorial_rules() {
        assert!(matches!(factorial(int(5)), Ok(Number::Int(120))));
        assert!(matches!(factorial(int(0)), Ok(Number::Int(1))));
        assert!(matches!(factorial(float(4.0)), Ok(Number::Int(24))));
        assert!(matches!(factorial(int(25)), Ok(Number::Float(_))));
        assert_eq!(factorial(float(2.5)), Err(EvalError::FactorialDomain));
        assert_eq!(factorial(int(-1)), Err(EvalError::FactorialDomain));
        assert_eq!(
            factorial(int(171)),
            Err(EvalError::FactorialTooLarge { max: 170 })
        );
    }

    #[test]
    fn round_is_half_even() {
        assert_eq!(round(float(2.5), None), Ok(int(2)));
        assert_eq!(round(float(3.5), None), Ok(int(4)));
        assert_eq!(round(float(3.7), None), Ok(int(4)));
        assert_eq!(round(float(3.14159), Some(2)), Ok(float(3.14)));
    }

    #[test]
    fn rounding_to_places() {
        assert_eq!(round_to_places(0.1 + 0.2, 10), 0.3);
        assert_eq!(round_to_places(1.23456, 2), 1.23);
        let big = 123_456_789_012_345.67;
        assert_eq!(round_to_places(big, 10), big);
    }
}
