use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A calculator value. Integers stay integers until an operation forces a
/// float (true division, roots, overflow), mirroring how results are
/// reported on the wire: `8` versus `5.0`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    pub fn abs_f64(self) -> f64 {
        self.as_f64().abs()
    }

    pub fn is_zero(self) -> bool {
        self.as_f64() == 0.0
    }

    pub fn is_integral(self) -> bool {
        match self {
            Number::Int(_) => true,
            Number::Float(f) => f.is_finite() && f.fract() == 0.0,
        }
    }

    /// Collapse a whole-valued float into an integer when it fits.
    pub fn normalize_integral(self) -> Number {
        match self {
            Number::Float(f) if f.is_finite() && f.fract() == 0.0 && fits_i64(f) => {
                Number::Int(f as i64)
            }
            other => other,
        }
    }

    /// Integer value of an integral number, if representable.
    pub fn to_i64(self) -> Option<i64> {
        match self {
            Number::Int(i) => Some(i),
            Number::Float(f) if f.is_finite() && f.fract() == 0.0 && fits_i64(f) => Some(f as i64),
            Number::Float(_) => None,
        }
    }
}

/// Whether `f` converts to i64 without saturating.
pub fn fits_i64(f: f64) -> bool {
    f >= i64::MIN as f64 && f < i64::MAX as f64
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Number::Int(a), Number::Int(b)) => a == b,
            (a, b) => a.as_f64() == b.as_f64(),
        }
    }
}

impl From<i64> for Number {
    fn from(value: i64) -> Self {
        Number::Int(value)
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                write!(f, "{v:.1}")
            }
            Number::Float(v) => write!(f, "{v}"),
        }
    }
}

/// JSON type name used in "Invalid number type" messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl TryFrom<&Value> for Number {
    type Error = &'static str;

    /// Accepts JSON numbers only; the error carries the offending JSON type.
    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Number::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Number::Float(f))
                } else {
                    Err("number")
                }
            }
            other => Err(json_type_name(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_ints_and_floats_distinctly() {
        assert_eq!(serde_json::to_string(&Number::Int(8)).unwrap(), "8");
        assert_eq!(serde_json::to_string(&Number::Float(5.0)).unwrap(), "5.0");
        assert_eq!(serde_json::to_string(&Number::Float(0.25)).unwrap(), "0.25");
    }

    #[test]
    fn converts_from_json_values() {
        assert_eq!(Number::try_from(&json!(3)), Ok(Number::Int(3)));
        assert_eq!(Number::try_from(&json!(2.5)), Ok(Number::Float(2.5)));
        assert_eq!(Number::try_from(&json!("3")), Err("string"));
        assert_eq!(Number::try_from(&Value::Null), Err("null"));
        assert_eq!(Number::try_from(&json!(true)), Err("boolean"));
    }

    #[test]
    fn normalizes_whole_floats() {
        assert!(matches!(Number::Float(5.0).normalize_integral(), Number::Int(5)));
        assert!(matches!(Number::Float(5.5).normalize_integral(), Number::Float(_)));
        assert!(matches!(Number::Float(1e300).normalize_integral(), Number::Float(_)));
    }

    #[test]
    fn displays_like_the_wire_format() {
        assert_eq!(Number::Float(4.0).to_string(), "4.0");
        assert_eq!(Number::Float(1.5).to_string(), "1.5");
        assert_eq!(Number::Int(-4).to_string(), "-4");
    }

    #[test]
    fn equality_crosses_variants() {
        assert_eq!(Number::Int(2), Number::Float(2.0));
        assert_ne!(Number::Int(2), Number::Float(2.5));
    }
}
