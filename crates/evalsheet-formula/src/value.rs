//! Runtime values produced by evaluation

use crate::error::{EvalError, EvalResult};
use chrono::NaiveDateTime;
use evalsheet_core::CellValue;
use std::fmt;

/// Display format for date-time values
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Value types during formula evaluation
///
/// `Array` only appears while an aggregate function consumes a range; it is
/// never the result of a whole expression.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Value {
    Number(f64),
    Text(String),
    Boolean(bool),
    DateTime(NaiveDateTime),
    Array(Vec<Value>),
}

impl Value {
    /// Create a text value
    pub fn text<S: Into<String>>(s: S) -> Self {
        Value::Text(s.into())
    }

    /// Short name of the variant, used in type mismatch messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Number(_) => "number",
            Value::Text(_) => "text",
            Value::Boolean(_) => "boolean",
            Value::DateTime(_) => "datetime",
            Value::Array(_) => "range",
        }
    }

    /// Numeric view; booleans count as 0/1, text never converts
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(true) => Some(1.0),
            Value::Boolean(false) => Some(0.0),
            _ => None,
        }
    }

    /// Force conversion to number for arithmetic
    pub fn to_number(&self) -> EvalResult<f64> {
        self.as_number()
            .ok_or_else(|| EvalError::type_mismatch("number", self.type_name()))
    }

    /// Truth value; non-zero numbers are true
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Number(n) => Some(*n != 0.0),
            _ => None,
        }
    }

    /// Force conversion to boolean for logical operators and conditions
    pub fn to_bool(&self) -> EvalResult<bool> {
        self.as_bool()
            .ok_or_else(|| EvalError::type_mismatch("boolean", self.type_name()))
    }

    /// Canonical text form, as used by `&` and the string functions
    pub fn as_text(&self) -> String {
        match self {
            Value::Text(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Empty text is the blank marker
    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Text(s) if s.is_empty())
    }

    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_nan())
    }
}

/// Format a number the way the formula languages print it
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => f.write_str(&format_number(*n)),
            Value::Text(s) => f.write_str(s),
            Value::Boolean(true) => f.write_str("TRUE"),
            Value::Boolean(false) => f.write_str("FALSE"),
            Value::DateTime(dt) => write!(f, "{}", dt.format(DATETIME_FORMAT)),
            Value::Array(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<CellValue> for Value {
    fn from(value: CellValue) -> Self {
        match value {
            CellValue::Empty => Value::Text(String::new()),
            CellValue::Number(n) => Value::Number(n),
            CellValue::Text(s) => Value::Text(s),
            CellValue::Boolean(b) => Value::Boolean(b),
            CellValue::DateTime(dt) => Value::DateTime(dt),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(dt: NaiveDateTime) -> Self {
        Value::DateTime(dt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_canonical_text() {
        assert_eq!(Value::Number(3.0).as_text(), "3");
        assert_eq!(Value::Number(-2.5).as_text(), "-2.5");
        assert_eq!(Value::Number(0.1 + 0.2).as_text(), "0.30000000000000004");
        assert_eq!(Value::Number(f64::NAN).as_text(), "NaN");
        assert_eq!(Value::Boolean(true).as_text(), "TRUE");

        let dt = NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(8, 5, 0)
            .unwrap();
        assert_eq!(Value::DateTime(dt).as_text(), "2024-03-09 08:05:00");
    }

    #[test]
    fn test_coercions() {
        assert_eq!(Value::Boolean(true).to_number(), Ok(1.0));
        assert_eq!(
            Value::text("1").to_number(),
            Err(EvalError::TypeMismatch {
                expected: "number",
                found: "text"
            })
        );
        assert_eq!(Value::Number(0.0).to_bool(), Ok(false));
        assert!(Value::text("TRUE").to_bool().is_err());
    }

    #[test]
    fn test_blank_cell_becomes_empty_text() {
        let v = Value::from(CellValue::Empty);
        assert!(v.is_blank());
        assert_eq!(v, Value::text(""));
    }
}
