//! Dynamic values flowing through tags and expressions

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use bandsheet_core::value::format_number;
use bandsheet_core::CellValue;

/// A value produced by a query, a variable or an expression
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null / `None`
    #[default]
    None,
    Bool(bool),
    Number(f64),
    Str(String),
    Tuple(Vec<Value>),
}

impl Value {
    /// Create a string value
    pub fn str<S: Into<String>>(s: S) -> Self {
        Value::Str(s.into())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    /// Truthiness: `None`, `False`, `0`, `""` and `()` are false
    pub fn truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Tuple(items) => !items.is_empty(),
        }
    }

    /// Numeric reading used by arithmetic and sums
    ///
    /// Booleans count as 0/1 and numeric strings parse; `None` is not a
    /// number.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Str(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Number(_) => "number",
            Value::Str(_) => "str",
            Value::Tuple(_) => "tuple",
        }
    }

    /// Compare two values of the same kind
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            (Value::None, Value::None) => Some(Ordering::Equal),
            (Value::Tuple(a), Value::Tuple(b)) => {
                for (x, y) in a.iter().zip(b) {
                    match x.compare(y)? {
                        Ordering::Equal => continue,
                        ord => return Some(ord),
                    }
                }
                Some(a.len().cmp(&b.len()))
            }
            (a, b) => a.as_number_strict()?.partial_cmp(&b.as_number_strict()?),
        }
    }

    fn as_number_strict(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }

    /// Equality across kinds: numbers and booleans compare numerically,
    /// everything else structurally
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self.as_number_strict(), other.as_number_strict()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }

    /// Convert into a cell value, keeping the type where the cell model has one
    pub fn into_cell_value(self) -> CellValue {
        match self {
            Value::None => CellValue::Empty,
            Value::Bool(b) => CellValue::Boolean(b),
            Value::Number(n) => CellValue::Number(n),
            Value::Str(s) if s.is_empty() => CellValue::Empty,
            Value::Str(s) => CellValue::Text(s),
            tuple @ Value::Tuple(_) => CellValue::Text(tuple.to_string()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => Ok(()),
            Value::Bool(true) => write!(f, "True"),
            Value::Bool(false) => write!(f, "False"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Str(s) => write!(f, "{}", s),
            Value::Tuple(items) => {
                write!(f, "(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl From<&CellValue> for Value {
    fn from(value: &CellValue) -> Self {
        match value {
            CellValue::Empty => Value::None,
            CellValue::Boolean(b) => Value::Bool(*b),
            CellValue::Number(n) => Value::Number(*n),
            CellValue::Text(s) | CellValue::DateTime(s) | CellValue::Error(s) => {
                Value::Str(s.clone())
            }
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!Value::None.truthy());
        assert!(!Value::from(0.0).truthy());
        assert!(!Value::str("").truthy());
        assert!(Value::str("x").truthy());
        assert!(Value::Tuple(vec![Value::None]).truthy());
    }

    #[test]
    fn test_json_shapes() {
        let values: Vec<Value> = serde_json::from_str(r#"[null, true, 2.5, "x", [1, "a"]]"#).unwrap();
        assert_eq!(
            values,
            vec![
                Value::None,
                Value::Bool(true),
                Value::Number(2.5),
                Value::str("x"),
                Value::Tuple(vec![Value::Number(1.0), Value::str("a")]),
            ]
        );
    }

    #[test]
    fn test_cell_value_conversion() {
        assert_eq!(Value::from(3.0).into_cell_value(), CellValue::Number(3.0));
        assert_eq!(Value::str("").into_cell_value(), CellValue::Empty);
        assert_eq!(
            Value::Tuple(vec![1.into(), "b".into()]).into_cell_value(),
            CellValue::text("(1, b)")
        );
    }
}
