//! Typed parameter values for testbench templates.
//!
//! [`ParamValue`] doubles as the resolved template body: a tree of scalars,
//! lists and ordered maps that serializes directly to YAML or JSON.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameter value types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Absent value (`~` / `null`).
    Null,

    /// Boolean value.
    Boolean(bool),

    /// Integer value.
    Integer(i64),

    /// Floating-point value.
    Float(f64),

    /// String value.
    String(String),

    /// List of values.
    List(Vec<ParamValue>),

    /// Ordered mapping (structural nodes of a template body).
    Map(IndexMap<String, ParamValue>),
}

impl ParamValue {
    /// Try to extract as f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    /// Try to extract as i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            Self::Float(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Try to extract as string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to extract as bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// List of numbers, if every element is numeric.
    pub fn as_f64_list(&self) -> Option<Vec<f64>> {
        self.as_list()?.iter().map(ParamValue::as_f64).collect()
    }

    /// Name of the variant as used in constraint declarations.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    /// Equality that treats `Integer(n)` and `Float(n.0)` as the same value.
    pub fn loosely_equals(&self, other: &ParamValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => self == other,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Boolean(b) => write!(f, "{b}"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::String(s) => f.write_str(s),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Self::Map(entries) => {
                f.write_str("{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                f.write_str("}")
            }
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<usize> for ParamValue {
    fn from(v: usize) -> Self {
        Self::Integer(v as i64)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Boolean(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<f64>> for ParamValue {
    fn from(v: Vec<f64>) -> Self {
        Self::List(v.into_iter().map(Self::Float).collect())
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v.into_iter().map(Self::String).collect())
    }
}

/// Ordered parameter set (declaration order is preserved).
pub type ParamMap = IndexMap<String, ParamValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_json() {
        let v: ParamValue = serde_json::from_str(r#"{"a": 1, "b": 2.5, "c": "x", "d": [true, null]}"#).unwrap();
        let ParamValue::Map(m) = v else { panic!("expected map") };
        assert_eq!(m["a"], ParamValue::Integer(1));
        assert_eq!(m["b"], ParamValue::Float(2.5));
        assert_eq!(m["c"], ParamValue::String("x".into()));
        assert_eq!(
            m["d"],
            ParamValue::List(vec![ParamValue::Boolean(true), ParamValue::Null])
        );
    }

    #[test]
    fn test_numeric_views() {
        assert_eq!(ParamValue::Integer(3).as_f64(), Some(3.0));
        assert_eq!(ParamValue::Float(3.0).as_i64(), Some(3));
        assert_eq!(ParamValue::Float(3.5).as_i64(), None);
        assert!(ParamValue::Integer(2).loosely_equals(&ParamValue::Float(2.0)));
        assert_eq!(
            ParamValue::from(vec![1.0, 2.0]).as_f64_list(),
            Some(vec![1.0, 2.0])
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(ParamValue::from(2.4e9).to_string(), "2400000000");
        assert_eq!(ParamValue::from(vec![1.0, 2.5]).to_string(), "[1, 2.5]");
        assert_eq!(ParamValue::from("filter.s2p").to_string(), "filter.s2p");
    }
}
