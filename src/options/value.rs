//! Typed option values

use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Externally supplied option value
///
/// Every option name expects exactly one of these shapes. Supplying another
/// shape is a validation failure, never a silent coercion. `Float` exists so
/// that fractional input coming from loosely typed sources (JSON, bindings)
/// can be reported instead of truncated.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Fractional number (accepted by no option)
    Float(f64),
    /// String
    Str(String),
    /// String list
    List(Vec<String>),
    /// String map
    Map(BTreeMap<String, String>),
    /// Duration
    #[serde(skip)]
    Duration(Duration),
}

impl OptionValue {
    /// Short type name used in error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::List(_) => "string list",
            Self::Map(_) => "string map",
            Self::Duration(_) => "duration",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Str(s) => write!(f, "{}", s),
            Self::List(l) => write!(f, "[{}]", l.join(", ")),
            Self::Map(m) => {
                let pairs: Vec<String> = m.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
            Self::Duration(d) => write!(f, "{}ms", d.as_millis()),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        Self::Int(v.into())
    }
}

impl From<u16> for OptionValue {
    fn from(v: u16) -> Self {
        Self::Int(v.into())
    }
}

impl From<u32> for OptionValue {
    fn from(v: u32) -> Self {
        Self::Int(v.into())
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Duration> for OptionValue {
    fn from(v: Duration) -> Self {
        Self::Duration(v)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

impl From<BTreeMap<String, String>> for OptionValue {
    fn from(v: BTreeMap<String, String>) -> Self {
        Self::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_untagged() {
        let v: OptionValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, OptionValue::Bool(true));

        let v: OptionValue = serde_json::from_str("10").unwrap();
        assert_eq!(v, OptionValue::Int(10));

        let v: OptionValue = serde_json::from_str("10.5").unwrap();
        assert_eq!(v, OptionValue::Float(10.5));

        let v: OptionValue = serde_json::from_str("\"ERR\"").unwrap();
        assert_eq!(v, OptionValue::Str("ERR".into()));

        let v: OptionValue = serde_json::from_str("[\"a\", \"b\"]").unwrap();
        assert_eq!(v, OptionValue::List(vec!["a".into(), "b".into()]));

        let v: OptionValue = serde_json::from_str("{\"k\": \"v\"}").unwrap();
        assert!(matches!(v, OptionValue::Map(ref m) if m.get("k").map(String::as_str) == Some("v")));
    }

    #[test]
    fn test_type_names() {
        assert_eq!(OptionValue::from(Duration::from_secs(1)).type_name(), "duration");
        assert_eq!(OptionValue::from("x").type_name(), "string");
    }
}
