use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Dynamic value used for attributes, dependency lists and loose children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Text form used when the value is written as an attribute.
    ///
    /// Lists are space-joined (`class` lists), booleans render as presence
    /// only, null renders empty.
    pub fn to_attribute_string(&self) -> String {
        match self {
            Value::Null | Value::Bool(_) => String::new(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::to_attribute_string)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(" "),
            Value::Map(entries) => entries
                .iter()
                .map(|(k, v)| format!("{}:{}", k, v.to_attribute_string()))
                .collect::<Vec<_>>()
                .join(";"),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            _ => write!(f, "{}", self.to_attribute_string()),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<&String> for Value {
    fn from(value: &String) -> Self {
        Value::String(value.clone())
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Value::Map(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_strings() {
        assert_eq!(Value::from("a").to_attribute_string(), "a");
        assert_eq!(Value::from(3).to_attribute_string(), "3");
        assert_eq!(Value::from(1.5).to_attribute_string(), "1.5");
        assert_eq!(Value::from(true).to_attribute_string(), "");
        assert_eq!(Value::Null.to_attribute_string(), "");
        assert_eq!(
            Value::List(vec!["btn".into(), Value::Null, "primary".into()]).to_attribute_string(),
            "btn primary"
        );
    }

    #[test]
    fn test_serde_untagged() {
        let value: Value = serde_json::from_str(r#"{"a": [1, "x", null, true]}"#).unwrap();
        let mut expected = BTreeMap::new();
        expected.insert(
            "a".to_string(),
            Value::List(vec![
                Value::Int(1),
                Value::String("x".into()),
                Value::Null,
                Value::Bool(true),
            ]),
        );
        assert_eq!(value, Value::Map(expected));
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(Value::from(None::<i64>), Value::Null);
        assert_eq!(Value::from(Some("x")), Value::String("x".into()));
    }
}
