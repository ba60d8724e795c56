// src/transform/mapping.rs
use std::collections::BTreeMap;
use std::fmt;

/// Scalar stored in a field-mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Int(i64),
    Text(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{v}"),
            Value::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
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

/// Declared type of a stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Int,
    String,
}

impl ValueType {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "int" => Some(ValueType::Int),
            "string" => Some(ValueType::String),
            _ => None,
        }
    }
}

/// Coerce an extracted string to `ty`.
///
/// Non-numeric input for `int` becomes `0` and is not reported.
pub fn coerce_or_zero(raw: &str, ty: ValueType) -> Value {
    match ty {
        ValueType::Int => Value::Int(raw.parse::<i64>().unwrap_or(0)),
        ValueType::String => Value::Text(raw.to_string()),
    }
}

/// Key → value record for one candidate feed item, built up as storage nodes fire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMapping {
    values: BTreeMap<String, Value>,
}

impl FieldMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for FieldMapping {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut m = FieldMapping::new();
        for (k, v) in iter {
            m.insert(k, v);
        }
        m
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_coercion_falls_back_to_zero() {
        assert_eq!(coerce_or_zero("42", ValueType::Int), Value::Int(42));
        assert_eq!(coerce_or_zero("-7", ValueType::Int), Value::Int(-7));
        assert_eq!(coerce_or_zero("abc", ValueType::Int), Value::Int(0));
        assert_eq!(coerce_or_zero("", ValueType::Int), Value::Int(0));
        assert_eq!(coerce_or_zero(" 1", ValueType::Int), Value::Int(0));
    }

    #[test]
    fn string_coercion_keeps_raw_text() {
        assert_eq!(
            coerce_or_zero(" a b ", ValueType::String),
            Value::Text(" a b ".into())
        );
    }

    #[test]
    fn mapping_keys_are_sorted() {
        let m: FieldMapping = [("uri", Value::from("/x")), ("id", Value::Int(1))]
            .into_iter()
            .collect();
        assert_eq!(m.keys().collect::<Vec<_>>(), vec!["id", "uri"]);
        assert_eq!(m.len(), 2);
    }

    #[test]
    fn type_names() {
        assert_eq!(ValueType::parse("int"), Some(ValueType::Int));
        assert_eq!(ValueType::parse("string"), Some(ValueType::String));
        assert_eq!(ValueType::parse("float"), None);
    }
}
