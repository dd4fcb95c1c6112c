//! The JSON value algebra this store persists.
//!
//! A [`Value`] is exactly one of `null`, `bool`, `number`, `string`, an
//! ordered `object`, or a dense zero-indexed `array`. This is the *in-memory*
//! representation used when a caller hands a whole subtree to
//! [`crate::View::set`] or reads one back via [`crate::View::to_value`]; the
//! on-disk representation is the path-encoded record layout in
//! [`crate::codec`].

use indexmap::IndexMap;

/// An owned JSON value.
///
/// `Object` preserves insertion order (backed by [`IndexMap`]) and
/// guarantees unique keys, matching the data model's requirement that
/// objects are an "ordered sequence of unique string keys -> value".
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Object(IndexMap<String, Value>),
    Array(Vec<Value>),
}

impl Value {
    /// Returns `true` if this value is a container (object or array).
    pub fn is_container(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Array(_))
    }

    /// Returns `true` if this value is a scalar leaf.
    pub fn is_scalar(&self) -> bool {
        !self.is_container()
    }

    /// Returns `true` if this is a finite number (rejects NaN/Infinity,
    /// which are not part of the JSON number grammar).
    pub fn is_valid(&self) -> bool {
        match self {
            Value::Number(n) => n.is_finite(),
            Value::Object(map) => map.values().all(Value::is_valid),
            Value::Array(items) => items.iter().all(Value::is_valid),
            _ => true,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&IndexMap<String, Value>> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Encodes a scalar leaf to its standard JSON textual form (the payload
    /// stored under a `=` record). Panics if called on a container; callers
    /// are expected to have already branched on [`Value::is_container`].
    pub(crate) fn encode_scalar(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => serde_json::Number::from_f64(*n)
                .map(|num| num.to_string())
                .unwrap_or_else(|| "null".to_string()),
            Value::String(s) => serde_json::to_string(s).expect("string encoding is infallible"),
            Value::Object(_) | Value::Array(_) => {
                unreachable!("encode_scalar called on a container value")
            }
        }
    }

    /// Decodes a scalar leaf from its standard JSON textual form. Any
    /// failure here is a [`crate::Error::Corruption`] at the call site.
    pub(crate) fn decode_scalar(text: &str) -> Option<Value> {
        let json: serde_json::Value = serde_json::from_str(text).ok()?;
        match json {
            serde_json::Value::Null => Some(Value::Null),
            serde_json::Value::Bool(b) => Some(Value::Bool(b)),
            serde_json::Value::Number(n) => Some(Value::Number(n.as_f64()?)),
            serde_json::Value::String(s) => Some(Value::String(s)),
            serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl FromIterator<(String, Value)> for Value {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Value::Object(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_round_trip() {
        for v in [
            Value::Null,
            Value::Bool(true),
            Value::Number(42.5),
            Value::String("hello \"world\"".to_string()),
        ] {
            let encoded = v.encode_scalar();
            let decoded = Value::decode_scalar(&encoded).unwrap();
            assert_eq!(decoded, v);
        }
    }

    #[test]
    fn non_finite_number_is_invalid() {
        assert!(!Value::Number(f64::NAN).is_valid());
        assert!(!Value::Number(f64::INFINITY).is_valid());
        assert!(Value::Number(1.0).is_valid());
    }

    #[test]
    fn object_preserves_insertion_order() {
        let obj = Value::from_iter([
            ("z".to_string(), Value::from(1)),
            ("a".to_string(), Value::from(2)),
        ]);
        let map = obj.as_object().unwrap();
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["z", "a"]);
    }
}
