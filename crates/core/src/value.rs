//! Document field values.

use crate::error::{Error, Result};
use crate::field_path::FieldPath;
use crate::timestamp::Timestamp;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Top-level document fields, in insertion order.
pub type DocumentData = IndexMap<String, Value>;

/// A latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Degrees, `-90..=90`
    pub latitude: f64,
    /// Degrees, `-180..=180`
    pub longitude: f64,
}

/// A field value.
///
/// `Delete` and `ServerTimestamp` are write sentinels: they never come back
/// from the service and are turned into masks and transforms before a write
/// is sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Value {
    /// Null
    Null,
    /// Boolean
    Boolean(bool),
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Double(f64),
    /// Point in time
    Timestamp(Timestamp),
    /// UTF-8 string
    String(String),
    /// Raw bytes
    Bytes(Vec<u8>),
    /// Full resource name of another document
    Reference(String),
    /// Geographic point
    GeoPoint(GeoPoint),
    /// Array (arrays may not directly contain arrays)
    Array(Vec<Value>),
    /// Nested map
    Map(DocumentData),
    /// Sentinel: remove the field
    Delete,
    /// Sentinel: set the field to the commit time on the server
    ServerTimestamp,
}

impl Value {
    /// True for `Delete` and `ServerTimestamp`.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Value::Delete | Value::ServerTimestamp)
    }

    /// Whether this value is a sentinel or holds one at any depth.
    pub fn contains_sentinel(&self) -> bool {
        match self {
            Value::Delete | Value::ServerTimestamp => true,
            Value::Array(items) => items.iter().any(Value::contains_sentinel),
            Value::Map(map) => map.values().any(Value::contains_sentinel),
            _ => false,
        }
    }

    /// True for `Double(NaN)`.
    pub fn is_nan(&self) -> bool {
        matches!(self, Value::Double(d) if d.is_nan())
    }

    /// The nested map, if this is one.
    pub fn as_map(&self) -> Option<&DocumentData> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    /// The string, if this is one.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// The integer, if this is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

/// Looks up a nested field.
pub fn get_field<'a>(data: &'a DocumentData, path: &FieldPath) -> Option<&'a Value> {
    let (first, rest) = path.segments().split_first()?;
    let mut current = data.get(first)?;
    for segment in rest {
        current = current.as_map()?.get(segment)?;
    }
    Some(current)
}

/// Converts a JSON object into document data.
pub fn data_from_json(json: serde_json::Value) -> Result<DocumentData> {
    match Value::from(json) {
        Value::Map(map) => Ok(map),
        other => Err(Error::invalid_argument(format!(
            "document data must be an object, got {other:?}"
        ))),
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Double(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => Value::Map(
                map.into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Integer(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
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

impl From<DateTime<Utc>> for Value {
    fn from(time: DateTime<Utc>) -> Self {
        Value::Timestamp(time.into())
    }
}

impl From<DocumentData> for Value {
    fn from(map: DocumentData) -> Self {
        Value::Map(map)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_contains_sentinel() {
        assert!(Value::Delete.contains_sentinel());
        assert!(Value::from(vec![Value::ServerTimestamp]).contains_sentinel());
        let mut inner = DocumentData::new();
        inner.insert("ts".to_string(), Value::ServerTimestamp);
        assert!(Value::Array(vec![Value::Map(inner)]).contains_sentinel());
        assert!(!Value::from(json!({"a": [1, {"b": null}]})).contains_sentinel());
    }

    #[test]
    fn test_from_json() {
        let data = data_from_json(json!({
            "name": "New York City",
            "population": 8_400_000,
            "area": 783.8,
            "tags": ["big", "apple"],
            "mayor": null,
            "address": { "state": "NY" }
        }))
        .unwrap();

        assert_eq!(data["name"], Value::from("New York City"));
        assert_eq!(data["population"], Value::Integer(8_400_000));
        assert_eq!(data["area"], Value::Double(783.8));
        assert_eq!(data["mayor"], Value::Null);
        assert_eq!(
            get_field(&data, &FieldPath::parse("address.state").unwrap()),
            Some(&Value::from("NY"))
        );
        assert!(get_field(&data, &FieldPath::parse("name.first").unwrap()).is_none());
    }

    #[test]
    fn test_data_from_json_requires_object() {
        assert!(data_from_json(json!([1, 2])).is_err());
    }

    #[test]
    fn test_field_order_is_preserved() {
        let data = data_from_json(json!({"b": 1, "a": 2, "c": 3})).unwrap();
        let keys: Vec<&str> = data.keys().map(String::as_str).collect();
        // relies on serde_json's preserve_order feature (set in the workspace)
        assert_eq!(keys, vec!["b", "a", "c"]);
    }
}
