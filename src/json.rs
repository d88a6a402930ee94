//! serde_json interop.
//!
//! The surrounding server's result pipeline speaks `serde_json::Value`; this
//! module converts between that and the codec's own value model. Object key
//! order survives both directions (serde_json is built with `preserve_order`
//! for exactly this reason).

use crate::value::{Value, ValueMap};

/// Convert a JSON value into a codec value.
///
/// Numbers become `Int` when they fit a 64-bit signed integer and `Float`
/// otherwise. Object keys keep their order.
pub fn from_json(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                Value::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => Value::String(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(from_json).collect()),
        serde_json::Value::Object(entries) => {
            let mut map = ValueMap::with_capacity(entries.len());
            for (key, item) in entries {
                map.insert(key.clone(), from_json(item));
            }
            Value::Map(map)
        }
    }
}

/// Convert a codec value into a JSON value where one exists.
///
/// Bytes, structs, graph entities, temporal values, and the streaming
/// sentinel have no JSON shape and come back as `None`, as does a
/// non-finite float.
pub fn to_json(value: &Value) -> Option<serde_json::Value> {
    match value {
        Value::Null => Some(serde_json::Value::Null),
        Value::Bool(b) => Some(serde_json::Value::Bool(*b)),
        Value::Int(i) => Some(serde_json::Value::Number((*i).into())),
        Value::Float(f) => serde_json::Number::from_f64(*f).map(serde_json::Value::Number),
        Value::String(s) => Some(serde_json::Value::String(s.clone())),
        Value::List(items) => {
            let mut array = Vec::with_capacity(items.len());
            for item in items {
                array.push(to_json(item)?);
            }
            Some(serde_json::Value::Array(array))
        }
        Value::Map(map) => {
            let mut object = serde_json::Map::new();
            for (key, item) in map.iter() {
                object.insert(key.to_string(), to_json(item)?);
            }
            Some(serde_json::Value::Object(object))
        }
        _ => None,
    }
}
