//! Helpers over free-form field values.

use serde_json::Value;
use std::collections::BTreeMap;

/// A record's data payload, keyed by field slug.
pub type RecordData = BTreeMap<String, Value>;

/// Unwrap composite values to the array they carry.
///
/// Choice widgets such as tri-state answers persist `{"selected": [...]}`;
/// comparisons operate on the inner array.
pub fn unwrap_composite(value: &Value) -> &Value {
    match value {
        Value::Object(map) => match map.get("selected") {
            Some(inner @ Value::Array(_)) => inner,
            _ => value,
        },
        _ => value,
    }
}

/// Whether a value counts as "no answer".
pub fn is_empty_value(value: &Value) -> bool {
    match unwrap_composite(value) {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty() || map.values().all(is_empty_value),
        Value::Bool(_) | Value::Number(_) => false,
    }
}

/// Whether `data` holds a non-empty value for `slug`.
pub fn has_value(data: &RecordData, slug: &str) -> bool {
    data.get(slug).is_some_and(|v| !is_empty_value(v))
}
