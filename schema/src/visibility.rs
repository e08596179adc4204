//! Conditional visibility (`show_when`) evaluation.

use crate::value::{is_empty_value, unwrap_composite, RecordData};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison applied by a `show_when` rule.
///
/// Operator names outside the known set are kept verbatim and evaluated
/// with `contains_any` semantics, which is how schemas written before the
/// operator list was closed behave.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConditionOperator {
    Equals,
    NotEquals,
    Contains,
    ContainsAny,
    IsEmpty,
    IsNotEmpty,
    Legacy(String),
}

impl From<String> for ConditionOperator {
    fn from(s: String) -> Self {
        match s.as_str() {
            "equals" => Self::Equals,
            "not_equals" => Self::NotEquals,
            "contains" => Self::Contains,
            "contains_any" => Self::ContainsAny,
            "is_empty" => Self::IsEmpty,
            "is_not_empty" => Self::IsNotEmpty,
            _ => Self::Legacy(s),
        }
    }
}

impl From<ConditionOperator> for String {
    fn from(op: ConditionOperator) -> Self {
        match op {
            ConditionOperator::Equals => "equals".into(),
            ConditionOperator::NotEquals => "not_equals".into(),
            ConditionOperator::Contains => "contains".into(),
            ConditionOperator::ContainsAny => "contains_any".into(),
            ConditionOperator::IsEmpty => "is_empty".into(),
            ConditionOperator::IsNotEmpty => "is_not_empty".into(),
            ConditionOperator::Legacy(s) => s,
        }
    }
}

/// Show a field only when another field's current value satisfies a condition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShowWhen {
    /// Slug of the field this one depends on.
    pub field: String,
    pub operator: ConditionOperator,
    #[serde(default)]
    pub value: Value,
}

impl ShowWhen {
    pub fn new(field: impl Into<String>, operator: ConditionOperator, value: Value) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }

    /// Evaluate the rule against in-progress record data.
    pub fn is_satisfied(&self, data: &RecordData) -> bool {
        let actual = data.get(&self.field).map(unwrap_composite);
        let expected = &self.value;

        match &self.operator {
            ConditionOperator::Equals => actual.is_some_and(|v| v == expected),
            ConditionOperator::NotEquals => actual.map_or(true, |v| v != expected),
            ConditionOperator::Contains => match actual {
                Some(Value::Array(items)) => items.contains(expected),
                Some(v) => v == expected,
                None => false,
            },
            ConditionOperator::ContainsAny | ConditionOperator::Legacy(_) => {
                actual.is_some_and(|v| contains_any(v, expected))
            }
            ConditionOperator::IsEmpty => actual.map_or(true, is_empty_value),
            ConditionOperator::IsNotEmpty => actual.is_some_and(|v| !is_empty_value(v)),
        }
    }
}

/// True if any element of one side appears in the other.
///
/// Handles array/array, array/scalar, scalar/array and scalar/scalar.
pub fn contains_any(actual: &Value, expected: &Value) -> bool {
    match (actual, expected) {
        (Value::Array(left), Value::Array(right)) => left.iter().any(|v| right.contains(v)),
        (Value::Array(items), scalar) | (scalar, Value::Array(items)) => items.contains(scalar),
        (a, b) => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn data(pairs: &[(&str, Value)]) -> RecordData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn equals_is_strict() {
        let rule = ShowWhen::new("age", ConditionOperator::Equals, json!(17));
        assert!(rule.is_satisfied(&data(&[("age", json!(17))])));
        assert!(!rule.is_satisfied(&data(&[("age", json!("17"))])));
        assert!(!rule.is_satisfied(&data(&[])));
    }

    #[test]
    fn not_equals_holds_for_absent_value() {
        let rule = ShowWhen::new("status", ConditionOperator::NotEquals, json!("closed"));
        assert!(rule.is_satisfied(&data(&[])));
        assert!(!rule.is_satisfied(&data(&[("status", json!("closed"))])));
    }

    #[test]
    fn contains_on_array_or_scalar() {
        let rule = ShowWhen::new("tags", ConditionOperator::Contains, json!("custody"));
        assert!(rule.is_satisfied(&data(&[("tags", json!(["custody", "police"]))])));
        assert!(rule.is_satisfied(&data(&[("tags", json!("custody"))])));
        assert!(!rule.is_satisfied(&data(&[("tags", json!(["prison"]))])));
    }

    #[test]
    fn contains_unwraps_selected_composites() {
        let rule = ShowWhen::new("armed", ConditionOperator::Contains, json!("yes"));
        assert!(rule.is_satisfied(&data(&[("armed", json!({"selected": ["yes"]}))])));
        assert!(!rule.is_satisfied(&data(&[("armed", json!({"selected": ["unknown"]}))])));
    }

    #[test]
    fn contains_any_covers_every_shape() {
        assert!(contains_any(&json!(["a", "b"]), &json!(["c", "b"])));
        assert!(contains_any(&json!(["a", "b"]), &json!("a")));
        assert!(contains_any(&json!("a"), &json!(["x", "a"])));
        assert!(contains_any(&json!("a"), &json!("a")));
        assert!(!contains_any(&json!(["a"]), &json!(["b"])));
    }

    #[test]
    fn emptiness_operators() {
        let empty = ShowWhen::new("notes", ConditionOperator::IsEmpty, Value::Null);
        let filled = ShowWhen::new("notes", ConditionOperator::IsNotEmpty, Value::Null);
        assert!(empty.is_satisfied(&data(&[])));
        assert!(empty.is_satisfied(&data(&[("notes", json!([]))])));
        assert!(!filled.is_satisfied(&data(&[("notes", json!([]))])));
        assert!(filled.is_satisfied(&data(&[("notes", json!(["x"]))])));
    }

    #[test]
    fn unknown_operator_behaves_like_contains_any() {
        let rule: ShowWhen = serde_json::from_value(json!({
            "field": "kind",
            "operator": "in",
            "value": ["shooting", "restraint"]
        }))
        .unwrap();
        assert_eq!(rule.operator, ConditionOperator::Legacy("in".into()));
        assert!(rule.is_satisfied(&data(&[("kind", json!("restraint"))])));
        assert!(!rule.is_satisfied(&data(&[("kind", json!("illness"))])));
    }

    #[test]
    fn operator_round_trips_through_its_name() {
        let op: ConditionOperator = serde_json::from_value(json!("is_not_empty")).unwrap();
        assert_eq!(op, ConditionOperator::IsNotEmpty);
        assert_eq!(serde_json::to_value(op).unwrap(), json!("is_not_empty"));
    }
}
