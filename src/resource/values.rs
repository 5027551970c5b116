//! Filter value parsing: splitting a raw value list and checking each value against the field type.

use crate::schema::FieldType;
use chrono::DateTime;
use regex::Regex;
use serde_json::Value;
use std::sync::LazyLock;

// quoted tokens keep their inner whitespace
static VALUE_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""([^"]*)"|'([^']*)'|(\S+)"#).expect("value token pattern"));

/// Split `(a "b c" 'd')` (parentheses optional) into values. `None` when the list is
/// empty or any value is blank or a stray parenthesis.
pub(crate) fn split_values(raw: &str) -> Option<Vec<String>> {
    let mut inner = raw.trim();
    inner = inner.strip_prefix('(').unwrap_or(inner);
    inner = inner.strip_suffix(')').unwrap_or(inner);

    let mut values = Vec::new();
    for caps in VALUE_TOKEN.captures_iter(inner) {
        let value = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        if matches!(value.trim(), "" | "(" | ")" | "()") {
            return None;
        }
        values.push(value.to_string());
    }

    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// Typed argument for a value, or `None` if it does not fit the field type.
pub(crate) fn typed_value(value: &str, kind: FieldType) -> Option<Value> {
    match kind {
        FieldType::Numeric => {
            if let Ok(n) = value.parse::<i64>() {
                return Some(Value::Number(n.into()));
            }
            let f = value.parse::<f64>().ok()?;
            serde_json::Number::from_f64(f).map(Value::Number)
        }
        FieldType::Boolean => match value {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        FieldType::Date => DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|_| Value::String(value.to_string())),
        FieldType::String => Some(Value::String(value.to_string())),
    }
}
