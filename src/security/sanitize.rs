//! Request body sanitisation.
//!
//! Strings lose every `<` and `>` and are then trimmed. This breaks naive tag
//! injection only; it is not an HTML sanitiser. Objects are rebuilt with
//! sanitised values. Array elements are left untouched, including strings
//! and objects nested inside arrays.

use serde_json::{Map, Value};

/// Sanitise a request body. Idempotent.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(&s)),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, sanitize(value)))
                .collect::<Map<String, Value>>(),
        ),
        other => other,
    }
}

fn sanitize_str(s: &str) -> String {
    let stripped: String = s.chars().filter(|c| !matches!(c, '<' | '>')).collect();
    stripped.trim().to_owned()
}
