use serde_json::{Map, Value};
use tracing::warn;

use crate::models::Schema;

/// Coerce `data` into exactly the shape of `defaults`.
///
/// - mapping templates keep every template key and drop everything else
/// - sequence templates keep sequence data, replacing anything else with `[]`;
///   a template item (the first element) is applied to every kept item
/// - scalar templates keep present, non-blank values and fall back to `""`
pub fn sanitize(data: &Value, defaults: &Value) -> Value {
    match defaults {
        Value::Object(template) => {
            let fields = data.as_object();
            let sanitized: Map<String, Value> = template
                .iter()
                .map(|(key, item_template)| {
                    let value = fields.and_then(|f| f.get(key)).unwrap_or(&Value::Null);
                    (key.clone(), sanitize(value, item_template))
                })
                .collect();
            Value::Object(sanitized)
        }
        Value::Array(template) => match (data, template.first()) {
            (Value::Array(items), Some(item_template)) => Value::Array(
                items.iter().map(|item| sanitize(item, item_template)).collect(),
            ),
            (Value::Array(items), None) => Value::Array(items.clone()),
            _ => Value::Array(Vec::new()),
        },
        scalar_template => sanitize_scalar(data, scalar_template),
    }
}

fn sanitize_scalar(data: &Value, template: &Value) -> Value {
    let wants_string = template.is_string();
    match data {
        Value::String(s) if !s.trim().is_empty() => data.clone(),
        Value::Number(n) if wants_string => Value::String(n.to_string()),
        Value::Bool(b) if wants_string => Value::String(b.to_string()),
        Value::Number(_) | Value::Bool(_) => data.clone(),
        _ => Value::String(String::new()),
    }
}

/// Sanitize `data` against `S::template()` and decode the result.
pub fn sanitize_into<S: Schema>(data: &Value) -> Result<S, serde_json::Error> {
    serde_json::from_value(sanitize(data, &S::template()))
}

/// Like [`sanitize_into`], but never fails: a record that still cannot be
/// decoded becomes `S::default()`.
pub fn conform<S: Schema>(data: &Value) -> S {
    sanitize_into(data).unwrap_or_else(|e| {
        warn!("Sanitized record did not decode, using empty default: {}", e);
        S::default()
    })
}
