//! Input coercion.
//!
//! Responses are checked strictly. Request payloads read from fixture files
//! arrive as strings, so [`CoercionPolicy::Lenient`] converts them where the
//! schema declares a numeric or boolean field. Only exact `"true"`/`"false"`
//! become booleans; `"yes"`, `"1"` and friends stay strings.

use apicheck_core::{FieldSchema, FieldType, Schema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    /// Values are checked exactly as given.
    #[default]
    Strict,
    /// Numeric strings and `"true"`/`"false"` are converted before checking.
    Lenient,
}

/// Return a coerced copy of `instance`. Fields the schema does not declare
/// are left untouched.
pub fn coerce(schema: &Schema, instance: &Value) -> Value {
    match instance {
        Value::Object(map) => Value::Object(coerce_object(schema, map)),
        other => other.clone(),
    }
}

fn coerce_object(schema: &Schema, map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .map(|(key, value)| {
            let coerced = match schema.properties.get(key) {
                Some(field) => coerce_field(field, value),
                None => value.clone(),
            };
            (key.clone(), coerced)
        })
        .collect()
}

fn coerce_field(field: &FieldSchema, value: &Value) -> Value {
    match (field.field_type, value) {
        (FieldType::Integer, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or_else(|_| value.clone()),
        (FieldType::Number, Value::String(s)) => parse_number(s.trim()).unwrap_or_else(|| value.clone()),
        (FieldType::Boolean, Value::String(s)) => match s.as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => value.clone(),
        },
        (FieldType::Object, Value::Object(map)) => match &field.schema {
            Some(nested) => Value::Object(coerce_object(nested, map)),
            None => value.clone(),
        },
        (FieldType::Array, Value::Array(items)) => match &field.items {
            Some(item) => Value::Array(items.iter().map(|v| coerce_field(item, v)).collect()),
            None => value.clone(),
        },
        _ => value.clone(),
    }
}

fn parse_number(s: &str) -> Option<Value> {
    if let Ok(i) = s.parse::<i64>() {
        return Some(Value::from(i));
    }
    let f = s.parse::<f64>().ok().filter(|f| f.is_finite())?;
    Number::from_f64(f).map(Value::Number)
}
