//! Lowering of the declarative model to a Draft 2020-12 JSON Schema.
//!
//! Only structural keywords are emitted. `dependentRequired` rules are
//! value-conditional and dotted, which JSON Schema's own `dependentRequired`
//! cannot express; they are evaluated by [`crate::dependency`] instead.

use apicheck_core::{FieldSchema, FieldType, Schema};
use serde_json::{json, Map, Number, Value};

pub(crate) const DRAFT_2020_12: &str = "https://json-schema.org/draft/2020-12/schema";

/// Lower a flattened schema. `extends` must already be resolved.
pub(crate) fn lower(schema: &Schema) -> Value {
    let mut root = lower_object(schema, schema.nullable);
    root.insert("$schema".into(), Value::String(DRAFT_2020_12.into()));
    Value::Object(root)
}

fn type_value(t: FieldType, nullable: bool) -> Value {
    if nullable {
        json!([t.as_str(), "null"])
    } else {
        Value::String(t.as_str().into())
    }
}

fn lower_object(schema: &Schema, nullable: bool) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("type".into(), type_value(FieldType::Object, nullable));

    let properties: Map<String, Value> = schema
        .properties
        .iter()
        .map(|(name, field)| (name.clone(), lower_field(field)))
        .collect();
    out.insert("properties".into(), Value::Object(properties));

    if !schema.required.is_empty() {
        out.insert("required".into(), json!(schema.required));
    }
    if !schema.additional_properties {
        out.insert("additionalProperties".into(), Value::Bool(false));
    }
    out
}

fn lower_field(field: &FieldSchema) -> Value {
    let mut out = match (&field.field_type, &field.schema) {
        (FieldType::Object, Some(nested)) => lower_object(nested, field.nullable),
        _ => {
            let mut m = Map::new();
            m.insert("type".into(), type_value(field.field_type, field.nullable));
            m
        }
    };

    if let Some(format) = field.format {
        out.insert("format".into(), Value::String(format.as_str().into()));
    }
    if let Some(n) = field.min_length {
        out.insert("minLength".into(), Value::from(n));
    }
    if let Some(n) = field.max_length {
        out.insert("maxLength".into(), Value::from(n));
    }
    if let Some(n) = field.minimum.and_then(number) {
        out.insert("minimum".into(), n);
    }
    if let Some(n) = field.maximum.and_then(number) {
        out.insert("maximum".into(), n);
    }
    if let Some(values) = &field.enum_values {
        let mut allowed = values.clone();
        if field.nullable && !allowed.contains(&Value::Null) {
            allowed.push(Value::Null);
        }
        out.insert("enum".into(), Value::Array(allowed));
    }
    if let Some(items) = &field.items {
        out.insert("items".into(), lower_field(items));
    }
    if let Some(n) = field.min_items {
        out.insert("minItems".into(), Value::from(n));
    }
    if let Some(n) = field.max_items {
        out.insert("maxItems".into(), Value::from(n));
    }
    Value::Object(out)
}

/// Whole bounds are emitted as integers so violation context reads `10`, not `10.0`.
fn number(f: f64) -> Option<Value> {
    if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(Value::from(f as i64))
    } else {
        Number::from_f64(f).map(Value::Number)
    }
}
