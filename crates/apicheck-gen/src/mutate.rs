//! Deliberate payload corruption for negative tests.
//!
//! Paths are dotted (`prescriber.licenseNumber`). Mutations that need a
//! field to exist fail with [`MutationError::PathNotFound`] rather than
//! silently doing nothing, so a typo in a test never produces a vacuous pass.

use apicheck_core::{ApiError, FieldType, Schema};
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MutationError {
    #[error("no value at '{path}'")]
    PathNotFound { path: String },

    #[error("'{path}' has no maxLength constraint")]
    NoMaxLength { path: String },

    #[error("'{path}' is not inside an object")]
    NotAnObject { path: String },
}

impl From<MutationError> for ApiError {
    fn from(err: MutationError) -> Self {
        ApiError::Configuration(format!("invalid mutation: {err}"))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Delete the field.
    RemoveField(String),
    /// Overwrite (or create) the field with a value.
    SetField(String, Value),
    /// Replace the field with a string one character over its `maxLength`.
    ExceedMaxLength(String),
    /// Replace the field with a value of a different JSON type.
    WrongType(String),
    /// Add a field the schema does not declare.
    AddUnknownField(String),
}

impl Mutation {
    pub fn remove(path: impl Into<String>) -> Self {
        Self::RemoveField(path.into())
    }

    pub fn set(path: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::SetField(path.into(), value.into())
    }

    pub fn exceed_max_length(path: impl Into<String>) -> Self {
        Self::ExceedMaxLength(path.into())
    }

    pub fn wrong_type(path: impl Into<String>) -> Self {
        Self::WrongType(path.into())
    }

    pub fn unknown_field(path: impl Into<String>) -> Self {
        Self::AddUnknownField(path.into())
    }

    pub fn path(&self) -> &str {
        match self {
            Self::RemoveField(p)
            | Self::SetField(p, _)
            | Self::ExceedMaxLength(p)
            | Self::WrongType(p)
            | Self::AddUnknownField(p) => p,
        }
    }

    /// Apply to `payload`. `schema` supplies limits and declared types.
    pub fn apply(&self, schema: &Schema, payload: &mut Value) -> Result<(), MutationError> {
        match self {
            Self::RemoveField(path) => {
                let (parent, leaf) = parent_mut(payload, path, false)?;
                parent
                    .remove(leaf)
                    .map(|_| ())
                    .ok_or_else(|| MutationError::PathNotFound { path: path.clone() })
            }
            Self::SetField(path, value) => {
                let (parent, leaf) = parent_mut(payload, path, true)?;
                parent.insert(leaf.to_string(), value.clone());
                Ok(())
            }
            Self::ExceedMaxLength(path) => {
                let limit = schema
                    .field(path)
                    .and_then(|f| f.max_length)
                    .ok_or_else(|| MutationError::NoMaxLength { path: path.clone() })?;
                let (parent, leaf) = parent_mut(payload, path, true)?;
                parent.insert(leaf.to_string(), Value::String("x".repeat(limit as usize + 1)));
                Ok(())
            }
            Self::WrongType(path) => {
                let declared = schema.field(path).map(|f| f.field_type);
                let (parent, leaf) = parent_mut(payload, path, false)?;
                let current = parent
                    .get(leaf)
                    .ok_or_else(|| MutationError::PathNotFound { path: path.clone() })?;
                let replacement = wrong_type_for(current, declared);
                parent.insert(leaf.to_string(), replacement);
                Ok(())
            }
            Self::AddUnknownField(path) => {
                let (parent, leaf) = parent_mut(payload, path, true)?;
                parent.insert(leaf.to_string(), Value::String("unexpected".into()));
                Ok(())
            }
        }
    }
}

/// Apply every mutation in order, stopping at the first failure.
pub fn apply_all(schema: &Schema, payload: &mut Value, mutations: &[Mutation]) -> Result<(), MutationError> {
    mutations.iter().try_for_each(|m| m.apply(schema, payload))
}

fn wrong_type_for(current: &Value, declared: Option<FieldType>) -> Value {
    match declared {
        Some(FieldType::String) => Value::from(12345),
        Some(FieldType::Integer | FieldType::Number) => Value::String("not-a-number".into()),
        Some(FieldType::Boolean) => Value::String("not-a-boolean".into()),
        Some(FieldType::Object | FieldType::Array) => Value::String("unexpected".into()),
        None => match current {
            Value::String(_) => Value::from(12345),
            Value::Number(_) | Value::Bool(_) | Value::Null => Value::String("unexpected".into()),
            Value::Object(_) | Value::Array(_) => Value::Bool(true),
        },
    }
}

/// Parent object of the last segment of `path`, plus that segment. With
/// `create`, missing (or null) intermediate objects are created.
fn parent_mut<'v, 'p>(
    payload: &'v mut Value,
    path: &'p str,
    create: bool,
) -> Result<(&'v mut Map<String, Value>, &'p str), MutationError> {
    let (parents, leaf) = match path.rsplit_once('.') {
        Some((parents, leaf)) => (Some(parents), leaf),
        None => (None, path),
    };

    let mut current = payload;
    for segment in parents.into_iter().flat_map(|p| p.split('.')) {
        let Value::Object(map) = current else {
            return Err(MutationError::NotAnObject { path: path.to_string() });
        };
        if create && !map.get(segment).is_some_and(Value::is_object) {
            map.insert(segment.to_string(), Value::Object(Map::new()));
        }
        current = map
            .get_mut(segment)
            .ok_or_else(|| MutationError::PathNotFound { path: path.to_string() })?;
    }

    match current {
        Value::Object(map) => Ok((map, leaf)),
        _ => Err(MutationError::NotAnObject { path: path.to_string() }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apicheck_core::FieldSchema;
    use serde_json::json;

    fn schema() -> Schema {
        Schema::object()
            .property("name", FieldSchema::string().with_max_length(5))
            .property("count", FieldSchema::integer())
            .property(
                "prescriber",
                FieldSchema::object(
                    Schema::object().property("licenseNumber", FieldSchema::string().with_max_length(3)),
                ),
            )
    }

    fn payload() -> Value {
        json!({"name": "abc", "count": 2, "prescriber": {"licenseNumber": "L1"}})
    }

    #[test]
    fn remove_nested_field() {
        let mut p = payload();
        Mutation::remove("prescriber.licenseNumber").apply(&schema(), &mut p).unwrap();
        assert_eq!(p["prescriber"], json!({}));
    }

    #[test]
    fn remove_missing_field_is_an_error() {
        let mut p = payload();
        let err = Mutation::remove("ghost").apply(&schema(), &mut p).unwrap_err();
        assert_eq!(err, MutationError::PathNotFound { path: "ghost".into() });
    }

    #[test]
    fn set_creates_parents() {
        let mut p = json!({});
        Mutation::set("a.b.c", 1).apply(&schema(), &mut p).unwrap();
        assert_eq!(p, json!({"a": {"b": {"c": 1}}}));
    }

    #[test]
    fn exceed_max_length_uses_limit_plus_one() {
        let mut p = payload();
        Mutation::exceed_max_length("prescriber.licenseNumber")
            .apply(&schema(), &mut p)
            .unwrap();
        assert_eq!(p["prescriber"]["licenseNumber"], "xxxx");

        let err = Mutation::exceed_max_length("count").apply(&schema(), &mut p).unwrap_err();
        assert!(matches!(err, MutationError::NoMaxLength { .. }));
    }

    #[test]
    fn wrong_type_follows_declared_type() {
        let mut p = payload();
        apply_all(
            &schema(),
            &mut p,
            &[Mutation::wrong_type("name"), Mutation::wrong_type("count")],
        )
        .unwrap();
        assert!(p["name"].is_number());
        assert!(p["count"].is_string());
    }

    #[test]
    fn unknown_field_is_added() {
        let mut p = payload();
        Mutation::unknown_field("surprise").apply(&schema(), &mut p).unwrap();
        assert_eq!(p["surprise"], "unexpected");
    }

    #[test]
    fn scalar_parent_is_rejected() {
        let mut p = payload();
        let err = Mutation::remove("name.inner").apply(&schema(), &mut p).unwrap_err();
        assert!(matches!(err, MutationError::NotAnObject { .. }));
    }
}
