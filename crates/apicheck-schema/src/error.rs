//! Registry and compilation errors.

use apicheck_core::ApiError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SchemaError {
    /// No schema registered under this name.
    #[error("schema '{name}' is not registered")]
    NotFound { name: String },

    /// A schema with this name already exists; registered schemas are never replaced.
    #[error("schema '{name}' is already registered")]
    AlreadyRegistered { name: String },

    /// `extends` chain loops back on itself.
    #[error("schema composition cycle: {}", chain.join(" -> "))]
    CompositionCycle { chain: Vec<String> },

    /// A schema file could not be read or parsed.
    #[error("schema load error for '{path}': {reason}")]
    Load { path: String, reason: String },

    /// The lowered JSON Schema was rejected by the validator backend.
    #[error("validator build error for schema '{name}': {reason}")]
    Compile { name: String, reason: String },
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        ApiError::Configuration(err.to_string())
    }
}
