//! # Mock Error
//!
//! Maps handler failures to the JSON error bodies the API under test
//! returns: `{error: message}` or `{errors: [violation, ...]}`.

use apicheck_core::Violation;
use apicheck_schema::SchemaError;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MockError {
    /// Malformed request that never reached schema validation.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Body failed schema validation.
    #[error("{} violation(s)", .0.len())]
    Invalid(Vec<Violation>),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<JsonRejection> for MockError {
    fn from(rejection: JsonRejection) -> Self {
        MockError::BadRequest(rejection.body_text())
    }
}

impl From<SchemaError> for MockError {
    fn from(err: SchemaError) -> Self {
        MockError::Internal(err.to_string())
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            MockError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            MockError::Invalid(violations) => (StatusCode::BAD_REQUEST, json!({ "errors": violations })),
            MockError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            MockError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            MockError::Internal(msg) => {
                tracing::error!(error = %msg, "mock handler failed");
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": msg }))
            }
        };
        (status, Json(body)).into_response()
    }
}
