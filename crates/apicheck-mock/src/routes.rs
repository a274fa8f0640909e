//! Route definitions for the mock API.
//!
//! | Method | Path | Behaviour |
//! |--------|------|-----------|
//! | GET    | `/health` | 200 |
//! | POST   | `/api/login` | field checks, then `testData/testData` → 200 |
//! | POST   | `/api/register` | `user-register-request` → 201 |
//! | POST   | `/auth/jwt`, `/auth/bearer` | issue tokens |
//! | POST   | `/api/resources` | `resource-create-request` → 201 with `id`, `createdAt` |
//! | GET/PUT/DELETE | `/api/resources/{id}` | PUT checks `resource-update-request` |
//! | POST   | `/medications` | token required; `medication-request` → 201 with `formId` |
//! | GET/PUT/DELETE | `/medications/{id}` | token required |
//!
//! Other methods on known paths answer 405; unknown paths 404.

use apicheck_core::{Keyword, Violation};
use apicheck_schema::catalog;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::auth::{bearer_token, jwt_token, require_token};
use crate::error::MockError;
use crate::store::{AppState, MOCK_PASSWORD, MOCK_USERNAME};

/// Fields the server owns on stored records; clients cannot overwrite them.
const RESOURCE_SERVER_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];
const MEDICATION_SERVER_FIELDS: [&str; 3] = ["formId", "createdAt", "updatedAt"];

/// Build the complete router.
pub fn router(state: AppState) -> Router {
    let medications = Router::new()
        .route("/medications", post(medication_create))
        .route(
            "/medications/{id}",
            get(medication_get).put(medication_update).delete(medication_delete),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_token));

    Router::new()
        .route("/health", get(health))
        .route("/api/login", post(login))
        .route("/api/register", post(register))
        .route("/auth/jwt", post(jwt_token))
        .route("/auth/bearer", post(bearer_token))
        .route("/api/resources", post(resource_create))
        .route(
            "/api/resources/{id}",
            get(resource_get).put(resource_update).delete(resource_delete),
        )
        .merge(medications)
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn validated(state: &AppState, schema: &str, body: &Value) -> Result<(), MockError> {
    let result = state.validate(schema, body)?;
    if result.valid {
        Ok(())
    } else {
        tracing::info!(schema, violations = %result.summary(), "rejecting request body");
        Err(MockError::Invalid(result.violations))
    }
}

fn as_object(body: Value) -> Map<String, Value> {
    match body {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// `base` overlaid with `patch`, ignoring server-owned fields in `patch`.
fn merged(base: &Value, patch: &Value, server_fields: &[&str]) -> Value {
    let mut out = as_object(base.clone());
    if let Value::Object(patch) = patch {
        for (k, v) in patch {
            if !server_fields.contains(&k.as_str()) {
                out.insert(k.clone(), v.clone());
            }
        }
    }
    Value::Object(out)
}

fn without(record: &Value, fields: &[&str]) -> Value {
    let mut out = as_object(record.clone());
    for f in fields {
        out.remove(*f);
    }
    Value::Object(out)
}

// ── Health ──────────────────────────────────────────────────────────

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

// ── Login ───────────────────────────────────────────────────────────

/// First applicable login message, checked in the order the API reports
/// them: presence, then username length, then password length.
fn login_failure(violations: &[Violation]) -> Option<&'static str> {
    let at = |path: &str, keyword: Keyword| violations.iter().any(|v| v.path == path && v.keyword == keyword);

    let missing = violations.iter().any(|v| v.keyword == Keyword::Required)
        || at("/username", Keyword::Type)
        || at("/password", Keyword::Type)
        || at("/username", Keyword::MinLength)
        || at("", Keyword::Type);
    if missing {
        Some("both are required for login")
    } else if at("/username", Keyword::MaxLength) {
        Some("user name can not be more than 10 character")
    } else if at("/password", Keyword::MinLength) {
        Some("password can not be less than 5 character")
    } else {
        None
    }
}

async fn login(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, MockError> {
    let Json(body) = body?;
    let result = state.validate(catalog::LOGIN_REQUEST, &body)?;
    if let Some(message) = login_failure(&result.violations) {
        return Err(MockError::BadRequest(message.into()));
    }

    let username = body.get("username").and_then(Value::as_str);
    let password = body.get("password").and_then(Value::as_str);
    if username == Some(MOCK_USERNAME) && password == Some(MOCK_PASSWORD) {
        Ok((StatusCode::OK, Json(json!({ "message": "Login successful" }))).into_response())
    } else {
        Err(MockError::Unauthorized("Invalid credentials".into()))
    }
}

// ── Registration ────────────────────────────────────────────────────

async fn register(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, MockError> {
    let Json(user) = body?;
    validated(&state, catalog::USER_REGISTER_REQUEST, &user)?;

    let key = user
        .get("email")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    state.users().insert(key, user.clone());
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User registered successfully!", "user": user })),
    )
        .into_response())
}

// ── Resources ───────────────────────────────────────────────────────

async fn resource_create(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, MockError> {
    let Json(body) = body?;
    validated(&state, catalog::RESOURCE_CREATE_REQUEST, &body)?;

    let id = Uuid::new_v4().to_string();
    let mut record = as_object(without(&body, &RESOURCE_SERVER_FIELDS));
    record.insert("id".into(), Value::String(id.clone()));
    record.insert("createdAt".into(), Value::String(now()));
    let record = Value::Object(record);

    state.resources().insert(id, record.clone());
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

async fn resource_get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, MockError> {
    state
        .resources()
        .get(&id)
        .map(|r| Json(r.value().clone()))
        .ok_or_else(|| MockError::NotFound("Resource not found".into()))
}

async fn resource_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, MockError> {
    let Json(body) = body?;
    let existing = state
        .resources()
        .get(&id)
        .map(|r| r.value().clone())
        .ok_or_else(|| MockError::NotFound("Resource not found".into()))?;

    // The stored record minus the previous update's audit fields, so every
    // PUT has to supply its own.
    let base = without(&existing, &["updatedBy", "updateReason"]);
    let candidate = merged(&base, &body, &RESOURCE_SERVER_FIELDS);
    validated(&state, catalog::RESOURCE_UPDATE_REQUEST, &candidate)?;

    let mut record = as_object(candidate);
    record.insert("updatedAt".into(), Value::String(now()));
    let record = Value::Object(record);
    state.resources().insert(id, record.clone());
    Ok(Json(record))
}

async fn resource_delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, MockError> {
    state
        .resources()
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| MockError::NotFound("Resource not found".into()))
}

// ── Medications ─────────────────────────────────────────────────────

async fn medication_create(
    State(state): State<AppState>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, MockError> {
    let Json(body) = body?;
    validated(&state, catalog::MEDICATION_REQUEST, &body)?;

    let form_id = Uuid::new_v4().to_string();
    let mut record = as_object(body);
    record.insert("formId".into(), Value::String(form_id.clone()));
    record.insert("createdAt".into(), Value::String(now()));
    let record = Value::Object(record);

    state.medications().insert(form_id, record.clone());
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

async fn medication_get(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<Value>, MockError> {
    state
        .medications()
        .get(&id)
        .map(|r| Json(r.value().clone()))
        .ok_or_else(|| MockError::NotFound("Medication not found".into()))
}

async fn medication_update(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Value>, MockError> {
    let Json(body) = body?;
    let existing = state
        .medications()
        .get(&id)
        .map(|r| r.value().clone())
        .ok_or_else(|| MockError::NotFound("Medication not found".into()))?;

    let request = merged(&without(&existing, &MEDICATION_SERVER_FIELDS), &body, &MEDICATION_SERVER_FIELDS);
    validated(&state, catalog::MEDICATION_REQUEST, &request)?;

    let mut record = as_object(request);
    record.insert("formId".into(), Value::String(id.clone()));
    if let Some(created) = existing.get("createdAt") {
        record.insert("createdAt".into(), created.clone());
    }
    record.insert("updatedAt".into(), Value::String(now()));
    let record = Value::Object(record);
    state.medications().insert(id, record.clone());
    Ok(Json(record))
}

async fn medication_delete(State(state): State<AppState>, Path(id): Path<String>) -> Result<StatusCode, MockError> {
    state
        .medications()
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| MockError::NotFound("Medication not found".into()))
}

// ── Fallback ────────────────────────────────────────────────────────

async fn not_found() -> MockError {
    MockError::NotFound("Not found".into())
}
