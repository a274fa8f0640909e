//! Token issuance and the `Authorization` guard for protected routes.
//!
//! Routes:
//! - POST /auth/jwt: JSON `{loginName, password, providerCode?}` → `{token, expires_in}`
//! - POST /auth/bearer?loginName=..&password=.. → `{Token, expires_in}`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::MockError;
use crate::store::{AppState, Scheme, MOCK_PASSWORD, MOCK_USERNAME, TOKEN_TTL_SECS};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginParams {
    #[serde(default)]
    login_name: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    provider_code: Option<String>,
}

impl LoginParams {
    fn is_mock_user(&self) -> bool {
        self.login_name.as_deref() == Some(MOCK_USERNAME) && self.password.as_deref() == Some(MOCK_PASSWORD)
    }
}

pub async fn jwt_token(
    State(state): State<AppState>,
    body: Result<Json<LoginParams>, JsonRejection>,
) -> Result<Json<Value>, MockError> {
    let Json(params) = body?;
    if !params.is_mock_user() {
        tracing::warn!(user = ?params.login_name, "JWT login rejected");
        return Err(MockError::Unauthorized("Invalid credentials".into()));
    }
    let token = state.issue_token(Scheme::Jwt);
    tracing::info!(provider = ?params.provider_code, "issued JWT token");
    Ok(Json(json!({ "token": token, "expires_in": TOKEN_TTL_SECS })))
}

pub async fn bearer_token(
    State(state): State<AppState>,
    Query(params): Query<LoginParams>,
) -> Result<Json<Value>, MockError> {
    if !params.is_mock_user() {
        tracing::warn!(user = ?params.login_name, "Bearer login rejected");
        return Err(MockError::Unauthorized("Invalid credentials".into()));
    }
    let token = state.issue_token(Scheme::Bearer);
    tracing::info!(provider = ?params.provider_code, "issued Bearer token");
    Ok(Json(json!({ "Token": token, "expires_in": TOKEN_TTL_SECS })))
}

/// Reject requests whose `Authorization` header does not carry a token
/// this server issued under the same scheme.
pub async fn require_token(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let presented = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split_once(' '))
        .and_then(|(scheme, token)| {
            let scheme = match scheme {
                s if s.eq_ignore_ascii_case("bearer") => Scheme::Bearer,
                s if s.eq_ignore_ascii_case("jwt") => Scheme::Jwt,
                _ => return None,
            };
            Some((scheme, token.trim().to_string()))
        });

    match presented {
        Some((scheme, token)) if state.token_matches(scheme, &token) => next.run(req).await,
        Some(_) => MockError::Unauthorized("invalid token".into()).into_response(),
        None => MockError::Unauthorized("missing or malformed Authorization header".into()).into_response(),
    }
}
