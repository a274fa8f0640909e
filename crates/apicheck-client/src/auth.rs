//! Token endpoints.
//!
//! | Kind   | Request                                                        | Token field             |
//! |--------|----------------------------------------------------------------|-------------------------|
//! | JWT    | `POST {JWT_AUTH_URL}` JSON `{loginName, password, providerCode}` | `token` or `access_token` |
//! | Bearer | `POST {BEARER_AUTH_URL}?loginName=..&password=..[&providerCode=..]` | `Token` or `access_token` |
//!
//! Both read an optional `expires_in` (seconds). Passwords and query
//! strings never reach the logs.

use std::sync::Arc;

use apicheck_core::ApiError;
use serde::Serialize;
use serde_json::Value;
use url::Url;

use crate::config::{Credentials, HarnessConfig};
use crate::credential::{Credential, TokenKind};
use crate::response::transport_error;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JwtLogin<'a> {
    login_name: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider_code: Option<&'a str>,
}

/// Fetches fresh tokens from the configured auth endpoints.
#[derive(Debug, Clone)]
pub struct TokenProvider {
    http: reqwest::Client,
    config: Arc<HarnessConfig>,
}

impl TokenProvider {
    pub fn new(http: reqwest::Client, config: Arc<HarnessConfig>) -> Self {
        Self { http, config }
    }

    /// Obtain a new credential of `kind` for `credentials`.
    ///
    /// A configured static token short-circuits the Bearer flow.
    pub async fn fetch(&self, kind: TokenKind, credentials: &Credentials) -> Result<Credential, ApiError> {
        match kind {
            TokenKind::Jwt => self.fetch_jwt(credentials).await,
            TokenKind::Bearer => match self.config.static_token.as_ref() {
                Some(token) => {
                    tracing::info!("using static BEARER_TOKEN");
                    Ok(Credential::static_token(TokenKind::Bearer, token.as_str()))
                }
                None => self.fetch_bearer(credentials).await,
            },
        }
    }

    async fn fetch_jwt(&self, credentials: &Credentials) -> Result<Credential, ApiError> {
        let url = self
            .config
            .jwt_auth_url
            .clone()
            .ok_or_else(|| ApiError::Configuration("JWT_AUTH_URL is not configured".into()))?;
        let (username, password) = login_pair(credentials, TokenKind::Jwt)?;

        tracing::info!(url = %url, user = username, "fetching JWT token");
        let body = JwtLogin {
            login_name: username,
            password,
            provider_code: credentials.provider_code.as_deref(),
        };
        let resp = self
            .http
            .post(url.clone())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| transport_error("POST", url.as_str(), &e))?;

        let reply = read_token_body(resp, url.as_str(), username, TokenKind::Jwt).await?;
        let token = reply.token(&["token", "access_token"], url.as_str(), username, TokenKind::Jwt)?;
        tracing::info!("fetched JWT token");
        Ok(Credential::from_expires_in(TokenKind::Jwt, token, expires_in(&reply.data)))
    }

    async fn fetch_bearer(&self, credentials: &Credentials) -> Result<Credential, ApiError> {
        let base = self
            .config
            .bearer_auth_url
            .clone()
            .ok_or_else(|| ApiError::Configuration("BEARER_AUTH_URL is not configured".into()))?;
        let (username, password) = login_pair(credentials, TokenKind::Bearer)?;

        let mut url = base.clone();
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("loginName", username);
            query.append_pair("password", password);
            if let Some(code) = credentials.provider_code.as_deref() {
                query.append_pair("providerCode", code);
            }
        }

        // `base` carries no credentials; `url` must never be logged.
        let shown = redacted(&base);
        tracing::info!(url = %shown, user = username, "fetching Bearer token");
        let resp = self
            .http
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| transport_error("POST", &shown, &e.without_url()))?;

        let reply = read_token_body(resp, &shown, username, TokenKind::Bearer).await?;
        let token = reply.token(&["Token", "access_token"], &shown, username, TokenKind::Bearer)?;
        tracing::info!("fetched Bearer token");
        Ok(Credential::from_expires_in(TokenKind::Bearer, token, expires_in(&reply.data)))
    }
}

fn login_pair(credentials: &Credentials, kind: TokenKind) -> Result<(&str, &str), ApiError> {
    match (credentials.username.as_deref(), credentials.password.as_deref()) {
        (Some(u), Some(p)) if !u.is_empty() && !p.is_empty() => Ok((u, p.as_str())),
        _ => Err(ApiError::Configuration(format!(
            "username and password are required for {kind} token fetch"
        ))),
    }
}

/// A successful token response, parsed.
struct TokenReply {
    status: u16,
    body: String,
    data: Value,
}

impl TokenReply {
    /// The first non-empty string among `keys`.
    fn token(&self, keys: &[&str], url: &str, username: &str, kind: TokenKind) -> Result<String, ApiError> {
        string_field(&self.data, keys).ok_or_else(|| {
            tracing::error!(status = self.status, url, "{kind} token missing from response");
            ApiError::Request {
                method: "POST".into(),
                url: url.to_string(),
                status: Some(self.status),
                body: self.body.clone(),
                message: format!(
                    "{kind} token not found in response for {username} (expected '{}' field)",
                    keys.join("' or '")
                ),
                transport: None,
            }
        })
    }
}

async fn read_token_body(
    resp: reqwest::Response,
    url: &str,
    username: &str,
    kind: TokenKind,
) -> Result<TokenReply, ApiError> {
    let status = resp.status().as_u16();
    let body = resp
        .text()
        .await
        .map_err(|e| transport_error("POST", url, &e.without_url()))?;
    if !(200..300).contains(&status) {
        tracing::error!(status, url, "{kind} token request rejected");
        return Err(ApiError::Request {
            method: "POST".into(),
            url: url.to_string(),
            status: Some(status),
            body,
            message: format!("failed to fetch {kind} token for {username}"),
            transport: None,
        });
    }
    match serde_json::from_str(&body) {
        Ok(data) => Ok(TokenReply { status, body, data }),
        Err(e) => Err(ApiError::Parse {
            method: "POST".into(),
            url: url.to_string(),
            status,
            body,
            reason: e.to_string(),
        }),
    }
}

fn string_field(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| data.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn expires_in(data: &Value) -> Option<i64> {
    data.get("expires_in").and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_f64().map(|f| f as i64))
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    })
}

fn redacted(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    let _ = shown.set_password(None);
    shown.to_string()
}
