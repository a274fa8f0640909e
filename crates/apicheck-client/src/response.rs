//! Buffered responses and the assertions tests run against them.

use std::ops::RangeInclusive;

use apicheck_core::{ApiError, TransportFailure};
use apicheck_schema::{CoercionPolicy, SchemaRegistry};
use reqwest::header::{HeaderMap, CONTENT_LENGTH};
use serde_json::Value;

/// A completed exchange with its body fully read.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub method: String,
    pub url: String,
    pub status: u16,
    pub headers: HeaderMap,
    pub body: String,
}

impl ApiResponse {
    /// Buffer a reqwest response.
    pub async fn from_reqwest(method: &str, resp: reqwest::Response) -> Result<Self, ApiError> {
        let url = resp.url().to_string();
        let status = resp.status().as_u16();
        let headers = resp.headers().clone();
        let body = resp
            .text()
            .await
            .map_err(|e| transport_error(method, &url, &e))?;
        Ok(Self {
            method: method.to_string(),
            url,
            status,
            headers,
            body,
        })
    }

    /// 204, or an explicit `content-length: 0`.
    pub fn is_empty_body(&self) -> bool {
        self.status == 204
            || self
                .headers
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v.trim() == "0")
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value, ApiError> {
        serde_json::from_str(&self.body).map_err(|e| ApiError::Parse {
            method: self.method.clone(),
            url: self.url.clone(),
            status: self.status,
            body: self.body.clone(),
            reason: e.to_string(),
        })
    }
}

/// One acceptable status or a set of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectedStatus {
    One(u16),
    AnyOf(Vec<u16>),
    Range(RangeInclusive<u16>),
}

impl ExpectedStatus {
    pub fn matches(&self, status: u16) -> bool {
        match self {
            Self::One(s) => *s == status,
            Self::AnyOf(set) => set.contains(&status),
            Self::Range(range) => range.contains(&status),
        }
    }
}

impl std::fmt::Display for ExpectedStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::One(s) => write!(f, "{s}"),
            Self::AnyOf(set) => {
                let parts: Vec<String> = set.iter().map(u16::to_string).collect();
                f.write_str(&parts.join(" or "))
            }
            Self::Range(range) => write!(f, "{}..={}", range.start(), range.end()),
        }
    }
}

impl From<u16> for ExpectedStatus {
    fn from(status: u16) -> Self {
        Self::One(status)
    }
}

impl<const N: usize> From<[u16; N]> for ExpectedStatus {
    fn from(set: [u16; N]) -> Self {
        Self::AnyOf(set.to_vec())
    }
}

impl From<&[u16]> for ExpectedStatus {
    fn from(set: &[u16]) -> Self {
        Self::AnyOf(set.to_vec())
    }
}

impl From<RangeInclusive<u16>> for ExpectedStatus {
    fn from(range: RangeInclusive<u16>) -> Self {
        Self::Range(range)
    }
}

/// Fail with a `Request` error unless the status is one of `expected`.
pub fn expect_status(resp: &ApiResponse, expected: impl Into<ExpectedStatus>) -> Result<(), ApiError> {
    let expected = expected.into();
    if expected.matches(resp.status) {
        tracing::info!(method = %resp.method, url = %resp.url, status = resp.status, %expected, "status matches");
        return Ok(());
    }
    tracing::error!(
        method = %resp.method,
        url = %resp.url,
        status = resp.status,
        %expected,
        body = %resp.body,
        "unexpected status"
    );
    Err(ApiError::unexpected_status(
        resp.method.clone(),
        resp.url.clone(),
        resp.status,
        resp.body.clone(),
        &expected.to_string(),
    ))
}

/// Fail unless the status is 2xx.
pub fn expect_successful(resp: &ApiResponse) -> Result<(), ApiError> {
    expect_status(resp, 200..=299)
}

/// Validate the body against the named schema, returning the parsed value.
///
/// Empty bodies become `None` when the schema accepts `null`.
pub fn validate_body(
    resp: &ApiResponse,
    registry: &SchemaRegistry,
    schema_name: &str,
) -> Result<Option<Value>, ApiError> {
    let compiled = registry.validator(schema_name, CoercionPolicy::Strict)?;

    let instance = if resp.is_empty_body() {
        Value::Null
    } else {
        match resp.json() {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(method = %resp.method, url = %resp.url, status = resp.status, schema = schema_name, "response body is not JSON");
                return Err(e);
            }
        }
    };

    let result = compiled.check(&instance);
    if !result.valid {
        tracing::error!(
            method = %resp.method,
            url = %resp.url,
            status = resp.status,
            schema = schema_name,
            violations = %result.summary(),
            "response body failed schema validation"
        );
        let message = if instance.is_null() {
            format!("schema '{schema_name}' does not allow an empty response")
        } else {
            format!("response does not match schema '{schema_name}'")
        };
        return Err(ApiError::Validation {
            method: resp.method.clone(),
            url: resp.url.clone(),
            schema: schema_name.to_string(),
            violations: result.violations,
            message,
        });
    }

    tracing::info!(method = %resp.method, url = %resp.url, status = resp.status, schema = schema_name, "response body validated");
    Ok(if instance.is_null() { None } else { Some(instance) })
}

/// Map a reqwest failure that produced no status.
pub(crate) fn transport_error(method: &str, url: &str, err: &reqwest::Error) -> ApiError {
    let failure = if err.is_timeout() {
        TransportFailure::Timeout
    } else if err.is_connect() {
        TransportFailure::Connect
    } else {
        TransportFailure::Other
    };
    tracing::error!(method, url, %failure, "request failed before a response");
    ApiError::transport(method, url, failure, err.to_string())
}
