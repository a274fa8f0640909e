//! # Error Types: API Error Taxonomy
//!
//! Every failure a test suite can observe surfaces as an [`ApiError`]. The
//! variants are deliberately distinct: an unexpected status is not a schema
//! violation, and an unparseable body is neither. Callers branch on
//! [`ApiError::kind`] instead of matching on message text.

use thiserror::Error;

use crate::violation::{summarize, Violation};

/// Discriminant of [`ApiError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Request,
    Validation,
    Parse,
    GenerationExhausted,
    Configuration,
}

/// How a request failed before any status was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportFailure {
    Timeout,
    Connect,
    Other,
}

impl std::fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Other => "transport",
        })
    }
}

fn render_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => code.to_string(),
        None => "no status".to_string(),
    }
}

/// Top-level error for the harness.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Unexpected status code, or the request never completed.
    #[error("{method} {url} failed ({}): {message}", render_status(status))]
    Request {
        method: String,
        url: String,
        status: Option<u16>,
        body: String,
        message: String,
        transport: Option<TransportFailure>,
    },

    /// Body parsed but did not satisfy the named schema.
    #[error(
        "{method} {url}: body does not match schema '{schema}' ({} violation(s): {})",
        violations.len(),
        summarize(violations)
    )]
    Validation {
        method: String,
        url: String,
        schema: String,
        violations: Vec<Violation>,
        message: String,
    },

    /// Body was not well-formed JSON.
    #[error("{method} {url} ({status}): response body is not valid JSON: {reason}")]
    Parse {
        method: String,
        url: String,
        status: u16,
        body: String,
        reason: String,
    },

    /// The generator could not produce a valid payload.
    #[error(
        "could not generate a valid '{schema}' payload after {attempts} attempt(s): {}",
        summarize(violations)
    )]
    GenerationExhausted {
        schema: String,
        attempts: u32,
        violations: Vec<Violation>,
    },

    /// A required setting was absent at the point of use.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Request { .. } => ErrorKind::Request,
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::GenerationExhausted { .. } => ErrorKind::GenerationExhausted,
            Self::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// HTTP status attached to the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Request { status, .. } => *status,
            Self::Parse { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Violations attached to the error; empty for kinds that carry none.
    pub fn violations(&self) -> &[Violation] {
        match self {
            Self::Validation { violations, .. } | Self::GenerationExhausted { violations, .. } => {
                violations
            }
            _ => &[],
        }
    }

    /// Unexpected-status error for a completed exchange.
    pub fn unexpected_status(
        method: impl Into<String>,
        url: impl Into<String>,
        status: u16,
        body: impl Into<String>,
        expected: &str,
    ) -> Self {
        Self::Request {
            method: method.into(),
            url: url.into(),
            status: Some(status),
            body: body.into(),
            message: format!("expected status {expected} but received {status}"),
            transport: None,
        }
    }

    /// Error for a request that never produced a status.
    pub fn transport(
        method: impl Into<String>,
        url: impl Into<String>,
        failure: TransportFailure,
        message: impl Into<String>,
    ) -> Self {
        Self::Request {
            method: method.into(),
            url: url.into(),
            status: None,
            body: String::new(),
            message: message.into(),
            transport: Some(failure),
        }
    }
}
