//! In-memory storage backend using DashMap.
//!
//! Each collection (resources, medications, registered users) gets its own
//! `DashMap<String, Value>` keyed by the identifier the server assigned.
//! Issued tokens are remembered with their scheme and expiry so the
//! medication routes can check `Authorization` headers.

use std::sync::Arc;

use apicheck_core::ValidationResult;
use apicheck_schema::{CoercionPolicy, SchemaError, SchemaRegistry};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::Value;

/// Login accepted by `/api/login` and the token endpoints.
pub const MOCK_USERNAME: &str = "testData";
pub const MOCK_PASSWORD: &str = "testData";

/// Lifetime of issued tokens, in seconds.
pub const TOKEN_TTL_SECS: u64 = 3600;

/// Authorization scheme a token was issued for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Bearer,
    Jwt,
}

impl Scheme {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Bearer => "Bearer",
            Self::Jwt => "JWT",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct IssuedToken {
    scheme: Scheme,
    expires_at: DateTime<Utc>,
}

struct Inner {
    resources: DashMap<String, Value>,
    medications: DashMap<String, Value>,
    users: DashMap<String, Value>,
    tokens: DashMap<String, IssuedToken>,
    registry: SchemaRegistry,
}

/// Shared application state.
///
/// Cheaply cloneable via `Arc`; all clones share the same data.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<Inner>,
}

impl AppState {
    /// Empty stores validated against the built-in schema catalog.
    pub fn new() -> Result<Self, SchemaError> {
        Ok(Self::with_registry(SchemaRegistry::builtin()?))
    }

    pub fn with_registry(registry: SchemaRegistry) -> Self {
        Self {
            inner: Arc::new(Inner {
                resources: DashMap::new(),
                medications: DashMap::new(),
                users: DashMap::new(),
                tokens: DashMap::new(),
                registry,
            }),
        }
    }

    pub fn resources(&self) -> &DashMap<String, Value> {
        &self.inner.resources
    }

    pub fn medications(&self) -> &DashMap<String, Value> {
        &self.inner.medications
    }

    pub fn users(&self) -> &DashMap<String, Value> {
        &self.inner.users
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.inner.registry
    }

    /// Check a request body. String numbers and booleans from form-like
    /// clients are not coerced.
    pub fn validate(&self, schema: &str, body: &Value) -> Result<ValidationResult, SchemaError> {
        let compiled = self.inner.registry.validator(schema, CoercionPolicy::Strict)?;
        Ok(compiled.check(body))
    }

    /// Issue a token valid for [`TOKEN_TTL_SECS`].
    pub fn issue_token(&self, scheme: Scheme) -> String {
        self.issue_token_with_ttl(scheme, TOKEN_TTL_SECS)
    }

    /// Issue a token valid for `ttl_secs`. Expired tokens are dropped first.
    pub fn issue_token_with_ttl(&self, scheme: Scheme, ttl_secs: u64) -> String {
        let now = Utc::now();
        self.inner.tokens.retain(|_, issued| issued.expires_at > now);

        let secs = i64::try_from(ttl_secs).unwrap_or(i64::MAX).min(i64::MAX / 1000);
        let ttl = Duration::seconds(secs);
        let expires_at = now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let token = format!("mock-{}-{}", scheme.as_str().to_ascii_lowercase(), uuid::Uuid::new_v4());
        self.inner.tokens.insert(token.clone(), IssuedToken { scheme, expires_at });
        token
    }

    /// Whether `token` was issued by this server for `scheme` and is
    /// still live.
    pub fn token_matches(&self, scheme: Scheme, token: &str) -> bool {
        self.token_matches_at(scheme, token, Utc::now())
    }

    fn token_matches_at(&self, scheme: Scheme, token: &str, now: DateTime<Utc>) -> bool {
        let Some(issued) = self.inner.tokens.get(token).map(|t| *t) else {
            return false;
        };
        if issued.expires_at <= now {
            tracing::debug!(scheme = scheme.as_str(), "rejecting expired token");
            self.inner.tokens.remove(token);
            return false;
        }
        issued.scheme == scheme
    }

    /// Number of tokens currently remembered.
    pub fn live_tokens(&self) -> usize {
        self.inner.tokens.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_tokens_are_bound_to_scheme() {
        let state = AppState::new().unwrap();
        let token = state.issue_token(Scheme::Jwt);
        assert!(state.token_matches(Scheme::Jwt, &token));
        assert!(!state.token_matches(Scheme::Bearer, &token));
        assert!(!state.token_matches(Scheme::Jwt, "forged"));
    }

    #[test]
    fn expired_tokens_are_rejected_and_forgotten() {
        let state = AppState::new().unwrap();
        let token = state.issue_token_with_ttl(Scheme::Bearer, 60);
        let later = Utc::now() + Duration::seconds(61);
        assert!(state.token_matches(Scheme::Bearer, &token));
        assert!(!state.token_matches_at(Scheme::Bearer, &token, later));
        assert_eq!(state.live_tokens(), 0);
        assert!(!state.token_matches(Scheme::Bearer, &token));
    }

    #[test]
    fn issuing_prunes_expired_tokens() {
        let state = AppState::new().unwrap();
        state.issue_token_with_ttl(Scheme::Jwt, 0);
        state.issue_token_with_ttl(Scheme::Jwt, 0);
        let live = state.issue_token(Scheme::Jwt);
        assert_eq!(state.live_tokens(), 1);
        assert!(state.token_matches(Scheme::Jwt, &live));
    }

    #[test]
    fn clones_share_collections() {
        let state = AppState::new().unwrap();
        let clone = state.clone();
        clone.resources().insert("r-1".into(), serde_json::json!({"name": "x"}));
        assert!(state.resources().contains_key("r-1"));
    }
}
