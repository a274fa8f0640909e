//! Cached access tokens.
//!
//! [`CredentialCache`] holds at most one token. Its async mutex is held
//! across the fetch, so concurrent callers that find the slot empty or
//! stale wait for a single refresh instead of issuing their own.

use std::future::Future;
use std::sync::{Arc, OnceLock};

use apicheck_core::ApiError;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use zeroize::Zeroizing;

/// Seconds before expiry at which a token counts as expiring.
pub const REFRESH_BUFFER_SECS: i64 = 300;

/// Lifetime assumed when the auth endpoint omits `expires_in`.
pub const DEFAULT_EXPIRES_IN_SECS: i64 = 3600;

/// Token flavour, which also selects the Authorization scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Bearer,
    Jwt,
}

impl TokenKind {
    pub fn scheme(self) -> &'static str {
        match self {
            Self::Bearer => "Bearer",
            Self::Jwt => "JWT",
        }
    }

    /// Case-insensitive `jwt` / `bearer`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "jwt" => Some(Self::Jwt),
            "bearer" => Some(Self::Bearer),
            _ => None,
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.scheme())
    }
}

/// An access token with its kind and absolute expiry.
#[derive(Clone)]
pub struct Credential {
    pub kind: TokenKind,
    token: Zeroizing<String>,
    pub expires_at: DateTime<Utc>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("kind", &self.kind)
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl Credential {
    pub fn new(kind: TokenKind, token: impl Into<String>, expires_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            token: Zeroizing::new(token.into()),
            expires_at,
        }
    }

    /// Token issued now that lives `expires_in` seconds (default one hour).
    pub fn from_expires_in(kind: TokenKind, token: impl Into<String>, expires_in: Option<i64>) -> Self {
        let secs = expires_in.unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        let expires_at = Utc::now()
            .checked_add_signed(Duration::seconds(secs))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::new(kind, token, expires_at)
    }

    /// A configured token that never expires.
    pub fn static_token(kind: TokenKind, token: impl Into<String>) -> Self {
        Self::new(kind, token, DateTime::<Utc>::MAX_UTC)
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Whether the token expires within [`REFRESH_BUFFER_SECS`] of `now`.
    pub fn is_expiring_at(&self, now: DateTime<Utc>) -> bool {
        match now.checked_add_signed(Duration::seconds(REFRESH_BUFFER_SECS)) {
            Some(threshold) => threshold >= self.expires_at,
            None => false,
        }
    }

    pub fn is_expiring(&self) -> bool {
        self.is_expiring_at(Utc::now())
    }

    /// `Authorization` header value, e.g. `Bearer abc` or `JWT abc`.
    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.kind.scheme(), self.token.as_str())
    }
}

/// Single-slot, single-flight token cache.
#[derive(Debug, Default)]
pub struct CredentialCache {
    slot: Mutex<Option<Credential>>,
}

static GLOBAL: OnceLock<Arc<CredentialCache>> = OnceLock::new();

impl CredentialCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide cache shared by sessions that do not bring their own.
    pub fn global() -> Arc<Self> {
        GLOBAL.get_or_init(|| Arc::new(Self::new())).clone()
    }

    /// Return the cached credential, or run `fetch` to replace it.
    ///
    /// The slot is refreshed when `force` is set, when it is empty, when the
    /// cached token is expiring, or when its kind differs from `kind`. A
    /// failed fetch leaves the slot empty and returns the fetch error.
    pub async fn get_or_refresh<F, Fut>(
        &self,
        kind: TokenKind,
        force: bool,
        fetch: F,
    ) -> Result<Credential, ApiError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Credential, ApiError>>,
    {
        let mut slot = self.slot.lock().await;

        if let Some(cached) = slot.as_ref() {
            if !force && cached.kind == kind && !cached.is_expiring() {
                tracing::debug!(%kind, "using cached credential");
                return Ok(cached.clone());
            }
            tracing::debug!(%kind, cached = %cached.kind, force, "discarding cached credential");
        }
        *slot = None;

        match fetch().await {
            Ok(fresh) => {
                tracing::info!(kind = %fresh.kind, expires_at = %fresh.expires_at, "credential refreshed");
                *slot = Some(fresh.clone());
                Ok(fresh)
            }
            Err(e) => {
                tracing::warn!(%kind, error = %e, "credential fetch failed");
                Err(e)
            }
        }
    }

    pub async fn clear(&self) {
        *self.slot.lock().await = None;
    }

    pub async fn current(&self) -> Option<Credential> {
        self.slot.lock().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn expiry_uses_five_minute_buffer() {
        let now = Utc::now();
        let soon = Credential::new(TokenKind::Bearer, "a", now + Duration::seconds(299));
        let later = Credential::new(TokenKind::Bearer, "a", now + Duration::seconds(301));
        assert!(soon.is_expiring_at(now));
        assert!(!later.is_expiring_at(now));
        assert!(!Credential::static_token(TokenKind::Bearer, "s").is_expiring());
    }

    #[test]
    fn header_uses_kind_scheme() {
        let jwt = Credential::from_expires_in(TokenKind::Jwt, "abc", Some(60));
        assert_eq!(jwt.authorization_header(), "JWT abc");
        let bearer = Credential::from_expires_in(TokenKind::Bearer, "abc", None);
        assert_eq!(bearer.authorization_header(), "Bearer abc");
        assert!(bearer.expires_at > Utc::now() + Duration::seconds(3500));
    }

    #[test]
    fn debug_hides_token() {
        let c = Credential::static_token(TokenKind::Bearer, "very-secret");
        assert!(!format!("{c:?}").contains("very-secret"));
    }

    #[test]
    fn kind_parses_case_insensitively() {
        assert_eq!(TokenKind::parse("JWT"), Some(TokenKind::Jwt));
        assert_eq!(TokenKind::parse(" bearer "), Some(TokenKind::Bearer));
        assert_eq!(TokenKind::parse("basic"), None);
    }

    #[tokio::test]
    async fn cached_token_is_reused_until_forced() {
        let cache = CredentialCache::new();
        let calls = AtomicUsize::new(0);
        let fetch = || async {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            Ok(Credential::from_expires_in(TokenKind::Bearer, format!("t{n}"), None))
        };

        let first = cache.get_or_refresh(TokenKind::Bearer, false, fetch).await.unwrap();
        let second = cache.get_or_refresh(TokenKind::Bearer, false, fetch).await.unwrap();
        assert_eq!(first.token(), "t0");
        assert_eq!(second.token(), "t0");

        let forced = cache.get_or_refresh(TokenKind::Bearer, true, fetch).await.unwrap();
        assert_eq!(forced.token(), "t1");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn kind_change_triggers_refresh() {
        let cache = CredentialCache::new();
        cache
            .get_or_refresh(TokenKind::Bearer, false, || async {
                Ok(Credential::from_expires_in(TokenKind::Bearer, "b", None))
            })
            .await
            .unwrap();
        let jwt = cache
            .get_or_refresh(TokenKind::Jwt, false, || async {
                Ok(Credential::from_expires_in(TokenKind::Jwt, "j", None))
            })
            .await
            .unwrap();
        assert_eq!(jwt.kind, TokenKind::Jwt);
        assert_eq!(cache.current().await.unwrap().token(), "j");
    }

    #[tokio::test]
    async fn expiring_token_is_replaced() {
        let cache = CredentialCache::new();
        cache
            .get_or_refresh(TokenKind::Bearer, false, || async {
                Ok(Credential::from_expires_in(TokenKind::Bearer, "old", Some(60)))
            })
            .await
            .unwrap();
        let fresh = cache
            .get_or_refresh(TokenKind::Bearer, false, || async {
                Ok(Credential::from_expires_in(TokenKind::Bearer, "new", None))
            })
            .await
            .unwrap();
        assert_eq!(fresh.token(), "new");
    }

    #[tokio::test]
    async fn failed_fetch_empties_the_slot() {
        let cache = CredentialCache::new();
        cache
            .get_or_refresh(TokenKind::Bearer, false, || async {
                Ok(Credential::from_expires_in(TokenKind::Bearer, "ok", None))
            })
            .await
            .unwrap();
        let err = cache
            .get_or_refresh(TokenKind::Bearer, true, || async {
                Err(ApiError::Configuration("auth down".into()))
            })
            .await
            .unwrap_err();
        assert!(err.to_string().contains("auth down"));
        assert!(cache.current().await.is_none());
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_fetch() {
        let cache = Arc::new(CredentialCache::new());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_refresh(TokenKind::Bearer, false, || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Ok(Credential::from_expires_in(TokenKind::Bearer, "shared", None))
                    })
                    .await
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().token(), "shared");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
