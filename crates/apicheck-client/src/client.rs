//! Authenticated sessions and per-resource CRUD clients.

use std::sync::Arc;
use std::time::Duration;

use apicheck_core::ApiError;
use apicheck_schema::SchemaRegistry;
use reqwest::header::{HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::Method;
use serde_json::Value;
use url::Url;

use crate::auth::TokenProvider;
use crate::config::{Credentials, HarnessConfig};
use crate::credential::{Credential, CredentialCache, TokenKind};
use crate::response::{expect_status, transport_error, validate_body, ApiResponse, ExpectedStatus};

/// HTTP client bound to one configuration and one credential cache.
///
/// Cheap to clone; clones share the connection pool and the cache.
#[derive(Debug, Clone)]
pub struct ApiSession {
    http: reqwest::Client,
    config: Arc<HarnessConfig>,
    cache: Arc<CredentialCache>,
    tokens: TokenProvider,
    credentials: Option<Credentials>,
}

impl ApiSession {
    /// Session using the process-wide credential cache.
    pub fn new(config: HarnessConfig) -> Result<Self, ApiError> {
        Self::with_cache(config, CredentialCache::global())
    }

    /// Session with its own credential cache.
    pub fn with_cache(config: HarnessConfig, cache: Arc<CredentialCache>) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
                headers
            })
            .build()
            .map_err(|e| ApiError::Configuration(format!("failed to build HTTP client: {e}")))?;
        let config = Arc::new(config);
        Ok(Self {
            tokens: TokenProvider::new(http.clone(), config.clone()),
            http,
            config,
            cache,
            credentials: None,
        })
    }

    /// Log in with these credentials instead of the login fixture or config.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<CredentialCache> {
        &self.cache
    }

    /// Current credential for the configured auth type, fetched if needed.
    pub async fn credential(&self, force_refresh: bool) -> Result<Credential, ApiError> {
        let kind = self.config.auth_type;
        self.cache
            .get_or_refresh(kind, force_refresh, || async move {
                let credentials = self.login_credentials(kind)?;
                self.tokens.fetch(kind, &credentials).await
            })
            .await
    }

    fn login_credentials(&self, kind: TokenKind) -> Result<Credentials, ApiError> {
        if let Some(explicit) = &self.credentials {
            return Ok(explicit.clone());
        }
        if kind == TokenKind::Bearer && self.config.static_token.is_some() {
            return Ok(Credentials::default());
        }
        self.config.login_credentials()
    }

    /// CRUD client for the collection at `base_path` (e.g. `/api/resources`).
    pub fn resource(&self, base_path: impl Into<String>) -> ResourceClient {
        ResourceClient {
            session: self.clone(),
            base_path: base_path.into(),
            response_schema: None,
            authenticated: true,
        }
    }

    /// Send a request, optionally authenticated, and buffer the response.
    pub async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
        authenticated: bool,
    ) -> Result<ApiResponse, ApiError> {
        let mut req = self.http.request(method.clone(), url.clone());
        if authenticated {
            let credential = self.credential(false).await?;
            req = req.header(AUTHORIZATION, credential.authorization_header());
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        tracing::debug!(method = %method, url = %url, "sending request");
        let resp = req
            .send()
            .await
            .map_err(|e| transport_error(method.as_str(), url.as_str(), &e))?;
        let resp = ApiResponse::from_reqwest(method.as_str(), resp).await?;
        tracing::info!(method = %resp.method, url = %resp.url, status = resp.status, "response received");
        Ok(resp)
    }

    /// Resolve a path against the base URL.
    pub fn url(&self, path: &str) -> Result<Url, ApiError> {
        self.config
            .base_url
            .join(path)
            .map_err(|e| ApiError::Configuration(format!("invalid request path '{path}': {e}")))
    }
}

/// Client for one REST collection.
///
/// | Method | Path | Expected |
/// |--------|------|----------|
/// | POST   | `{base}` | 201 |
/// | GET    | `{base}/{id}` | 200 |
/// | PUT    | `{base}/{id}` | 200 |
/// | DELETE | `{base}/{id}` | 204 |
#[derive(Debug, Clone)]
pub struct ResourceClient {
    session: ApiSession,
    base_path: String,
    response_schema: Option<(Arc<SchemaRegistry>, String)>,
    authenticated: bool,
}

impl ResourceClient {
    /// Validate `create`/`read`/`update` bodies against `schema`.
    pub fn with_response_schema(mut self, registry: Arc<SchemaRegistry>, schema: impl Into<String>) -> Self {
        self.response_schema = Some((registry, schema.into()));
        self
    }

    /// Send no `Authorization` header.
    pub fn unauthenticated(mut self) -> Self {
        self.authenticated = false;
        self
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    pub async fn create(&self, body: &Value) -> Result<Value, ApiError> {
        let resp = self.create_raw(body).await?;
        self.checked(&resp, 201)
    }

    pub async fn read(&self, id: &str) -> Result<Value, ApiError> {
        let resp = self.read_raw(id).await?;
        self.checked(&resp, 200)
    }

    pub async fn update(&self, id: &str, body: &Value) -> Result<Value, ApiError> {
        let resp = self.update_raw(id, body).await?;
        self.checked(&resp, 200)
    }

    pub async fn delete(&self, id: &str) -> Result<(), ApiError> {
        let resp = self.delete_raw(id).await?;
        expect_status(&resp, 204)
    }

    pub async fn create_raw(&self, body: &Value) -> Result<ApiResponse, ApiError> {
        self.send_raw(Method::POST, None, Some(body)).await
    }

    pub async fn read_raw(&self, id: &str) -> Result<ApiResponse, ApiError> {
        self.send_raw(Method::GET, Some(id), None).await
    }

    pub async fn update_raw(&self, id: &str, body: &Value) -> Result<ApiResponse, ApiError> {
        self.send_raw(Method::PUT, Some(id), Some(body)).await
    }

    pub async fn delete_raw(&self, id: &str) -> Result<ApiResponse, ApiError> {
        self.send_raw(Method::DELETE, Some(id), None).await
    }

    /// Any method against the collection or one member; the response is
    /// returned untouched whatever its status.
    pub async fn send_raw(
        &self,
        method: Method,
        id: Option<&str>,
        body: Option<&Value>,
    ) -> Result<ApiResponse, ApiError> {
        let url = self.url_for(id)?;
        self.session.send(method, url, body, self.authenticated).await
    }

    /// Assert the status, then validate or parse the body.
    pub fn checked(&self, resp: &ApiResponse, expected: impl Into<ExpectedStatus>) -> Result<Value, ApiError> {
        expect_status(resp, expected)?;
        match &self.response_schema {
            Some((registry, schema)) => Ok(validate_body(resp, registry, schema)?.unwrap_or(Value::Null)),
            None if resp.is_empty_body() => Ok(Value::Null),
            None => resp.json(),
        }
    }

    fn url_for(&self, id: Option<&str>) -> Result<Url, ApiError> {
        let mut url = self.session.url(&self.base_path)?;
        if let Some(id) = id {
            url.path_segments_mut()
                .map_err(|_| ApiError::Configuration(format!("base URL '{}' cannot take a path", self.session.config.base_url)))?
                .pop_if_empty()
                .push(id);
        }
        Ok(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(base: &str) -> ApiSession {
        let mut config = HarnessConfig::local_mock(3000, Credentials::new("testData", "testData")).unwrap();
        config.base_url = Url::parse(base).unwrap();
        ApiSession::with_cache(config, Arc::new(CredentialCache::new())).unwrap()
    }

    #[test]
    fn member_urls_append_escaped_id() {
        let client = session("http://127.0.0.1:3000/").resource("/api/resources");
        assert_eq!(
            client.url_for(None).unwrap().as_str(),
            "http://127.0.0.1:3000/api/resources"
        );
        assert_eq!(
            client.url_for(Some("abc 1")).unwrap().as_str(),
            "http://127.0.0.1:3000/api/resources/abc%201"
        );
    }

    #[test]
    fn trailing_slash_base_path_is_not_doubled() {
        let client = session("http://127.0.0.1:3000/").resource("/medications/");
        assert_eq!(
            client.url_for(Some("m-1")).unwrap().as_str(),
            "http://127.0.0.1:3000/medications/m-1"
        );
    }

    #[tokio::test]
    async fn static_token_needs_no_login() {
        let config = HarnessConfig::local_mock(3000, Credentials::default())
            .unwrap()
            .with_static_token("static-abc");
        let session = ApiSession::with_cache(config, Arc::new(CredentialCache::new())).unwrap();
        let credential = session.credential(false).await.unwrap();
        assert_eq!(credential.authorization_header(), "Bearer static-abc");
    }
}
