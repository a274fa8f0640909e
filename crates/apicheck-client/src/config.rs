//! Harness configuration.
//!
//! Resolved once from an environment-style lookup and immutable afterwards.
//! Missing settings are reported as [`ConfigWarning`]s and surface as
//! [`ApiError::Configuration`] only where they are actually needed; only
//! malformed values fail construction.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use apicheck_core::ApiError;
use apicheck_fixtures::{load_login_credentials, LoginCredentials};
use url::Url;
use zeroize::Zeroizing;

use crate::credential::TokenKind;

const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_LOGIN_DATA: &str = "data/login_data.csv";
const DEFAULT_MED_PAYLOADS: &str = "data/medication_payloads.csv";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_ENV_NAME: &str = "development";

/// Where suites take request payloads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSource {
    /// Synthesized by the payload generator.
    Faker,
    /// Rows from fixture files.
    Fixtures,
}

/// Login identity used to obtain tokens.
#[derive(Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<Zeroizing<String>>,
    pub provider_code: Option<String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("provider_code", &self.provider_code)
            .finish()
    }
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(Zeroizing::new(password.into())),
            provider_code: None,
        }
    }

    pub fn with_provider_code(mut self, code: impl Into<String>) -> Self {
        self.provider_code = Some(code.into());
        self
    }

    /// Both username and password are set and non-empty.
    pub fn is_complete(&self) -> bool {
        self.username.as_deref().is_some_and(|u| !u.is_empty())
            && self.password.as_deref().is_some_and(|p| !p.is_empty())
    }
}

impl From<LoginCredentials> for Credentials {
    fn from(creds: LoginCredentials) -> Self {
        Self {
            username: Some(creds.username),
            password: Some(Zeroizing::new(creds.password)),
            provider_code: creds.provider_code,
        }
    }
}

/// Fixture file locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFiles {
    pub login_data: PathBuf,
    pub medication_payloads: PathBuf,
}

/// A setting that is absent but may be needed later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigWarning {
    pub variable: &'static str,
    pub message: String,
}

/// Malformed configuration values.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("unknown AUTH_TYPE '{0}' (expected JWT or Bearer)")]
    InvalidAuthType(String),
    #[error("REQUEST_TIMEOUT_SECS must be a positive integer, got '{0}'")]
    InvalidTimeout(String),
    #[error("cannot read settings file {0}: {1}")]
    DotenvFile(String, String),
}

/// Values from `.env.<name>` layered over `.env`. Neither file is required.
#[derive(Debug, Clone, Default)]
pub struct DotenvLayers {
    values: HashMap<String, String>,
    loaded: Vec<PathBuf>,
}

impl DotenvLayers {
    /// Read `dir/.env.<env_name>` then `dir/.env`; the first file to
    /// define a key wins.
    pub fn load(dir: &Path, env_name: &str) -> Result<Self, ConfigError> {
        let mut layers = Self::default();
        for path in [dir.join(format!(".env.{env_name}")), dir.join(".env")] {
            if !path.is_file() {
                tracing::debug!(path = %path.display(), "settings file absent");
                continue;
            }
            let file_err = |e: dotenvy::Error| ConfigError::DotenvFile(path.display().to_string(), e.to_string());
            for item in dotenvy::from_path_iter(&path).map_err(file_err)? {
                let (key, value) = item.map_err(file_err)?;
                layers.values.entry(key).or_insert(value);
            }
            tracing::info!(path = %path.display(), "loaded settings file");
            layers.loaded.push(path);
        }
        Ok(layers)
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    /// Files that were found and read, most specific first.
    pub fn loaded(&self) -> &[PathBuf] {
        &self.loaded
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::Configuration(err.to_string())
    }
}

/// Settings shared by every session.
///
/// Custom `Debug` redacts the password and static token.
#[derive(Clone)]
pub struct HarnessConfig {
    pub base_url: Url,
    pub jwt_auth_url: Option<Url>,
    pub bearer_auth_url: Option<Url>,
    pub auth_type: TokenKind,
    pub credentials: Credentials,
    pub static_token: Option<Zeroizing<String>>,
    pub data_files: DataFiles,
    pub data_source: DataSource,
    pub timeout_secs: u64,
}

impl std::fmt::Debug for HarnessConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HarnessConfig")
            .field("base_url", &self.base_url.as_str())
            .field("jwt_auth_url", &self.jwt_auth_url.as_ref().map(Url::as_str))
            .field("bearer_auth_url", &self.bearer_auth_url.as_ref().map(Url::as_str))
            .field("auth_type", &self.auth_type)
            .field("credentials", &self.credentials)
            .field("static_token", &self.static_token.as_ref().map(|_| "[REDACTED]"))
            .field("data_files", &self.data_files)
            .field("data_source", &self.data_source)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl HarnessConfig {
    /// Load configuration from process environment variables, falling back
    /// to `.env.<APICHECK_ENV>` (default `development`) and then `.env` in
    /// the working directory.
    ///
    /// Variables:
    /// - `BASE_URL` (default: `http://localhost:3000`)
    /// - `JWT_AUTH_URL`, `BEARER_AUTH_URL` (absolute, or relative to `BASE_URL`)
    /// - `AUTH_TYPE` (`JWT` or `Bearer`, default: `Bearer`)
    /// - `AUTH_USERNAME`, `AUTH_PASSWORD`, `PROVIDERCODE`
    /// - `BEARER_TOKEN` (static token, skips the Bearer fetch)
    /// - `LOGIN_DATA_PATH`, `MED_PAYLOAD_PATH`
    /// - `TEST_DATA_SOURCE` (`faker` or `fixtures`, default: `faker`)
    /// - `REQUEST_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_in(Path::new("."))
    }

    /// [`from_env`](Self::from_env) with settings files read from `dir`.
    pub fn from_env_in(dir: &Path) -> Result<Self, ConfigError> {
        let env_name = std::env::var("APICHECK_ENV")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_ENV_NAME.to_string());
        let files = DotenvLayers::load(dir, &env_name)?;
        Self::from_lookup(|key| std::env::var(key).ok().or_else(|| files.get(key)))
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let base_raw = get("BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = Url::parse(&base_raw)
            .map_err(|e| ConfigError::InvalidUrl("BASE_URL".into(), e.to_string()))?;

        let jwt_auth_url = get("JWT_AUTH_URL")
            .map(|raw| resolve_url(&base_url, "JWT_AUTH_URL", &raw))
            .transpose()?;
        let bearer_auth_url = get("BEARER_AUTH_URL")
            .map(|raw| resolve_url(&base_url, "BEARER_AUTH_URL", &raw))
            .transpose()?;

        let auth_type = match get("AUTH_TYPE") {
            None => TokenKind::Bearer,
            Some(raw) => TokenKind::parse(&raw).ok_or(ConfigError::InvalidAuthType(raw))?,
        };

        let data_source = match get("TEST_DATA_SOURCE").map(|s| s.to_ascii_lowercase()) {
            Some(s) if s == "fixtures" || s == "excel" => DataSource::Fixtures,
            Some(s) if s != "faker" => {
                tracing::warn!(value = %s, "unknown TEST_DATA_SOURCE, using faker");
                DataSource::Faker
            }
            _ => DataSource::Faker,
        };

        let timeout_secs = match get("REQUEST_TIMEOUT_SECS") {
            None => DEFAULT_TIMEOUT_SECS,
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => return Err(ConfigError::InvalidTimeout(raw)),
            },
        };

        let config = Self {
            base_url,
            jwt_auth_url,
            bearer_auth_url,
            auth_type,
            credentials: Credentials {
                username: get("AUTH_USERNAME"),
                password: get("AUTH_PASSWORD").map(Zeroizing::new),
                provider_code: get("PROVIDERCODE"),
            },
            static_token: get("BEARER_TOKEN").map(Zeroizing::new),
            data_files: DataFiles {
                login_data: get("LOGIN_DATA_PATH")
                    .unwrap_or_else(|| DEFAULT_LOGIN_DATA.to_string())
                    .into(),
                medication_payloads: get("MED_PAYLOAD_PATH")
                    .unwrap_or_else(|| DEFAULT_MED_PAYLOADS.to_string())
                    .into(),
            },
            data_source,
            timeout_secs,
        };

        for warning in config.warnings() {
            tracing::warn!(variable = warning.variable, "{}", warning.message);
        }
        Ok(config)
    }

    /// Configuration pointing at a local mock server (for testing).
    pub fn local_mock(port: u16, credentials: Credentials) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&format!("http://127.0.0.1:{port}"))
            .map_err(|e| ConfigError::InvalidUrl("localhost".into(), e.to_string()))?;
        Ok(Self {
            jwt_auth_url: Some(resolve_url(&base_url, "JWT_AUTH_URL", "/auth/jwt")?),
            bearer_auth_url: Some(resolve_url(&base_url, "BEARER_AUTH_URL", "/auth/bearer")?),
            base_url,
            auth_type: TokenKind::Bearer,
            credentials,
            static_token: None,
            data_files: DataFiles {
                login_data: DEFAULT_LOGIN_DATA.into(),
                medication_payloads: DEFAULT_MED_PAYLOADS.into(),
            },
            data_source: DataSource::Faker,
            timeout_secs: 5,
        })
    }

    pub fn with_auth_type(mut self, kind: TokenKind) -> Self {
        self.auth_type = kind;
        self
    }

    pub fn with_data_source(mut self, source: DataSource) -> Self {
        self.data_source = source;
        self
    }

    pub fn with_static_token(mut self, token: impl Into<String>) -> Self {
        self.static_token = Some(Zeroizing::new(token.into()));
        self
    }

    /// Settings that are absent but would be needed by the configured auth flow.
    pub fn warnings(&self) -> Vec<ConfigWarning> {
        let mut out = Vec::new();
        match self.auth_type {
            TokenKind::Jwt if self.jwt_auth_url.is_none() => out.push(ConfigWarning {
                variable: "JWT_AUTH_URL",
                message: "JWT_AUTH_URL is not set; JWT token fetches will fail".into(),
            }),
            TokenKind::Bearer if self.bearer_auth_url.is_none() && self.static_token.is_none() => {
                out.push(ConfigWarning {
                    variable: "BEARER_AUTH_URL",
                    message: "neither BEARER_AUTH_URL nor BEARER_TOKEN is set; Bearer token fetches will fail"
                        .into(),
                })
            }
            _ => {}
        }
        let needs_login = !(self.auth_type == TokenKind::Bearer && self.static_token.is_some());
        if needs_login && self.credentials.username.is_none() {
            out.push(ConfigWarning {
                variable: "AUTH_USERNAME",
                message: "AUTH_USERNAME is not set; login fixtures must supply one".into(),
            });
        }
        if needs_login && self.credentials.password.is_none() {
            out.push(ConfigWarning {
                variable: "AUTH_PASSWORD",
                message: "AUTH_PASSWORD is not set; login fixtures must supply one".into(),
            });
        }
        out
    }

    /// Login credentials: the first row of the login fixture file when it
    /// yields a username and password, otherwise the configured ones.
    pub fn login_credentials(&self) -> Result<Credentials, ApiError> {
        match load_login_credentials(&self.data_files.login_data) {
            Ok(creds) => {
                let creds = Credentials::from(creds);
                if creds.is_complete() {
                    tracing::info!(path = %self.data_files.login_data.display(), "loaded login credentials from fixture file");
                    return Ok(creds);
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "login fixture unavailable, falling back to configured credentials");
            }
        }

        if self.credentials.is_complete() {
            Ok(self.credentials.clone())
        } else {
            Err(ApiError::Configuration(
                "login credentials (username, password) are not available from the login fixture file or AUTH_USERNAME/AUTH_PASSWORD"
                    .into(),
            ))
        }
    }
}

fn resolve_url(base: &Url, var: &str, raw: &str) -> Result<Url, ConfigError> {
    base.join(raw)
        .map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}
