//! # apicheck-client: Authenticated Client and Response Assertions
//!
//! Typed access to a REST API under test:
//! - **Config** resolved once from the environment ([`HarnessConfig`])
//! - **Credentials** cached process-wide with single-flight refresh
//!   ([`CredentialCache`])
//! - **Resources** as CRUD clients with fixed expected statuses
//!   ([`ResourceClient`])
//! - **Assertions** on status and body shape ([`expect_status`],
//!   [`validate_body`])
//! - **Cases** for data-driven suites from fixtures or the generator
//!   ([`medication_cases`])
//!
//! ## Authentication
//!
//! `AUTH_TYPE` selects JWT or Bearer. Tokens are fetched on first use and
//! reused until five minutes before expiry. A configured `BEARER_TOKEN`
//! bypasses the Bearer fetch entirely.

pub mod auth;
pub mod client;
pub mod config;
pub mod credential;
pub mod response;
pub mod suite;

pub use auth::TokenProvider;
pub use client::{ApiSession, ResourceClient};
pub use config::{ConfigError, ConfigWarning, Credentials, DataFiles, DataSource, DotenvLayers, HarnessConfig};
pub use credential::{Credential, CredentialCache, TokenKind};
pub use response::{expect_status, expect_successful, validate_body, ApiResponse, ExpectedStatus};
pub use suite::medication_cases;

pub use reqwest::Method;
