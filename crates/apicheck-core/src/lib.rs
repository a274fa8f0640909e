//! # apicheck-core: Foundational Types for apicheck
//!
//! The leaf crate of the workspace. It defines the data every other crate
//! exchanges:
//!
//! - [`Schema`]: the declarative description of a request or response body,
//!   including value-conditional field dependencies.
//! - [`Violation`] / [`ValidationResult`]: structured validation output keyed
//!   by JSON pointer and [`Keyword`].
//! - [`ApiError`]: the tagged error taxonomy surfaced to test suites.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `apicheck-*` crates.
//! - No I/O. Schemas are pure data; evaluation lives in `apicheck-schema`.
//! - No `.unwrap()` outside tests.

pub mod error;
pub mod schema;
pub mod violation;

pub use error::{ApiError, ErrorKind, TransportFailure};
pub use schema::{DependentRule, FieldSchema, FieldType, Schema, StringFormat};
pub use violation::{Keyword, ValidationResult, Violation};
