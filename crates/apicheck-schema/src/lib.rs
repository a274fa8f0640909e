//! # apicheck-schema: Schema Registry and Validator
//!
//! Compiles declarative [`Schema`](apicheck_core::Schema)s into validators
//! and keeps them in a name-keyed [`SchemaRegistry`].
//!
//! ## Pipeline
//!
//! 1. **Resolve.** `extends` chains are flattened by the registry: overlay
//!    properties win, `required` is unioned, dependency rules run base-first.
//! 2. **Lower.** The flattened schema becomes a Draft 2020-12 JSON Schema;
//!    nullability widens `type` to include `"null"`.
//! 3. **Check.** The `jsonschema` crate evaluates structure and formats; a
//!    generic pass evaluates value-conditional `dependentRequired` rules.
//!
//! Schemas are pure data. Nothing in this crate knows about any particular
//! endpoint; the built-in catalog lives in the repository's `schemas/`
//! directory.

pub mod catalog;
pub mod coerce;
mod dependency;
pub mod error;
mod lower;
pub mod registry;
pub mod validate;

pub use coerce::CoercionPolicy;
pub use error::SchemaError;
pub use registry::SchemaRegistry;
pub use validate::{pointer_for, CompiledSchema};
