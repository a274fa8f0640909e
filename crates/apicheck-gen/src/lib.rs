//! # apicheck-gen: Constrained Data Generator
//!
//! Synthesizes request payloads from registered schemas. Every payload
//! returned by [`PayloadGenerator::generate`] has passed the same compiled
//! validator that response checks use, including conditional dependencies
//! such as "`activationDate` is required when `status` is `active`".
//!
//! [`Mutation`]s turn a valid payload into a targeted negative case:
//! removing a dependent field, overshooting a `maxLength`, or sending the
//! wrong JSON type.

pub mod generator;
pub mod mutate;
mod values;

pub use generator::{GeneratorConfig, PayloadGenerator, MAX_ATTEMPTS};
pub use mutate::{apply_all, Mutation, MutationError};
