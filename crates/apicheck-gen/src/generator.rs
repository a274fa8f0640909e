//! # Constrained Payload Generator
//!
//! Produces instances of a registered schema that satisfy its conditional
//! field dependencies.
//!
//! ## Algorithm
//!
//! 1. Populate every required field.
//! 2. Include each optional field with the configured probability. A nullable
//!    field that was left out is sometimes emitted as an explicit `null`.
//! 3. Resolve dependency rules to a fixpoint. A firing rule forces its
//!    dependents into the object (creating parents for dotted paths). An
//!    `exclusive` rule that does not fire removes its dependents unless they
//!    are required or forced by another rule.
//! 4. Check the draft with the compiled validator and retry a bounded number
//!    of times before failing with [`ApiError::GenerationExhausted`].
//!
//! Nested objects run the same procedure against their own schema.

use std::collections::HashSet;
use std::sync::Arc;

use apicheck_core::{ApiError, FieldSchema, FieldType, Schema, Violation};
use apicheck_schema::{CoercionPolicy, CompiledSchema, SchemaRegistry};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};

use crate::mutate::Mutation;
use crate::values;

/// Self-check attempts before giving up.
pub const MAX_ATTEMPTS: u32 = 5;

/// Tunables for [`PayloadGenerator`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeneratorConfig {
    optional_probability: f64,
    null_probability: f64,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            optional_probability: 0.5,
            null_probability: 0.3,
        }
    }
}

impl GeneratorConfig {
    /// `optional_probability` must lie strictly between 0 and 1 so both
    /// presence and absence of every optional field stay reachable.
    pub fn new(optional_probability: f64) -> Result<Self, ApiError> {
        if !(optional_probability > 0.0 && optional_probability < 1.0) {
            return Err(ApiError::Configuration(format!(
                "optional field probability must be in (0, 1), got {optional_probability}"
            )));
        }
        Ok(Self {
            optional_probability,
            ..Self::default()
        })
    }

    /// Chance that an omitted nullable field is emitted as `null` instead.
    pub fn with_null_probability(mut self, p: f64) -> Result<Self, ApiError> {
        if !(0.0..=1.0).contains(&p) {
            return Err(ApiError::Configuration(format!(
                "null probability must be in [0, 1], got {p}"
            )));
        }
        self.null_probability = p;
        Ok(self)
    }

    pub fn optional_probability(&self) -> f64 {
        self.optional_probability
    }

    pub fn null_probability(&self) -> f64 {
        self.null_probability
    }
}

/// Schema-driven payload source.
pub struct PayloadGenerator {
    registry: Arc<SchemaRegistry>,
    rng: StdRng,
    config: GeneratorConfig,
}

impl std::fmt::Debug for PayloadGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadGenerator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PayloadGenerator {
    pub fn new(registry: Arc<SchemaRegistry>) -> Self {
        Self {
            registry,
            rng: StdRng::from_entropy(),
            config: GeneratorConfig::default(),
        }
    }

    /// Reproducible generator: the same seed yields the same payload sequence.
    pub fn with_seed(registry: Arc<SchemaRegistry>, seed: u64) -> Self {
        Self {
            registry,
            rng: StdRng::seed_from_u64(seed),
            config: GeneratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GeneratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn registry(&self) -> &Arc<SchemaRegistry> {
        &self.registry
    }

    /// A fresh payload valid against the schema registered as `name`.
    pub fn generate(&mut self, name: &str) -> Result<Value, ApiError> {
        let compiled = self.registry.validator(name, CoercionPolicy::Strict)?;
        self.generate_compiled(&compiled)
    }

    /// Generate against an already compiled schema.
    pub fn generate_compiled(&mut self, compiled: &CompiledSchema) -> Result<Value, ApiError> {
        let mut last: Vec<Violation> = Vec::new();
        for attempt in 1..=MAX_ATTEMPTS {
            let mut draft = Draft {
                rng: &mut self.rng,
                config: &self.config,
            };
            let payload = Value::Object(draft.object(compiled.schema()));
            let result = compiled.check(&payload);
            if result.valid {
                tracing::debug!(schema = compiled.name(), attempt, "generated payload");
                return Ok(payload);
            }
            tracing::debug!(
                schema = compiled.name(),
                attempt,
                violations = %result.summary(),
                "generated payload failed self-check"
            );
            last = result.violations;
        }

        tracing::warn!(schema = compiled.name(), attempts = MAX_ATTEMPTS, "payload generation exhausted");
        Err(ApiError::GenerationExhausted {
            schema: compiled.name().to_string(),
            attempts: MAX_ATTEMPTS,
            violations: last,
        })
    }

    /// Generate a valid payload, then apply `mutations` in order.
    pub fn generate_mutated(&mut self, name: &str, mutations: &[Mutation]) -> Result<Value, ApiError> {
        let compiled = self.registry.validator(name, CoercionPolicy::Strict)?;
        let mut payload = self.generate_compiled(&compiled)?;
        for mutation in mutations {
            mutation.apply(compiled.schema(), &mut payload)?;
        }
        Ok(payload)
    }
}

/// One generation attempt.
struct Draft<'a> {
    rng: &'a mut StdRng,
    config: &'a GeneratorConfig,
}

impl Draft<'_> {
    fn object(&mut self, schema: &Schema) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, field) in &schema.properties {
            if schema.is_required(name) || self.rng.gen_bool(self.config.optional_probability) {
                out.insert(name.clone(), self.value(field));
            } else if field.nullable && self.rng.gen_bool(self.config.null_probability) {
                out.insert(name.clone(), Value::Null);
            }
        }
        self.resolve_dependencies(schema, &mut out);
        out
    }

    fn value(&mut self, field: &FieldSchema) -> Value {
        match (field.field_type, &field.schema, &field.items) {
            (FieldType::Object, Some(nested), _) => Value::Object(self.object(nested)),
            (FieldType::Array, _, Some(item)) => {
                let count = values::item_count(self.rng, field);
                Value::Array((0..count).map(|_| self.value(item)).collect())
            }
            _ => values::leaf(self.rng, field),
        }
    }

    fn resolve_dependencies(&mut self, schema: &Schema, out: &mut Map<String, Value>) {
        if schema.dependent_required.is_empty() {
            return;
        }
        // Each pass either forces or prunes at least one field; this bounds
        // the number of passes that can change anything.
        let max_passes = 2 * (schema.properties.len() + schema.dependent_required.len()) + 1;

        for _ in 0..max_passes {
            let mut changed = false;
            let mut forced: HashSet<&str> = HashSet::new();

            for rule in &schema.dependent_required {
                if !rule.fires(out) {
                    continue;
                }
                for dep in &rule.requires {
                    forced.insert(dep.as_str());
                    if let Some(top) = dep.split('.').next() {
                        forced.insert(top);
                    }
                    changed |= self.ensure_path(schema, out, dep);
                }
            }

            for rule in schema.dependent_required.iter().filter(|r| r.exclusive) {
                if rule.fires(out) {
                    continue;
                }
                for dep in &rule.requires {
                    if forced.contains(dep.as_str()) {
                        continue;
                    }
                    changed |= prune_path(schema, out, dep);
                }
            }

            if !changed {
                return;
            }
        }
    }

    /// Make `dotted` present and non-null, creating parent objects as needed.
    fn ensure_path(&mut self, schema: &Schema, out: &mut Map<String, Value>, dotted: &str) -> bool {
        let (head, rest) = match dotted.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (dotted, None),
        };
        let field = schema.properties.get(head);

        match rest {
            None => {
                if out.get(head).is_some_and(|v| !v.is_null()) {
                    return false;
                }
                let value = match field {
                    Some(field) => self.value(field),
                    None => Value::String(values::word(self.rng).to_string()),
                };
                out.insert(head.to_string(), value);
                true
            }
            Some(rest) => {
                let nested = field.and_then(|f| f.schema.as_deref());
                let mut changed = false;
                if !out.get(head).is_some_and(Value::is_object) {
                    let parent = match nested {
                        Some(nested) => self.object(nested),
                        None => Map::new(),
                    };
                    out.insert(head.to_string(), Value::Object(parent));
                    changed = true;
                }
                let empty = Schema::default();
                let nested = nested.unwrap_or(&empty);
                if let Some(Value::Object(child)) = out.get_mut(head) {
                    changed |= self.ensure_path(nested, child, rest);
                }
                changed
            }
        }
    }
}

/// Remove the leaf of `dotted` unless its parent schema requires it.
fn prune_path(schema: &Schema, out: &mut Map<String, Value>, dotted: &str) -> bool {
    match dotted.split_once('.') {
        None => {
            if schema.is_required(dotted) {
                return false;
            }
            out.remove(dotted).is_some()
        }
        Some((head, rest)) => {
            let Some(nested) = schema.properties.get(head).and_then(|f| f.schema.as_deref()) else {
                return false;
            };
            match out.get_mut(head) {
                Some(Value::Object(child)) => prune_path(nested, child, rest),
                _ => false,
            }
        }
    }
}
