//! # Schema Validation
//!
//! Runtime validation of JSON instances against declarative schemas.
//!
//! A [`CompiledSchema`] couples two evaluators:
//!
//! 1. The `jsonschema` crate (Draft 2020-12, format assertion enabled) runs
//!    against the lowered JSON Schema and covers every structural keyword.
//! 2. A generic dependency pass evaluates `dependentRequired` rules, which
//!    are value-conditional and may name dotted paths.
//!
//! Both report into one [`ValidationResult`]. Compiling the same schema
//! twice yields validators that agree on every instance.

use std::fmt;

use apicheck_core::{Keyword, Schema, ValidationResult, Violation};
use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use serde_json::Value;

use crate::coerce::{coerce, CoercionPolicy};
use crate::dependency::{self, escape_token};
use crate::error::SchemaError;
use crate::lower::lower;

/// A schema ready to check instances.
pub struct CompiledSchema {
    name: String,
    schema: Schema,
    json_schema: Value,
    validator: Validator,
    policy: CoercionPolicy,
}

impl fmt::Debug for CompiledSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledSchema")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

impl CompiledSchema {
    /// Compile a self-contained schema. Schemas that use `extends` must be
    /// compiled through [`crate::SchemaRegistry::validator`], which resolves
    /// the base first.
    pub fn compile(
        name: impl Into<String>,
        schema: &Schema,
        policy: CoercionPolicy,
    ) -> Result<Self, SchemaError> {
        let name = name.into();
        if let Some(base) = &schema.extends {
            return Err(SchemaError::Compile {
                name,
                reason: format!("extends '{base}' must be resolved through a registry"),
            });
        }

        let json_schema = lower(schema);
        let validator = jsonschema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .should_validate_formats(true)
            .build(&json_schema)
            .map_err(|e| SchemaError::Compile {
                name: name.clone(),
                reason: e.to_string(),
            })?;

        tracing::debug!(schema = %name, ?policy, "compiled schema validator");
        Ok(Self {
            name,
            schema: schema.clone(),
            json_schema,
            validator,
            policy,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The flattened declarative schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The lowered JSON Schema handed to the structural validator.
    pub fn json_schema(&self) -> &Value {
        &self.json_schema
    }

    pub fn policy(&self) -> CoercionPolicy {
        self.policy
    }

    /// Check `instance`, returning every violation found.
    pub fn check(&self, instance: &Value) -> ValidationResult {
        let coerced;
        let instance = match self.policy {
            CoercionPolicy::Strict => instance,
            CoercionPolicy::Lenient => {
                coerced = coerce(&self.schema, instance);
                &coerced
            }
        };

        let mut violations = Vec::new();
        for error in self.validator.iter_errors(instance) {
            let instance_path = error.instance_path.to_string();
            let schema_path = error.schema_path.to_string();
            let message = error.to_string();
            match &error.kind {
                ValidationErrorKind::AdditionalProperties { unexpected } => {
                    for field in unexpected {
                        violations.push(
                            Violation::new(
                                instance_path.clone(),
                                Keyword::AdditionalProperties,
                                format!("unexpected property '{field}'"),
                            )
                            .with_context("additionalProperty", field.as_str()),
                        );
                    }
                }
                ValidationErrorKind::Required { property } => {
                    let missing = property
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| property.to_string());
                    violations.push(
                        Violation::new(instance_path, Keyword::Required, message)
                            .with_context("missingProperty", missing),
                    );
                }
                _ => violations.push(self.structural_violation(instance_path, &schema_path, message)),
            }
        }

        violations.extend(dependency::check(&self.schema, instance));
        ValidationResult::from_violations(violations)
    }

    fn structural_violation(&self, path: String, schema_path: &str, message: String) -> Violation {
        let keyword = schema_path
            .rsplit('/')
            .next()
            .and_then(Keyword::from_schema_keyword)
            .unwrap_or(Keyword::Other);
        let violation = Violation::new(path, keyword, message);

        let context_key = match keyword {
            Keyword::MaxLength
            | Keyword::MinLength
            | Keyword::Minimum
            | Keyword::Maximum
            | Keyword::MinItems
            | Keyword::MaxItems => "limit",
            Keyword::Enum => "allowedValues",
            Keyword::Format => "format",
            Keyword::Type => "expectedType",
            _ => return violation,
        };
        match self.json_schema.pointer(schema_path) {
            Some(value) => violation.with_context(context_key, value.clone()),
            None => violation,
        }
    }
}

/// JSON pointer for a dotted field path, e.g. `prescriber.name` -> `/prescriber/name`.
pub fn pointer_for(dotted: &str) -> String {
    dotted
        .split('.')
        .map(|segment| format!("/{}", escape_token(segment)))
        .collect()
}
