//! Generated payloads validate against their own schema, and removing a
//! forced dependent is caught by the validator.

use std::sync::Arc;

use apicheck_core::Keyword;
use apicheck_gen::{GeneratorConfig, Mutation, PayloadGenerator};
use apicheck_schema::catalog::{
    LOGIN_REQUEST, MEDICATION_REQUEST, RESOURCE_CREATE_REQUEST, RESOURCE_UPDATE_REQUEST,
    USER_CREATE_REQUEST, USER_REGISTER_REQUEST,
};
use apicheck_schema::{CoercionPolicy, SchemaRegistry};
use proptest::prelude::*;
use serde_json::{json, Value};

const REQUEST_SCHEMAS: &[&str] = &[
    LOGIN_REQUEST,
    MEDICATION_REQUEST,
    RESOURCE_CREATE_REQUEST,
    RESOURCE_UPDATE_REQUEST,
    USER_CREATE_REQUEST,
    USER_REGISTER_REQUEST,
];

fn registry() -> Arc<SchemaRegistry> {
    Arc::new(SchemaRegistry::builtin().expect("builtin catalog"))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generated_payloads_validate(seed in any::<u64>(), p in 0.05f64..0.95) {
        let registry = registry();
        let config = GeneratorConfig::new(p).unwrap();
        let mut generator = PayloadGenerator::with_seed(Arc::clone(&registry), seed).with_config(config);
        for name in REQUEST_SCHEMAS {
            let payload = generator.generate(name).unwrap();
            let validator = registry.validator(name, CoercionPolicy::Strict).unwrap();
            let result = validator.check(&payload);
            prop_assert!(result.valid, "{name}: {payload} -> {:?}", result.violations);
        }
    }
}

#[test]
fn removing_activation_date_yields_dependent_required() {
    let registry = registry();
    let mut generator = PayloadGenerator::with_seed(Arc::clone(&registry), 11);
    let mut payload = generator
        .generate_mutated(
            RESOURCE_CREATE_REQUEST,
            &[
                Mutation::set("status", "active"),
                Mutation::set("activationDate", "2024-06-01T12:00:00Z"),
            ],
        )
        .unwrap();

    let validator = registry.validator(RESOURCE_CREATE_REQUEST, CoercionPolicy::Strict).unwrap();
    assert!(validator.check(&payload).valid);

    Mutation::remove("activationDate")
        .apply(validator.schema(), &mut payload)
        .unwrap();
    let result = validator.check(&payload);
    assert_eq!(result.violations.len(), 1, "{:?}", result.violations);
    assert_eq!(result.violations[0].keyword, Keyword::DependentRequired);
    assert_eq!(
        result.violations[0].context_str("missingProperty"),
        Some("activationDate")
    );
}

#[test]
fn max_length_boundary_per_field() {
    let registry = registry();
    let validator = registry.validator(MEDICATION_REQUEST, CoercionPolicy::Strict).unwrap();
    let mut generator = PayloadGenerator::with_seed(Arc::clone(&registry), 21);

    for (path, limit) in validator.schema().max_length_fields() {
        let mut at_limit = generator
            .generate_mutated(
                MEDICATION_REQUEST,
                &[
                    Mutation::set("controlledSubstance", true),
                    Mutation::set(
                        "prescriber",
                        json!({"name": "Dr. Imani Ortiz", "licenseNumber": "LIC-20931"}),
                    ),
                ],
            )
            .unwrap();
        Mutation::set(path.clone(), "y".repeat(limit as usize))
            .apply(validator.schema(), &mut at_limit)
            .unwrap();
        assert!(validator.check(&at_limit).valid, "{path} at limit");

        let mut over = at_limit.clone();
        Mutation::exceed_max_length(path.clone())
            .apply(validator.schema(), &mut over)
            .unwrap();
        let result = validator.check(&over);
        assert_eq!(result.violations.len(), 1, "{path}: {:?}", result.violations);
        assert_eq!(result.violations[0].keyword, Keyword::MaxLength);
        assert_eq!(result.violations[0].path, apicheck_schema::pointer_for(&path));
    }
}

#[test]
fn unknown_field_is_rejected_by_closed_schema() {
    let registry = registry();
    let mut generator = PayloadGenerator::with_seed(Arc::clone(&registry), 4);
    let payload = generator
        .generate_mutated(USER_CREATE_REQUEST, &[Mutation::unknown_field("nickname")])
        .unwrap();
    let result = registry
        .validator(USER_CREATE_REQUEST, CoercionPolicy::Strict)
        .unwrap()
        .check(&payload);
    assert_eq!(result.violations.len(), 1);
    assert_eq!(result.violations[0].keyword, Keyword::AdditionalProperties);
}

#[test]
fn payloads_are_independent_values() {
    let mut generator = PayloadGenerator::with_seed(registry(), 8);
    let mut first = generator.generate(LOGIN_REQUEST).unwrap();
    let second = generator.generate(LOGIN_REQUEST).unwrap();
    let before = second.clone();
    first["username"] = Value::from("changed");
    assert_eq!(second, before);
}
