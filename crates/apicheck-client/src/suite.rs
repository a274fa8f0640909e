//! Case sources for data-driven suites.
//!
//! `TEST_DATA_SOURCE` picks where a suite's rows come from: the medication
//! payload fixture file, or payloads synthesized by the generator. Both
//! yield the same [`DataDrivenCase`] shape so a suite runs either way.

use apicheck_core::ApiError;
use apicheck_fixtures::{load_cases, DataDrivenCase};
use apicheck_gen::PayloadGenerator;
use apicheck_schema::catalog;
use serde_json::Value;

use crate::config::{DataSource, HarnessConfig};

/// Medication cases from the configured [`DataSource`].
///
/// `Fixtures` reads `data_files.medication_payloads`. `Faker` generates
/// `generated` create cases, each expecting 201 and echoing `medName`.
pub fn medication_cases(
    config: &HarnessConfig,
    generator: &mut PayloadGenerator,
    generated: usize,
) -> Result<Vec<DataDrivenCase>, ApiError> {
    match config.data_source {
        DataSource::Fixtures => {
            let path = &config.data_files.medication_payloads;
            let cases = load_cases(path)?;
            tracing::info!(path = %path.display(), cases = cases.len(), "medication cases from fixture file");
            Ok(cases)
        }
        DataSource::Faker => {
            let cases = (0..generated)
                .map(|i| generated_case(generator, i))
                .collect::<Result<Vec<_>, _>>()?;
            tracing::info!(cases = cases.len(), "medication cases from generator");
            Ok(cases)
        }
    }
}

fn generated_case(generator: &mut PayloadGenerator, index: usize) -> Result<DataDrivenCase, ApiError> {
    let payload = generator.generate(catalog::MEDICATION_REQUEST)?;
    Ok(DataDrivenCase {
        name: format!("Generated medication #{}", index + 1),
        method: "POST".into(),
        resource_id: None,
        expected_status: 201,
        expected_med_name: payload.get("medName").and_then(Value::as_str).map(str::to_string),
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Arc;

    use apicheck_core::ErrorKind;
    use apicheck_schema::SchemaRegistry;

    use crate::config::Credentials;

    fn generator() -> PayloadGenerator {
        PayloadGenerator::with_seed(Arc::new(SchemaRegistry::builtin().unwrap()), 17)
    }

    fn config(source: DataSource) -> HarnessConfig {
        HarnessConfig::local_mock(3000, Credentials::new("testData", "testData"))
            .unwrap()
            .with_data_source(source)
    }

    #[test]
    fn faker_source_generates_create_cases() {
        let cases = medication_cases(&config(DataSource::Faker), &mut generator(), 4).unwrap();
        assert_eq!(cases.len(), 4);
        for case in &cases {
            assert_eq!(case.method, "POST");
            assert_eq!(case.expected_status, 201);
            assert!(case.has_body());
            assert_eq!(case.expected_med_name.as_deref(), case.payload["medName"].as_str());
        }
    }

    #[test]
    fn fixture_source_reads_payload_file() {
        let mut cfg = config(DataSource::Fixtures);
        cfg.data_files.medication_payloads =
            PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../data/medication_payloads.csv");
        let cases = medication_cases(&cfg, &mut generator(), 4).unwrap();
        assert_eq!(cases.len(), 5);
        assert!(cases.iter().any(|c| c.method == "GET" && c.expected_status == 404));
    }

    #[test]
    fn missing_fixture_file_is_configuration_error() {
        let mut cfg = config(DataSource::Fixtures);
        cfg.data_files.medication_payloads = PathBuf::from("/nonexistent/medications.csv");
        let err = medication_cases(&cfg, &mut generator(), 1).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
