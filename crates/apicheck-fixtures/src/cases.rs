//! Data-driven request cases and login credentials.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FixtureError;
use crate::reader::read_structured_file;

const CONTROL_COLUMNS: [&str; 5] = [
    "testCaseName",
    "httpMethod",
    "medicationId",
    "expectedStatus",
    "expectedMedName",
];

/// One row of a data-driven suite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDrivenCase {
    pub name: String,
    /// Upper-cased HTTP method.
    pub method: String,
    pub resource_id: Option<String>,
    pub expected_status: u16,
    pub expected_med_name: Option<String>,
    /// Every non-control column; sent as the body for POST and PUT.
    pub payload: Value,
}

impl DataDrivenCase {
    /// Build a case from a fixture row. `index` is the zero-based data-row
    /// position, used for the default name. Rows without a method, without
    /// a numeric expected status, or (for GET/PUT/DELETE) without an id
    /// are skipped.
    pub fn from_row(index: usize, row: &Value) -> Option<Self> {
        let obj = row.as_object()?;
        let method = obj
            .get("httpMethod")
            .and_then(Value::as_str)
            .map(|m| m.trim().to_ascii_uppercase())
            .filter(|m| !m.is_empty());
        let Some(method) = method else {
            tracing::warn!(row = index + 2, "skipping fixture row without httpMethod");
            return None;
        };

        let Some(expected_status) = obj.get("expectedStatus").and_then(status_of) else {
            tracing::warn!(row = index + 2, %method, "skipping fixture row without expectedStatus");
            return None;
        };

        let resource_id = obj.get("medicationId").and_then(text_of);
        if matches!(method.as_str(), "GET" | "PUT" | "DELETE") && resource_id.is_none() {
            tracing::warn!(row = index + 2, %method, "skipping fixture row without medicationId");
            return None;
        }

        let name = obj
            .get("testCaseName")
            .and_then(text_of)
            .unwrap_or_else(|| format!("Row {} ({method})", index + 2));

        let payload: Map<String, Value> = obj
            .iter()
            .filter(|(k, _)| !CONTROL_COLUMNS.contains(&k.as_str()))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Some(Self {
            name,
            method,
            resource_id,
            expected_status,
            expected_med_name: obj.get("expectedMedName").and_then(text_of),
            payload: Value::Object(payload),
        })
    }

    /// Whether this case sends a body.
    pub fn has_body(&self) -> bool {
        matches!(self.method.as_str(), "POST" | "PUT" | "PATCH")
    }
}

/// Every usable case in `rows`.
pub fn cases_from_rows(rows: &[Value]) -> Vec<DataDrivenCase> {
    rows.iter()
        .enumerate()
        .filter_map(|(i, row)| DataDrivenCase::from_row(i, row))
        .collect()
}

/// Read a fixture file straight into cases.
pub fn load_cases(path: impl AsRef<Path>) -> Result<Vec<DataDrivenCase>, FixtureError> {
    Ok(cases_from_rows(&read_structured_file(path)?))
}

fn status_of(value: &Value) -> Option<u16> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn text_of(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Credentials read from a login fixture file.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
    pub provider_code: Option<String>,
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("provider_code", &self.provider_code)
            .finish()
    }
}

/// First row's `username`, `password` and optional `providerCode`.
pub fn load_login_credentials(path: impl AsRef<Path>) -> Result<LoginCredentials, FixtureError> {
    let path = path.as_ref();
    let origin = path.display().to_string();
    let rows = read_structured_file(path)?;
    let first = rows.first().ok_or_else(|| FixtureError::Empty {
        path: origin.clone(),
    })?;

    let column = |name: &str| -> Result<String, FixtureError> {
        first
            .get(name)
            .and_then(text_of)
            .ok_or_else(|| FixtureError::MissingColumn {
                path: origin.clone(),
                column: name.to_string(),
            })
    };

    Ok(LoginCredentials {
        username: column("username")?,
        password: column("password")?,
        provider_code: first.get("providerCode").and_then(text_of),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_becomes_case_with_payload() {
        let row = json!({
            "testCaseName": "Create controlled",
            "httpMethod": "post",
            "medicationId": null,
            "expectedStatus": 201,
            "expectedMedName": "Oxycodone",
            "medName": "Oxycodone",
            "controlledSubstance": true
        });
        let case = DataDrivenCase::from_row(0, &row).unwrap();
        assert_eq!(case.method, "POST");
        assert_eq!(case.expected_status, 201);
        assert_eq!(case.resource_id, None);
        assert!(case.has_body());
        assert_eq!(case.payload, json!({"medName": "Oxycodone", "controlledSubstance": true}));
    }

    #[test]
    fn default_name_uses_spreadsheet_row() {
        let row = json!({"httpMethod": "GET", "medicationId": 42, "expectedStatus": "200"});
        let case = DataDrivenCase::from_row(3, &row).unwrap();
        assert_eq!(case.name, "Row 5 (GET)");
        assert_eq!(case.resource_id.as_deref(), Some("42"));
        assert_eq!(case.expected_status, 200);
    }

    #[test]
    fn incomplete_rows_are_skipped() {
        let rows = vec![
            json!({"expectedStatus": 200}),
            json!({"httpMethod": "GET", "expectedStatus": "abc", "medicationId": "1"}),
            json!({"httpMethod": "DELETE", "expectedStatus": 204}),
            json!({"httpMethod": "DELETE", "expectedStatus": 204, "medicationId": "m-1"}),
        ];
        let cases = cases_from_rows(&rows);
        assert_eq!(cases.len(), 1);
        assert_eq!(cases[0].resource_id.as_deref(), Some("m-1"));
    }

    #[test]
    fn credentials_debug_is_redacted() {
        let creds = LoginCredentials {
            username: "testData".into(),
            password: "hunter22".into(),
            provider_code: None,
        };
        let debug = format!("{creds:?}");
        assert!(!debug.contains("hunter22"));
        assert!(debug.contains("REDACTED"));
    }
}
