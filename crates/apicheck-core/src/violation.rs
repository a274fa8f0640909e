//! # Violations: Structured Validation Output
//!
//! A [`Violation`] pins one failed constraint to a JSON pointer inside the
//! checked instance. The keyword set is closed: anything the underlying
//! JSON Schema engine reports outside it lands in [`Keyword::Other`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The constraint a violation was raised against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Keyword {
    Type,
    Format,
    Required,
    DependentRequired,
    MaxLength,
    MinLength,
    Minimum,
    Maximum,
    Enum,
    AdditionalProperties,
    MinItems,
    MaxItems,
    Other,
}

impl Keyword {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Type => "type",
            Self::Format => "format",
            Self::Required => "required",
            Self::DependentRequired => "dependentRequired",
            Self::MaxLength => "maxLength",
            Self::MinLength => "minLength",
            Self::Minimum => "minimum",
            Self::Maximum => "maximum",
            Self::Enum => "enum",
            Self::AdditionalProperties => "additionalProperties",
            Self::MinItems => "minItems",
            Self::MaxItems => "maxItems",
            Self::Other => "other",
        }
    }

    /// Map a JSON Schema keyword name to a [`Keyword`], if it is one we track.
    pub fn from_schema_keyword(name: &str) -> Option<Self> {
        Some(match name {
            "type" => Self::Type,
            "format" => Self::Format,
            "required" => Self::Required,
            "dependentRequired" => Self::DependentRequired,
            "maxLength" => Self::MaxLength,
            "minLength" => Self::MinLength,
            "minimum" | "exclusiveMinimum" => Self::Minimum,
            "maximum" | "exclusiveMaximum" => Self::Maximum,
            "enum" | "const" => Self::Enum,
            "additionalProperties" | "unevaluatedProperties" => Self::AdditionalProperties,
            "minItems" => Self::MinItems,
            "maxItems" => Self::MaxItems,
            _ => return None,
        })
    }
}

impl std::fmt::Display for Keyword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One failed constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// JSON pointer into the instance; empty for the root.
    pub path: String,
    pub keyword: Keyword,
    pub message: String,
    /// Keyword-specific detail (`missingProperty`, `limit`, ...).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub context: BTreeMap<String, Value>,
}

impl Violation {
    pub fn new(path: impl Into<String>, keyword: Keyword, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            keyword,
            message: message.into(),
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Context value as a string, when present and a string.
    pub fn context_str(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(Value::as_str)
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let path = if self.path.is_empty() {
            "(root)"
        } else {
            &self.path
        };
        write!(f, "{path} [{}]: {}", self.keyword, self.message)
    }
}

/// Outcome of checking one instance. `valid` iff `violations` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub violations: Vec<Violation>,
}

impl ValidationResult {
    pub fn from_violations(violations: Vec<Violation>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }

    pub fn ok() -> Self {
        Self::from_violations(Vec::new())
    }

    /// Violations raised against `keyword`.
    pub fn with_keyword(&self, keyword: Keyword) -> impl Iterator<Item = &Violation> {
        self.violations.iter().filter(move |v| v.keyword == keyword)
    }

    /// Comma-separated violation paths, for error messages.
    pub fn summary(&self) -> String {
        summarize(&self.violations)
    }
}

/// Render violations as `path [keyword]` pairs joined by `, `.
pub fn summarize(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| {
            let path = if v.path.is_empty() { "(root)" } else { &v.path };
            format!("{path} [{}]", v.keyword)
        })
        .collect::<Vec<_>>()
        .join(", ")
}
