//! # Declarative Schema Model
//!
//! A [`Schema`] describes the shape of a JSON object: its fields, which of
//! them are required, which become required when another field holds a given
//! value, and whether undeclared fields are tolerated.
//!
//! Schemas are pure data. They carry no validation logic of their own; the
//! validator in `apicheck-schema` lowers them to JSON Schema and evaluates
//! dependency rules generically. The serialized form (camelCase JSON or
//! YAML) is what the `schemas/` catalog files contain.
//!
//! ## Composition
//!
//! `extends` names another registered schema. The registry resolves it at
//! compile time with [`Schema::merged_over`]; the model itself never follows
//! the reference.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

fn default_true() -> bool {
    true
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// JSON type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Array,
}

impl FieldType {
    /// The JSON Schema `type` keyword value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Object => "object",
            Self::Array => "array",
        }
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// String formats understood by both the validator and the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    Email,
    Uri,
    DateTime,
    Date,
    Uuid,
    Ipv4,
}

impl StringFormat {
    /// The JSON Schema `format` keyword value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Uri => "uri",
            Self::DateTime => "date-time",
            Self::Date => "date",
            Self::Uuid => "uuid",
            Self::Ipv4 => "ipv4",
        }
    }
}

/// Descriptor for a single field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSchema {
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Whether `null` is an acceptable value.
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<StringFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<Value>>,
    /// Nested shape for `object` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Box<Schema>>,
    /// Element descriptor for `array` fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<FieldSchema>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
}

impl FieldSchema {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            nullable: false,
            format: None,
            min_length: None,
            max_length: None,
            minimum: None,
            maximum: None,
            enum_values: None,
            schema: None,
            items: None,
            min_items: None,
            max_items: None,
        }
    }

    pub fn string() -> Self {
        Self::new(FieldType::String)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn number() -> Self {
        Self::new(FieldType::Number)
    }

    pub fn boolean() -> Self {
        Self::new(FieldType::Boolean)
    }

    pub fn object(schema: Schema) -> Self {
        let mut field = Self::new(FieldType::Object);
        field.schema = Some(Box::new(schema));
        field
    }

    pub fn array(items: FieldSchema) -> Self {
        let mut field = Self::new(FieldType::Array);
        field.items = Some(Box::new(items));
        field
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_format(mut self, format: StringFormat) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_min_length(mut self, min: u64) -> Self {
        self.min_length = Some(min);
        self
    }

    pub fn with_max_length(mut self, max: u64) -> Self {
        self.max_length = Some(max);
        self
    }

    pub fn with_range(mut self, minimum: Option<f64>, maximum: Option<f64>) -> Self {
        self.minimum = minimum;
        self.maximum = maximum;
        self
    }

    pub fn with_enum<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enum_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_item_bounds(mut self, min: Option<u64>, max: Option<u64>) -> Self {
        self.min_items = min;
        self.max_items = max;
        self
    }
}

/// A conditional requirement: when `trigger` holds, every path in
/// `requires` must be present and non-null.
///
/// With `equals` set the rule fires only when the trigger field equals that
/// value; without it the rule fires whenever the trigger is present and
/// non-null. Entries in `requires` may be dotted (`prescriber.licenseNumber`),
/// in which case every segment must be present and non-null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DependentRule {
    pub trigger: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equals: Option<Value>,
    pub requires: Vec<String>,
    /// Dependents only make sense while the trigger holds. Used by the
    /// generator to drop orphaned fields; the validator does not enforce it.
    #[serde(default, skip_serializing_if = "is_false")]
    pub exclusive: bool,
}

impl DependentRule {
    pub fn when_present<I, S>(trigger: impl Into<String>, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trigger: trigger.into(),
            equals: None,
            requires: requires.into_iter().map(Into::into).collect(),
            exclusive: false,
        }
    }

    pub fn when_equals<I, S>(trigger: impl Into<String>, value: impl Into<Value>, requires: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            trigger: trigger.into(),
            equals: Some(value.into()),
            requires: requires.into_iter().map(Into::into).collect(),
            exclusive: false,
        }
    }

    pub fn exclusive(mut self) -> Self {
        self.exclusive = true;
        self
    }

    /// Whether the rule's condition holds for `object`.
    pub fn fires(&self, object: &Map<String, Value>) -> bool {
        match (&self.equals, object.get(&self.trigger)) {
            (Some(expected), Some(actual)) => expected == actual,
            (None, Some(actual)) => !actual.is_null(),
            (_, None) => false,
        }
    }

    /// Human-readable condition, e.g. `status is active`.
    pub fn describe_condition(&self) -> String {
        match &self.equals {
            Some(Value::String(s)) => format!("{} is {s}", self.trigger),
            Some(other) => format!("{} is {other}", self.trigger),
            None => format!("{} is present", self.trigger),
        }
    }
}

/// Declarative description of an object shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// Name of a registered base schema this one extends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub properties: BTreeMap<String, FieldSchema>,
    #[serde(default)]
    pub required: Vec<String>,
    #[serde(default)]
    pub dependent_required: Vec<DependentRule>,
    #[serde(default = "default_true")]
    pub additional_properties: bool,
    /// Whether a bare `null` instance satisfies the schema.
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            extends: None,
            properties: BTreeMap::new(),
            required: Vec::new(),
            dependent_required: Vec::new(),
            additional_properties: true,
            nullable: false,
        }
    }
}

impl Schema {
    /// An empty object schema that tolerates additional properties.
    pub fn object() -> Self {
        Self::default()
    }

    pub fn extending(mut self, base: impl Into<String>) -> Self {
        self.extends = Some(base.into());
        self
    }

    pub fn property(mut self, name: impl Into<String>, field: FieldSchema) -> Self {
        self.properties.insert(name.into(), field);
        self
    }

    /// Declare a property and mark it required.
    pub fn required_property(self, name: impl Into<String>, field: FieldSchema) -> Self {
        let name = name.into();
        self.property(name.clone(), field).require(name)
    }

    pub fn require(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.required.contains(&name) {
            self.required.push(name);
        }
        self
    }

    pub fn rule(mut self, rule: DependentRule) -> Self {
        self.dependent_required.push(rule);
        self
    }

    pub fn deny_additional(mut self) -> Self {
        self.additional_properties = false;
        self
    }

    pub fn allow_null(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|r| r == name)
    }

    /// Look up a field by dotted path, descending through nested objects.
    pub fn field(&self, dotted: &str) -> Option<&FieldSchema> {
        let mut segments = dotted.split('.');
        let first = segments.next()?;
        let mut current = self.properties.get(first)?;
        for segment in segments {
            current = current.schema.as_ref()?.properties.get(segment)?;
        }
        Some(current)
    }

    /// Every string field carrying a `maxLength`, as `(dotted path, limit)`,
    /// in property order with nested fields following their parent.
    pub fn max_length_fields(&self) -> Vec<(String, u64)> {
        let mut out = Vec::new();
        collect_max_lengths(self, "", &mut out);
        out
    }

    /// Overlay `self` on `base`: properties merge with `self` winning,
    /// `required` is the ordered union, rules run base-first. The result has
    /// no `extends`; `additionalProperties` and `nullable` come from `self`.
    pub fn merged_over(&self, base: &Schema) -> Schema {
        let mut properties = base.properties.clone();
        for (name, field) in &self.properties {
            properties.insert(name.clone(), field.clone());
        }

        let mut required = base.required.clone();
        for name in &self.required {
            if !required.contains(name) {
                required.push(name.clone());
            }
        }

        let mut dependent_required = base.dependent_required.clone();
        dependent_required.extend(self.dependent_required.iter().cloned());

        Schema {
            extends: None,
            properties,
            required,
            dependent_required,
            additional_properties: self.additional_properties,
            nullable: self.nullable,
        }
    }
}

fn collect_max_lengths(schema: &Schema, prefix: &str, out: &mut Vec<(String, u64)>) {
    for (name, field) in &schema.properties {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}.{name}")
        };
        if let Some(limit) = field.max_length {
            out.push((path.clone(), limit));
        }
        if let Some(nested) = &field.schema {
            collect_max_lengths(nested, &path, out);
        }
    }
}
