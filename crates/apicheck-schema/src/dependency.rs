//! Evaluation of value-conditional dependency rules.

use std::collections::HashSet;

use apicheck_core::{Keyword, Schema, Violation};
use serde_json::{Map, Value};

/// Escape one JSON pointer reference token.
pub(crate) fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Every unmet dependency in `instance`, including nested objects and
/// objects inside arrays. Duplicates (same location, same missing field)
/// are reported once.
pub(crate) fn check(schema: &Schema, instance: &Value) -> Vec<Violation> {
    let mut out = Vec::new();
    walk(schema, instance, "", &mut out);

    let mut seen = HashSet::new();
    out.retain(|v| {
        let missing = v.context_str("missingProperty").unwrap_or_default().to_string();
        seen.insert((v.path.clone(), missing))
    });
    out
}

fn walk(schema: &Schema, value: &Value, pointer: &str, out: &mut Vec<Violation>) {
    let Some(obj) = value.as_object() else {
        return;
    };

    for rule in &schema.dependent_required {
        if !rule.fires(obj) {
            continue;
        }
        let trigger_value = obj.get(&rule.trigger).cloned().unwrap_or(Value::Null);
        for dep in &rule.requires {
            if let Some(parent) = missing_location(obj, dep, pointer) {
                out.push(
                    Violation::new(
                        parent,
                        Keyword::DependentRequired,
                        format!("{dep} is required when {}", rule.describe_condition()),
                    )
                    .with_context("missingProperty", dep.as_str())
                    .with_context("trigger", rule.trigger.as_str())
                    .with_context("triggerValue", trigger_value.clone()),
                );
            }
        }
    }

    for (name, field) in &schema.properties {
        let Some(child) = obj.get(name) else {
            continue;
        };
        let child_pointer = format!("{pointer}/{}", escape_token(name));
        if let Some(nested) = &field.schema {
            walk(nested, child, &child_pointer, out);
        }
        if let (Some(nested), Some(elements)) = (
            field.items.as_ref().and_then(|i| i.schema.as_ref()),
            child.as_array(),
        ) {
            for (i, element) in elements.iter().enumerate() {
                walk(nested, element, &format!("{child_pointer}/{i}"), out);
            }
        }
    }
}

/// Pointer to the object in which the first absent or null segment of
/// `dotted` was expected, or `None` when every segment is present.
fn missing_location(obj: &Map<String, Value>, dotted: &str, pointer: &str) -> Option<String> {
    let mut current = obj;
    let mut location = pointer.to_string();
    let mut segments = dotted.split('.').peekable();

    while let Some(segment) = segments.next() {
        let is_last = segments.peek().is_none();
        match current.get(segment) {
            None | Some(Value::Null) => return Some(location),
            Some(_) if is_last => return None,
            Some(Value::Object(next)) => {
                location.push('/');
                location.push_str(&escape_token(segment));
                current = next;
            }
            // A scalar where an object was expected cannot hold the child.
            Some(_) => {
                location.push('/');
                location.push_str(&escape_token(segment));
                return Some(location);
            }
        }
    }
    None
}
