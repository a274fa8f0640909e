//! # Schema Registry
//!
//! Name → schema mapping. Registered schemas are immutable: a second
//! registration under the same name is rejected rather than replacing the
//! first. Compiled validators are cached per `(name, policy)` so repeated
//! lookups from test suites compile once.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use apicheck_core::Schema;
use parking_lot::RwLock;
use serde_json::Value;

use crate::catalog;
use crate::coerce::CoercionPolicy;
use crate::error::SchemaError;
use crate::validate::CompiledSchema;

const JSON_SUFFIX: &str = ".schema.json";
const YAML_SUFFIX: &str = ".schema.yaml";

#[derive(Default)]
pub struct SchemaRegistry {
    schemas: BTreeMap<String, Schema>,
    compiled: RwLock<HashMap<(String, CoercionPolicy), Arc<CompiledSchema>>>,
}

impl std::fmt::Debug for SchemaRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SchemaRegistry")
            .field("schemas", &self.schemas.keys().collect::<Vec<_>>())
            .field("compiled", &self.compiled.read().len())
            .finish()
    }
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry preloaded with the shipped catalog.
    pub fn builtin() -> Result<Self, SchemaError> {
        let mut registry = Self::new();
        for (name, source) in catalog::BUILTIN {
            let schema = parse_json(name, source)?;
            registry.register(*name, schema)?;
        }
        Ok(registry)
    }

    /// Load every `*.schema.json` and `*.schema.yaml` file in `dir`, keyed
    /// by the file name without its suffix.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| SchemaError::Load {
            path: dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| SchemaError::Load {
                path: dir.display().to_string(),
                reason: e.to_string(),
            })?;
            files.push(entry.path());
        }
        files.sort();

        let mut registry = Self::new();
        for path in files {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let (name, is_yaml) = if let Some(stem) = file_name.strip_suffix(JSON_SUFFIX) {
                (stem.to_string(), false)
            } else if let Some(stem) = file_name.strip_suffix(YAML_SUFFIX) {
                (stem.to_string(), true)
            } else {
                continue;
            };

            let content = std::fs::read_to_string(&path).map_err(|e| SchemaError::Load {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;
            let schema = if is_yaml {
                parse_yaml(&path.display().to_string(), &content)?
            } else {
                parse_json(&path.display().to_string(), &content)?
            };
            registry.register(name, schema)?;
        }

        tracing::debug!(dir = %dir.display(), count = registry.len(), "loaded schema directory");
        Ok(registry)
    }

    /// Register `schema` under `name`. Fails if the name is taken.
    pub fn register(&mut self, name: impl Into<String>, schema: Schema) -> Result<(), SchemaError> {
        let name = name.into();
        if self.schemas.contains_key(&name) {
            return Err(SchemaError::AlreadyRegistered { name });
        }
        self.schemas.insert(name, schema);
        Ok(())
    }

    /// The schema as registered (with `extends` unresolved).
    pub fn get(&self, name: &str) -> Result<&Schema, SchemaError> {
        self.schemas.get(name).ok_or_else(|| SchemaError::NotFound {
            name: name.to_string(),
        })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.schemas.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.schemas.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// The schema with its whole `extends` chain flattened in.
    pub fn resolve(&self, name: &str) -> Result<Schema, SchemaError> {
        let mut chain = vec![name.to_string()];
        let mut layers = vec![self.get(name)?];

        while let Some(base) = layers.last().and_then(|s| s.extends.clone()) {
            let looped = chain.contains(&base);
            chain.push(base.clone());
            if looped {
                return Err(SchemaError::CompositionCycle { chain });
            }
            layers.push(self.get(&base)?);
        }

        // Innermost base first, each overlay applied on top.
        let mut layers = layers.into_iter().rev();
        let mut flat = match layers.next() {
            Some(root) => root.clone(),
            None => return Err(SchemaError::NotFound { name: name.to_string() }),
        };
        flat.extends = None;
        for overlay in layers {
            flat = overlay.merged_over(&flat);
        }
        Ok(flat)
    }

    /// Compiled validator for `name`, built on first use and cached.
    pub fn validator(
        &self,
        name: &str,
        policy: CoercionPolicy,
    ) -> Result<Arc<CompiledSchema>, SchemaError> {
        let key = (name.to_string(), policy);
        if let Some(hit) = self.compiled.read().get(&key) {
            return Ok(Arc::clone(hit));
        }

        let flat = self.resolve(name)?;
        let compiled = Arc::new(CompiledSchema::compile(name, &flat, policy)?);
        let mut cache = self.compiled.write();
        let entry = cache.entry(key).or_insert(compiled);
        Ok(Arc::clone(entry))
    }
}

fn parse_json(origin: &str, source: &str) -> Result<Schema, SchemaError> {
    serde_json::from_str(source).map_err(|e| SchemaError::Load {
        path: origin.to_string(),
        reason: e.to_string(),
    })
}

fn parse_yaml(origin: &str, source: &str) -> Result<Schema, SchemaError> {
    let load_err = |reason: String| SchemaError::Load {
        path: origin.to_string(),
        reason,
    };
    let value: Value = serde_yaml::from_str(source).map_err(|e| load_err(e.to_string()))?;
    serde_json::from_value(value).map_err(|e| load_err(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use apicheck_core::{DependentRule, FieldSchema};

    fn base() -> Schema {
        Schema::object()
            .required_property("name", FieldSchema::string())
            .property("status", FieldSchema::string())
            .rule(DependentRule::when_equals("status", "active", ["activationDate"]))
    }

    #[test]
    fn unknown_name_is_not_found() {
        let registry = SchemaRegistry::new();
        assert!(matches!(
            registry.get("ghost"),
            Err(SchemaError::NotFound { name }) if name == "ghost"
        ));
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut registry = SchemaRegistry::new();
        registry.register("base", base()).unwrap();
        let err = registry.register("base", Schema::object()).unwrap_err();
        assert!(matches!(err, SchemaError::AlreadyRegistered { .. }));
        assert_eq!(registry.get("base").unwrap(), &base());
    }

    #[test]
    fn resolve_flattens_multi_level_chain() {
        let mut registry = SchemaRegistry::new();
        registry.register("base", base()).unwrap();
        registry
            .register(
                "middle",
                Schema::object()
                    .extending("base")
                    .required_property("updatedBy", FieldSchema::string()),
            )
            .unwrap();
        registry
            .register(
                "leaf",
                Schema::object()
                    .extending("middle")
                    .required_property("id", FieldSchema::string())
                    .rule(DependentRule::when_present("id", ["createdAt"])),
            )
            .unwrap();

        let flat = registry.resolve("leaf").unwrap();
        assert_eq!(flat.extends, None);
        assert_eq!(flat.required, vec!["name", "updatedBy", "id"]);
        assert_eq!(flat.dependent_required.len(), 2);
        assert_eq!(flat.dependent_required[0].trigger, "status");
    }

    #[test]
    fn cycles_are_detected() {
        let mut registry = SchemaRegistry::new();
        registry.register("a", Schema::object().extending("b")).unwrap();
        registry.register("b", Schema::object().extending("a")).unwrap();
        match registry.resolve("a") {
            Err(SchemaError::CompositionCycle { chain }) => assert_eq!(chain, vec!["a", "b", "a"]),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn missing_base_is_not_found() {
        let mut registry = SchemaRegistry::new();
        registry.register("child", Schema::object().extending("absent")).unwrap();
        assert!(matches!(registry.resolve("child"), Err(SchemaError::NotFound { .. })));
    }

    #[test]
    fn validators_are_cached_per_policy() {
        let mut registry = SchemaRegistry::new();
        registry.register("base", base()).unwrap();
        let a = registry.validator("base", CoercionPolicy::Strict).unwrap();
        let b = registry.validator("base", CoercionPolicy::Strict).unwrap();
        let c = registry.validator("base", CoercionPolicy::Lenient).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(c.policy(), CoercionPolicy::Lenient);
    }

    #[test]
    fn builtin_catalog_loads_and_compiles() {
        let registry = SchemaRegistry::builtin().unwrap();
        assert_eq!(registry.len(), catalog::BUILTIN.len());
        for name in registry.names() {
            registry
                .validator(name, CoercionPolicy::Strict)
                .unwrap_or_else(|e| panic!("{name}: {e}"));
        }
    }
}
