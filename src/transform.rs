//! # Transform Registry
//!
//! A transform folds a freshly fetched payload and the previously stored value
//! into the new stored value for one query:
//!
//! ```text
//! (json, previous, filter, params, options) -> new data
//! ```
//!
//! | Name | Behavior |
//! |------|----------|
//! | `array` | replace, or `previous ++ json` with `options.append` |
//! | `object` | index by `options.id` (default `id`), merged into `previous` unless `options.reset` |
//!
//! Custom transforms are registered by name (for declarative binding files) or
//! passed inline. Their return value is stored as-is. Transforms never mutate
//! `previous`; they only ever see borrowed inputs.

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use serde_json::{Map, Value};

use crate::error::BindError;
use crate::query::{LoadOptions, Params, TransformSpec};

/// Transform function signature
pub type TransformFn =
    Arc<dyn Fn(&Value, &Value, &Value, &Params, &LoadOptions) -> Value + Send + Sync>;

/// A resolved transform plus the empty value a query starts with
#[derive(Clone)]
pub struct Transform {
    name: Arc<str>,
    func: TransformFn,
    initial: Value,
}

impl Transform {
    pub fn array() -> Self {
        Self {
            name: Arc::from("array"),
            func: Arc::new(array),
            initial: Value::Array(Vec::new()),
        }
    }

    pub fn object() -> Self {
        Self {
            name: Arc::from("object"),
            func: Arc::new(object),
            initial: Value::Object(Map::new()),
        }
    }

    /// Custom transform; starts from an empty array unless overridden
    pub fn custom(name: impl Into<Arc<str>>, func: TransformFn) -> Self {
        Self {
            name: name.into(),
            func,
            initial: Value::Array(Vec::new()),
        }
    }

    pub fn with_initial(mut self, initial: Value) -> Self {
        self.initial = initial;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Data a query holds before its first successful load
    pub fn initial(&self) -> Value {
        self.initial.clone()
    }

    pub fn apply(
        &self,
        json: &Value,
        previous: &Value,
        filter: &Value,
        params: &Params,
        options: &LoadOptions,
    ) -> Value {
        (self.func)(json, previous, filter, params, options)
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transform")
            .field("name", &self.name)
            .field("initial", &self.initial)
            .finish()
    }
}

/// Replace, or append with `options.append`
pub fn array(
    json: &Value,
    previous: &Value,
    _filter: &Value,
    _params: &Params,
    options: &LoadOptions,
) -> Value {
    if !options.append {
        return json.clone();
    }

    let mut items = match previous {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    };
    match json {
        Value::Array(new_items) => items.extend(new_items.iter().cloned()),
        other => items.push(other.clone()),
    }
    Value::Array(items)
}

/// Index by `options.id`, merging into `previous` unless `options.reset`
///
/// Items without the key field are dropped.
pub fn object(
    json: &Value,
    previous: &Value,
    _filter: &Value,
    _params: &Params,
    options: &LoadOptions,
) -> Value {
    let id_field = options.id_field();
    let items: Vec<&Value> = match json {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![json],
        _ => Vec::new(),
    };

    let mut out = match (options.reset, previous) {
        (false, Value::Object(map)) => map.clone(),
        _ => Map::new(),
    };
    for item in items {
        if let Some(key) = item.get(id_field).and_then(key_string) {
            out.insert(key, item.clone());
        }
    }
    Value::Object(out)
}

/// Object key for an id value (`1` -> `"1"`)
fn key_string(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Named custom transforms, shared by every binding that uses the registry
#[derive(Clone, Default)]
pub struct TransformRegistry {
    custom: Arc<DashMap<String, Transform>>,
}

impl TransformRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `func` under `name` (builtin names cannot be shadowed)
    pub fn register<F>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(&Value, &Value, &Value, &Params, &LoadOptions) -> Value + Send + Sync + 'static,
    {
        let name = name.into();
        let transform = Transform::custom(name.as_str(), Arc::new(func));
        self.custom.insert(name, transform);
    }

    /// Register a fully built transform (custom initial value)
    pub fn insert(&self, transform: Transform) {
        self.custom.insert(transform.name().to_string(), transform);
    }

    pub fn contains(&self, name: &str) -> bool {
        matches!(name, "array" | "object") || self.custom.contains_key(name)
    }

    /// Resolve a declaration into a callable, once, at normalization time
    pub fn resolve(&self, query: &str, spec: &TransformSpec) -> Result<Transform, BindError> {
        match spec {
            TransformSpec::Custom(func) => Ok(Transform::custom(query, Arc::clone(func))),
            TransformSpec::Named(name) => match name.as_str() {
                "array" => Ok(Transform::array()),
                "object" => Ok(Transform::object()),
                other => self
                    .custom
                    .get(other)
                    .map(|t| t.clone())
                    .ok_or_else(|| BindError::UnknownTransform {
                        query: query.to_string(),
                        transform: other.to_string(),
                    }),
            },
        }
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self.custom.iter().map(|e| e.key().clone()).collect();
        names.sort();
        f.debug_struct("TransformRegistry").field("custom", &names).finish()
    }
}
