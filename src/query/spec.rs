//! Author-supplied query declarations

use serde_json::Value;

use super::Filter;
use crate::transform::TransformFn;

/// How the stored value is derived from a fetched payload
#[derive(Clone)]
pub enum TransformSpec {
    /// `array`, `object`, or a name registered in the transform registry
    Named(String),
    /// Inline transform
    Custom(TransformFn),
}

impl Default for TransformSpec {
    fn default() -> Self {
        TransformSpec::Named("array".to_string())
    }
}

impl std::fmt::Debug for TransformSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransformSpec::Named(name) => f.debug_tuple("Named").field(name).finish(),
            TransformSpec::Custom(_) => f.write_str("Custom(<fn>)"),
        }
    }
}

/// A query as declared by a component, before normalization
#[derive(Debug, Clone, Default)]
pub struct QuerySpec {
    pub name: Option<String>,
    pub endpoint: Option<String>,
    pub filter: Filter,
    /// Default params: a JSON object, or null for none
    pub params: Value,
    pub auto_load: Option<bool>,
    pub transform: TransformSpec,
}

impl QuerySpec {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            ..Self::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_filter(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = filter.into();
        self
    }

    /// Default params (anything but an object or null fails normalization)
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }

    pub fn auto_load(mut self, auto_load: bool) -> Self {
        self.auto_load = Some(auto_load);
        self
    }

    pub fn with_transform(mut self, name: impl Into<String>) -> Self {
        self.transform = TransformSpec::Named(name.into());
        self
    }

    pub fn with_transform_fn(mut self, transform: TransformFn) -> Self {
        self.transform = TransformSpec::Custom(transform);
        self
    }
}
