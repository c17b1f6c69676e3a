//! Per-call load options

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Flags for a single `load()` call, also handed to the transform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOptions {
    /// Clear stored params before merging the new ones
    #[serde(default)]
    pub reset_params: bool,
    /// `array` transform: append instead of replace
    #[serde(default)]
    pub append: bool,
    /// `object` transform: drop previously indexed entries
    #[serde(default)]
    pub reset: bool,
    /// `object` transform: key field (defaults to `id`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Anything else, for custom transforms
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset_params(mut self) -> Self {
        self.reset_params = true;
        self
    }

    pub fn append(mut self) -> Self {
        self.append = true;
        self
    }

    pub fn reset(mut self) -> Self {
        self.reset = true;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Key field for the `object` transform
    pub fn id_field(&self) -> &str {
        self.id.as_deref().unwrap_or("id")
    }
}
