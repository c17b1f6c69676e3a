//! Process-wide key/value configuration
//!
//! Read by the URL builder on every request, so values set by the host
//! application are observed by the next load without any per-binding caching.

use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::{Map, Value};

/// Key holding the API base URL
pub const BASE_URL_KEY: &str = "baseUrl";
/// Key holding the static access token appended to every request
pub const ACCESS_TOKEN_KEY: &str = "access_token";

/// Environment variable read into [`BASE_URL_KEY`] by [`ConfigStore::load_env`]
pub const BASE_URL_ENV: &str = "RESTBIND_BASE_URL";
/// Environment variable read into [`ACCESS_TOKEN_KEY`] by [`ConfigStore::load_env`]
pub const ACCESS_TOKEN_ENV: &str = "RESTBIND_ACCESS_TOKEN";

static GLOBAL: Lazy<ConfigStore> = Lazy::new(ConfigStore::new);

/// Shared mutable configuration map (clone = same store)
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    values: Arc<RwLock<Map<String, Value>>>,
}

impl ConfigStore {
    /// Create an empty, independent store
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide store used when no store is injected
    pub fn global() -> ConfigStore {
        GLOBAL.clone()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.values.read().get(key).cloned()
    }

    /// Get a value as a string, ignoring non-string values
    pub fn get_str(&self, key: &str) -> Option<String> {
        match self.values.read().get(key) {
            Some(Value::String(s)) => Some(s.clone()),
            _ => None,
        }
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Bulk-assign every entry of `map`
    pub fn set_many(&self, map: Map<String, Value>) {
        let mut values = self.values.write();
        for (key, value) in map {
            values.insert(key, value);
        }
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.values.write().remove(key)
    }

    /// Copy of the current contents
    pub fn snapshot(&self) -> Map<String, Value> {
        self.values.read().clone()
    }

    /// Copy `RESTBIND_BASE_URL` / `RESTBIND_ACCESS_TOKEN` into the store
    ///
    /// Unset variables leave existing values alone.
    pub fn load_env(&self) {
        for (env, key) in [(BASE_URL_ENV, BASE_URL_KEY), (ACCESS_TOKEN_ENV, ACCESS_TOKEN_KEY)] {
            if let Ok(value) = std::env::var(env) {
                tracing::debug!(key, "config loaded from environment");
                self.set(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_and_get() {
        let store = ConfigStore::new();
        assert!(store.get(BASE_URL_KEY).is_none());

        store.set(BASE_URL_KEY, "http://x/api");
        assert_eq!(store.get_str(BASE_URL_KEY).as_deref(), Some("http://x/api"));
    }

    #[test]
    fn clones_share_state() {
        let store = ConfigStore::new();
        let other = store.clone();
        other.set(ACCESS_TOKEN_KEY, "abc");
        assert_eq!(store.get(ACCESS_TOKEN_KEY), Some(json!("abc")));
    }

    #[test]
    fn set_many_merges() {
        let store = ConfigStore::new();
        store.set("keep", 1);
        store.set("replace", 1);

        let map = json!({ "replace": 2, "new": 3 });
        store.set_many(map.as_object().cloned().unwrap());

        assert_eq!(store.get("keep"), Some(json!(1)));
        assert_eq!(store.get("replace"), Some(json!(2)));
        assert_eq!(store.get("new"), Some(json!(3)));
    }

    #[test]
    fn get_str_ignores_non_strings() {
        let store = ConfigStore::new();
        store.set(ACCESS_TOKEN_KEY, 42);
        assert!(store.get_str(ACCESS_TOKEN_KEY).is_none());
    }

    #[test]
    fn remove_returns_previous() {
        let store = ConfigStore::new();
        store.set("k", "v");
        assert_eq!(store.remove("k"), Some(json!("v")));
        assert!(store.snapshot().is_empty());
    }
}
