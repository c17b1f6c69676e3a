//! Per-query runtime state and render snapshots

use std::fmt;

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

use crate::query::Params;

/// Query status
///
/// Moves `idle|ok|error -> loading -> ok|error`, indefinitely.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum QueryStatus {
    #[default]
    Idle,
    Loading,
    Ok,
    /// Transport failure message
    Error(String),
}

impl QueryStatus {
    pub fn is_loading(&self) -> bool {
        matches!(self, QueryStatus::Loading)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, QueryStatus::Error(_))
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryStatus::Idle => write!(f, "idle"),
            QueryStatus::Loading => write!(f, "loading"),
            QueryStatus::Ok => write!(f, "ok"),
            QueryStatus::Error(message) => write!(f, "error: {}", message),
        }
    }
}

impl Serialize for QueryStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Mutable state of one query, owned by its manager
#[derive(Debug, Clone)]
pub struct QueryState {
    /// Current params (declared defaults merged with every load)
    pub params: Params,
    pub status: QueryStatus,
    pub data: Value,
    /// Filter used by the most recent cycle
    pub last_filter: Option<Value>,
    /// Id of the most recently started cycle
    pub(crate) seq: u64,
}

impl QueryState {
    pub fn new(params: Params, data: Value) -> Self {
        Self {
            params,
            status: QueryStatus::Idle,
            data,
            last_filter: None,
            seq: 0,
        }
    }
}

/// One query's rendered values
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotEntry {
    pub name: String,
    pub data: Value,
    pub status: QueryStatus,
}

/// Props handed to the UI layer
///
/// Each entry's data/status pair was read atomically, so an entry never mixes
/// data from one cycle with the status of another.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    entries: Vec<SnapshotEntry>,
}

impl Snapshot {
    pub(crate) fn new(entries: Vec<SnapshotEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[SnapshotEntry] {
        &self.entries
    }

    pub fn data(&self, name: &str) -> Option<&Value> {
        self.entry(name).map(|e| &e.data)
    }

    pub fn status(&self, name: &str) -> Option<&QueryStatus> {
        self.entry(name).map(|e| &e.status)
    }

    /// Prop lookup: `name` for data, `name_status` for status
    pub fn prop(&self, key: &str) -> Option<Value> {
        if let Some(entry) = self.entry(key) {
            return Some(entry.data.clone());
        }
        let name = key.strip_suffix("_status")?;
        self.entry(name).map(|e| Value::String(e.status.to_string()))
    }

    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.status.is_error())
    }

    /// `{ name: data, name_status: status }` in declaration order
    pub fn to_json(&self) -> Value {
        let mut map = Map::with_capacity(self.entries.len() * 2);
        for entry in &self.entries {
            map.insert(entry.name.clone(), entry.data.clone());
            map.insert(
                format!("{}_status", entry.name),
                Value::String(entry.status.to_string()),
            );
        }
        Value::Object(map)
    }

    fn entry(&self, name: &str) -> Option<&SnapshotEntry> {
        self.entries.iter().find(|e| e.name == name)
    }
}

impl Serialize for Snapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Snapshot {
        Snapshot::new(vec![
            SnapshotEntry {
                name: "users".to_string(),
                data: json!([{"id": 1}]),
                status: QueryStatus::Ok,
            },
            SnapshotEntry {
                name: "orders".to_string(),
                data: json!([]),
                status: QueryStatus::Error("Some error".to_string()),
            },
        ])
    }

    #[test]
    fn status_display() {
        assert_eq!(QueryStatus::Idle.to_string(), "idle");
        assert_eq!(QueryStatus::Loading.to_string(), "loading");
        assert_eq!(QueryStatus::Ok.to_string(), "ok");
        assert_eq!(
            QueryStatus::Error("Some error".to_string()).to_string(),
            "error: Some error"
        );
    }

    #[test]
    fn snapshot_props() {
        let snapshot = sample();
        assert_eq!(snapshot.prop("users"), Some(json!([{"id": 1}])));
        assert_eq!(snapshot.prop("users_status"), Some(json!("ok")));
        assert_eq!(snapshot.prop("orders_status"), Some(json!("error: Some error")));
        assert_eq!(snapshot.prop("missing"), None);
        assert!(snapshot.has_errors());
    }

    #[test]
    fn snapshot_json_keeps_declaration_order() {
        let json = sample().to_json();
        let keys: Vec<_> = json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, ["users", "users_status", "orders", "orders_status"]);
    }
}
