//! Lifecycle event log
//!
//! Append-only record of everything a binding did, in order:
//! - Event: envelope with id + timestamp + kind
//! - EventKind: mount, scheduling, cycle outcome, teardown
//! - EventLog: thread-safe, cheap to clone (shared buffer)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Single event in a binding's log
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Monotonic sequence ID (for ordering)
    pub id: u64,
    /// Time since the log was created (ms)
    pub timestamp_ms: u64,
    /// Event type and data
    pub kind: EventKind,
}

/// Uses Arc<str> for query names to keep cloning cheap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    QueryMounted {
        query: Arc<str>,
        endpoint: String,
        auto_load: bool,
    },
    /// `load()` accepted, waiting on the debounce window
    LoadScheduled {
        query: Arc<str>,
        params: Value,
    },
    /// Filter said "not ready"; nothing changed
    LoadSkipped {
        query: Arc<str>,
    },
    LoadStarted {
        query: Arc<str>,
        seq: u64,
        url: String,
    },
    LoadSucceeded {
        query: Arc<str>,
        seq: u64,
        duration_ms: u64,
    },
    LoadFailed {
        query: Arc<str>,
        seq: u64,
        error: String,
        duration_ms: u64,
    },
    /// A newer cycle (or teardown) superseded this response
    StaleDiscarded {
        query: Arc<str>,
        seq: u64,
    },
    Disposed,
}

impl EventKind {
    /// Query name if the event concerns a single query
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::QueryMounted { query, .. }
            | Self::LoadScheduled { query, .. }
            | Self::LoadSkipped { query }
            | Self::LoadStarted { query, .. }
            | Self::LoadSucceeded { query, .. }
            | Self::LoadFailed { query, .. }
            | Self::StaleDiscarded { query, .. } => Some(query),
            Self::Disposed => None,
        }
    }
}

/// Thread-safe, append-only event log
#[derive(Debug, Clone)]
pub struct EventLog {
    events: Arc<RwLock<Vec<Event>>>,
    start_time: Instant,
    next_id: Arc<AtomicU64>,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            start_time: Instant::now(),
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Emit an event (returns its ID)
    pub fn emit(&self, kind: EventKind) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let event = Event {
            id,
            timestamp_ms: self.start_time.elapsed().as_millis() as u64,
            kind,
        };

        self.events.write().push(event);
        id
    }

    /// Get all events (cloned)
    pub fn events(&self) -> Vec<Event> {
        self.events.read().clone()
    }

    /// Events concerning one query
    pub fn filter_query(&self, query: &str) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|e| e.kind.query() == Some(query))
            .collect()
    }

    /// Count events matching a predicate
    pub fn count(&self, predicate: impl Fn(&EventKind) -> bool) -> usize {
        self.events.read().iter().filter(|e| predicate(&e.kind)).count()
    }

    /// Serialize to JSON for debugging
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.events()).unwrap_or(Value::Null)
    }

    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
