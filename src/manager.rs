//! # Query Lifecycle Manager
//!
//! Owns the runtime state of every declared query and drives load cycles:
//!
//! ```text
//! load(name, params, options)
//!   -> merge params, schedule on the query's debouncer
//!   -> (window elapses) evaluate filter; skip if not ready
//!   -> build URL, seq += 1, status = loading, render
//!   -> fetch (spawned)
//!   -> seq still current?  transform + ok | error: <msg>, render
//!                          otherwise discard
//! ```
//!
//! Transport failures never reach the caller of [`QueryManager::load`]; they
//! only show up in the query's status. Configuration mistakes (unknown query,
//! malformed params, use after dispose) are returned immediately.
//!
//! Each load cycle is stamped with a per-query sequence number. A completing
//! cycle applies its result only if no newer cycle was started for the same
//! query in the meantime, so a slow stale response can never overwrite newer
//! data. [`QueryManager::dispose`] bumps every sequence number, which turns all
//! in-flight cycles stale.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde_json::Value;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, instrument, warn};

use crate::config::ConfigStore;
use crate::debounce::{Debouncer, DEFAULT_DEBOUNCE};
use crate::error::{BindError, FetchError};
use crate::event_log::{EventKind, EventLog};
use crate::query::{normalize, LoadOptions, NormalizedQuery, Params, QuerySpec};
use crate::state::{QueryState, QueryStatus, Snapshot, SnapshotEntry};
use crate::transform::TransformRegistry;
use crate::transport::Transport;
use crate::url_builder::build_url;

/// Re-render callback, invoked with a consistent snapshot
pub type RenderListener = Arc<dyn Fn(&Snapshot) + Send + Sync>;

/// Configures and mounts a [`QueryManager`]
pub struct ManagerBuilder {
    transport: Arc<dyn Transport>,
    config: Option<ConfigStore>,
    registry: TransformRegistry,
    debounce: Duration,
    events: EventLog,
    listeners: Vec<RenderListener>,
    runtime: Option<Handle>,
}

impl ManagerBuilder {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            config: None,
            registry: TransformRegistry::new(),
            debounce: DEFAULT_DEBOUNCE,
            events: EventLog::new(),
            listeners: Vec::new(),
            runtime: None,
        }
    }

    /// Run timers and requests on `runtime` instead of the caller's
    ///
    /// Lets a manager mounted from plain threads issue loads.
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Use `config` instead of the process-wide store
    pub fn config(mut self, config: ConfigStore) -> Self {
        self.config = Some(config);
        self
    }

    /// Registry consulted for named custom transforms
    pub fn registry(mut self, registry: TransformRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn debounce(mut self, window: Duration) -> Self {
        self.debounce = window;
        self
    }

    /// Record lifecycle events into an existing log
    pub fn event_log(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    /// Subscribe before mounting, so the auto-load render is observed too
    pub fn on_render<F>(mut self, listener: F) -> Self
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// Normalize `specs`, initialize state and start every auto-load
    ///
    /// Auto-loads start right away, bypassing the debounce window, so each
    /// auto-loading query is `loading` when this returns. Without a runtime
    /// (injected or current) mounting an auto-load query fails with
    /// [`BindError::NoRuntime`].
    pub fn mount(self, specs: Vec<QuerySpec>) -> Result<QueryManager, BindError> {
        let queries = normalize(specs, &self.registry)?;

        let runtime = self.runtime.or_else(|| Handle::try_current().ok());
        if runtime.is_none() {
            if let Some(query) = queries.iter().find(|q| q.auto_load) {
                return Err(BindError::NoRuntime {
                    name: query.name.clone(),
                });
            }
        }

        let activity = Arc::new(Notify::new());

        let mut index = FxHashMap::default();
        let slots = queries
            .into_iter()
            .enumerate()
            .map(|(i, query)| {
                index.insert(query.name.clone(), i);
                let state = QueryState::new(query.params.clone(), query.transform.initial());
                QuerySlot {
                    label: Arc::from(query.name.as_str()),
                    query,
                    state: Mutex::new(state),
                    debouncer: Arc::new(
                        Debouncer::new(self.debounce).with_notify(Arc::clone(&activity)),
                    ),
                }
            })
            .collect::<Vec<_>>();

        let inner = Arc::new(ManagerInner {
            slots,
            index,
            transport: self.transport,
            config: self.config.unwrap_or_else(ConfigStore::global),
            listeners: RwLock::new(self.listeners),
            events: self.events,
            disposed: AtomicBool::new(false),
            renders: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            activity,
            runtime,
        });

        for slot in &inner.slots {
            inner.events.emit(EventKind::QueryMounted {
                query: Arc::clone(&slot.label),
                endpoint: slot.query.endpoint.clone(),
                auto_load: slot.query.auto_load,
            });
        }

        for idx in 0..inner.slots.len() {
            if inner.slots[idx].query.auto_load {
                ManagerInner::fire(&inner, idx, LoadOptions::default());
            }
        }

        debug!(
            queries = inner.slots.len(),
            transport = inner.transport.name(),
            "binding mounted"
        );
        Ok(QueryManager { inner })
    }
}

/// Live set of queries for one binding (clone = same binding)
#[derive(Clone)]
pub struct QueryManager {
    inner: Arc<ManagerInner>,
}

struct QuerySlot {
    /// Query name, shared with every event
    label: Arc<str>,
    query: NormalizedQuery,
    state: Mutex<QueryState>,
    debouncer: Arc<Debouncer>,
}

struct ManagerInner {
    slots: Vec<QuerySlot>,
    index: FxHashMap<String, usize>,
    transport: Arc<dyn Transport>,
    config: ConfigStore,
    listeners: RwLock<Vec<RenderListener>>,
    events: EventLog,
    disposed: AtomicBool,
    renders: AtomicU64,
    /// Cycles started and not yet finished
    in_flight: AtomicUsize,
    /// Woken whenever a cycle finishes or a debouncer goes idle
    activity: Arc<Notify>,
    /// Where timers and fetches are spawned; None outside any runtime
    runtime: Option<Handle>,
}

/// Everything a started cycle needs after the fetch
struct Cycle {
    seq: u64,
    url: String,
    filter: Value,
    params: Params,
    options: LoadOptions,
}

impl QueryManager {
    /// Schedule a load of `name`
    ///
    /// `params` must be a JSON object (or null for none); it is shallow-merged
    /// into the query's stored params. The request itself is made once the
    /// debounce window elapses without another `load` of the same query.
    pub fn load(&self, name: &str, params: Value, options: LoadOptions) -> Result<(), BindError> {
        let inner = &self.inner;
        if inner.disposed.load(Ordering::SeqCst) {
            return Err(BindError::Disposed {
                name: name.to_string(),
            });
        }
        let idx = inner.slot_index(name)?;
        let runtime = inner.runtime.as_ref().ok_or_else(|| BindError::NoRuntime {
            name: name.to_string(),
        })?;
        let params = match params {
            Value::Null => Params::new(),
            Value::Object(map) => map,
            other => {
                return Err(BindError::InvalidParams {
                    name: name.to_string(),
                    got: other.to_string(),
                })
            }
        };

        let slot = &inner.slots[idx];
        let merged = {
            let mut state = slot.state.lock();
            if options.reset_params {
                state.params.clear();
            }
            state.params.extend(params);
            state.params.clone()
        };

        inner.events.emit(EventKind::LoadScheduled {
            query: Arc::clone(&slot.label),
            params: Value::Object(merged),
        });

        let weak: Weak<ManagerInner> = Arc::downgrade(inner);
        slot.debouncer.schedule(runtime, move || {
            if let Some(inner) = weak.upgrade() {
                ManagerInner::fire(&inner, idx, options);
            }
        });
        Ok(())
    }

    /// Tear down: cancel pending loads and discard in-flight responses
    ///
    /// Idempotent. Every later [`load`](Self::load) fails with
    /// [`BindError::Disposed`].
    pub fn dispose(&self) {
        let inner = &self.inner;
        if inner.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        for slot in &inner.slots {
            slot.debouncer.cancel();
            slot.state.lock().seq += 1;
        }
        inner.listeners.write().clear();
        inner.events.emit(EventKind::Disposed);
        inner.activity.notify_waiters();
        debug!("binding disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }

    /// Current props, in declaration order
    pub fn snapshot(&self) -> Snapshot {
        self.inner.snapshot()
    }

    /// Register a re-render callback
    pub fn subscribe<F>(&self, listener: F)
    where
        F: Fn(&Snapshot) + Send + Sync + 'static,
    {
        if self.is_disposed() {
            return;
        }
        self.inner.listeners.write().push(Arc::new(listener));
    }

    /// Number of re-render signals sent so far
    pub fn render_count(&self) -> u64 {
        self.inner.renders.load(Ordering::SeqCst)
    }

    /// Wait until no load is scheduled and no cycle is in flight
    pub async fn settled(&self) {
        loop {
            let notified = self.inner.activity.notified();
            if self.is_settled() {
                return;
            }
            notified.await;
        }
    }

    pub fn is_settled(&self) -> bool {
        let inner = &self.inner;
        if inner.disposed.load(Ordering::SeqCst) {
            return true;
        }
        inner.in_flight.load(Ordering::SeqCst) == 0
            && inner.slots.iter().all(|s| !s.debouncer.is_pending())
    }

    pub fn query_names(&self) -> Vec<&str> {
        self.inner.slots.iter().map(|s| s.query.name.as_str()).collect()
    }

    pub fn params(&self, name: &str) -> Option<Params> {
        self.inner.slot(name).map(|s| s.state.lock().params.clone())
    }

    pub fn status(&self, name: &str) -> Option<QueryStatus> {
        self.inner.slot(name).map(|s| s.state.lock().status.clone())
    }

    pub fn data(&self, name: &str) -> Option<Value> {
        self.inner.slot(name).map(|s| s.state.lock().data.clone())
    }

    /// Filter used by the most recent cycle of `name`
    pub fn last_filter(&self, name: &str) -> Option<Value> {
        self.inner.slot(name).and_then(|s| s.state.lock().last_filter.clone())
    }

    pub fn events(&self) -> &EventLog {
        &self.inner.events
    }
}

impl std::fmt::Debug for QueryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryManager")
            .field("queries", &self.query_names())
            .field("transport", &self.inner.transport.name())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

impl ManagerInner {
    fn slot(&self, name: &str) -> Option<&QuerySlot> {
        self.index.get(name).map(|&i| &self.slots[i])
    }

    fn slot_index(&self, name: &str) -> Result<usize, BindError> {
        self.index
            .get(name)
            .copied()
            .ok_or_else(|| BindError::UnknownQuery {
                name: name.to_string(),
                available: self.slots.iter().map(|s| s.query.name.clone()).collect(),
            })
    }

    fn snapshot(&self) -> Snapshot {
        let entries = self
            .slots
            .iter()
            .map(|slot| {
                let state = slot.state.lock();
                SnapshotEntry {
                    name: slot.query.name.clone(),
                    data: state.data.clone(),
                    status: state.status.clone(),
                }
            })
            .collect();
        Snapshot::new(entries)
    }

    fn signal_render(&self) {
        self.renders.fetch_add(1, Ordering::SeqCst);
        let listeners = self.listeners.read().clone();
        if listeners.is_empty() {
            return;
        }
        let snapshot = self.snapshot();
        for listener in &listeners {
            listener(&snapshot);
        }
    }

    /// Start a cycle and spawn its completion
    fn fire(inner: &Arc<Self>, idx: usize, options: LoadOptions) {
        let Some(runtime) = &inner.runtime else {
            return;
        };
        if let Some(cycle) = inner.begin_cycle(idx, options) {
            let task = Arc::clone(inner);
            runtime.spawn(async move { task.finish_cycle(idx, cycle).await });
        }
        inner.activity.notify_waiters();
    }

    fn begin_cycle(&self, idx: usize, options: LoadOptions) -> Option<Cycle> {
        if self.disposed.load(Ordering::SeqCst) {
            return None;
        }
        let slot = &self.slots[idx];

        // Filter runs unlocked: it is caller code and may read the manager
        let params = slot.state.lock().params.clone();
        let Some(filter) = slot.query.filter.evaluate(&params) else {
            debug!(query = %slot.label, "filter not ready, load skipped");
            self.events.emit(EventKind::LoadSkipped {
                query: Arc::clone(&slot.label),
            });
            return None;
        };
        let url = build_url(&self.config, &slot.query.endpoint, Some(&filter));

        let cycle = {
            let mut state = slot.state.lock();
            state.seq += 1;
            state.status = QueryStatus::Loading;
            state.last_filter = Some(filter.clone());
            self.in_flight.fetch_add(1, Ordering::SeqCst);

            Cycle {
                seq: state.seq,
                url,
                filter,
                params,
                options,
            }
        };

        self.events.emit(EventKind::LoadStarted {
            query: Arc::clone(&slot.label),
            seq: cycle.seq,
            url: cycle.url.clone(),
        });
        self.signal_render();
        Some(cycle)
    }

    #[instrument(skip(self, cycle), fields(query = %self.slots[idx].label, seq = cycle.seq))]
    async fn finish_cycle(&self, idx: usize, cycle: Cycle) {
        let slot = &self.slots[idx];
        let started = tokio::time::Instant::now();
        let result = self.transport.fetch_json(&cycle.url).await;
        let duration_ms = started.elapsed().as_millis() as u64;

        if self.apply(slot, &cycle, result, duration_ms) {
            self.signal_render();
        } else {
            debug!("stale response discarded");
            self.events.emit(EventKind::StaleDiscarded {
                query: Arc::clone(&slot.label),
                seq: cycle.seq,
            });
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.activity.notify_waiters();
    }

    /// Store the outcome of `cycle`; false if it was superseded
    fn apply(
        &self,
        slot: &QuerySlot,
        cycle: &Cycle,
        result: Result<Value, FetchError>,
        duration_ms: u64,
    ) -> bool {
        let is_current = |state: &QueryState| {
            !self.disposed.load(Ordering::SeqCst) && state.seq == cycle.seq
        };

        let outcome = match result {
            Ok(json) => {
                let previous = {
                    let state = slot.state.lock();
                    if !is_current(&state) {
                        return false;
                    }
                    state.data.clone()
                };
                // Transform runs unlocked: it is caller code
                let data = slot.query.transform.apply(
                    &json,
                    &previous,
                    &cycle.filter,
                    &cycle.params,
                    &cycle.options,
                );

                let mut state = slot.state.lock();
                if !is_current(&state) {
                    return false;
                }
                state.data = data;
                state.status = QueryStatus::Ok;
                EventKind::LoadSucceeded {
                    query: Arc::clone(&slot.label),
                    seq: cycle.seq,
                    duration_ms,
                }
            }
            Err(err) => {
                let mut state = slot.state.lock();
                if !is_current(&state) {
                    return false;
                }
                warn!(error = %err, "load failed");
                state.status = QueryStatus::Error(err.message());
                EventKind::LoadFailed {
                    query: Arc::clone(&slot.label),
                    seq: cycle.seq,
                    error: err.message(),
                    duration_ms,
                }
            }
        };

        self.events.emit(outcome);
        true
    }
}
