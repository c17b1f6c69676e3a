//! restbind - REST data binding for UI components
//!
//! Declares named queries against a REST API, loads them with debouncing and
//! stale-response protection, and renders their data and status as props.

pub mod binding;
pub mod bindfile;
pub mod config;
pub mod debounce;
pub mod error;
pub mod event_log;
pub mod manager;
pub mod query;
pub mod state;
pub mod transform;
pub mod transport;
pub mod url_builder;

pub use binding::{Binding, Component, LoadHandle};
pub use bindfile::{BindingFile, QueryDecl, BINDING_SCHEMA};
pub use config::ConfigStore;
pub use error::{BindError, FetchError, FixSuggestion};
pub use event_log::{Event, EventKind, EventLog};
pub use manager::{ManagerBuilder, QueryManager, RenderListener};
pub use query::{Filter, LoadOptions, NormalizedQuery, Params, QuerySpec, TransformSpec};
pub use state::{QueryStatus, Snapshot, SnapshotEntry};
pub use transform::{Transform, TransformFn, TransformRegistry};
pub use transport::{create_transport, HttpTransport, MockReply, MockTransport, Transport};
pub use url_builder::build_url;
