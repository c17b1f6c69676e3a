//! Error types with fix suggestions
//!
//! `BindError` is the configuration family: it is raised synchronously to
//! whoever declared or triggered the offending query. `FetchError` is the
//! transport family: it is captured per query and only ever observed through
//! that query's status.

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Configuration and setup errors (fail fast, never swallowed)
#[derive(Error, Debug)]
pub enum BindError {
    // ─────────────────────────────────────────────────────────────
    // Query declaration errors (BIND-010 to BIND-013)
    // ─────────────────────────────────────────────────────────────

    #[error("BIND-010: Query #{index} has no endpoint")]
    MissingEndpoint { index: usize },

    #[error("BIND-011: Duplicate query name '{name}'")]
    DuplicateName { name: String },

    #[error("BIND-012: Query '{query}' uses unknown transform '{transform}'")]
    UnknownTransform { query: String, transform: String },

    #[error("BIND-013: Default params of query #{index} ('{name}') must be a JSON object, got {got}")]
    InvalidDefaultParams {
        index: usize,
        name: String,
        got: String,
    },

    // ─────────────────────────────────────────────────────────────
    // Load call errors (BIND-020 to BIND-023)
    // ─────────────────────────────────────────────────────────────

    #[error("BIND-020: Unknown query '{name}'")]
    UnknownQuery { name: String, available: Vec<String> },

    #[error("BIND-021: Binding was disposed, cannot load '{name}'")]
    Disposed { name: String },

    #[error("BIND-022: Params for '{name}' must be a JSON object, got {got}")]
    InvalidParams { name: String, got: String },

    #[error("BIND-023: No tokio runtime to load '{name}' on")]
    NoRuntime { name: String },

    // ─────────────────────────────────────────────────────────────
    // Binding file / CLI / setup errors (BIND-030 to BIND-032)
    // ─────────────────────────────────────────────────────────────

    #[error("BIND-030: Invalid binding file: {details}")]
    InvalidBindingFile { details: String },

    #[error("BIND-031: Invalid key=value pair '{pair}'")]
    InvalidPair { pair: String },

    #[error("BIND-032: Unknown transport '{name}'")]
    UnknownTransport { name: String },

    #[error("Transport setup failed: {0}")]
    TransportSetup(#[from] FetchError),

    #[error("YAML parse error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FixSuggestion for BindError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            BindError::MissingEndpoint { .. } => Some("Every query needs an endpoint: field"),
            BindError::DuplicateName { .. } => {
                Some("Give one of the queries an explicit name: (names default to the endpoint)")
            }
            BindError::UnknownTransform { .. } => {
                Some("Use 'array', 'object' or register the custom transform before mounting")
            }
            BindError::InvalidDefaultParams { .. } => {
                Some("Declare params as a mapping, e.g. params: { page: 1 }")
            }
            BindError::UnknownQuery { .. } => Some("Check the query name against the declared queries"),
            BindError::Disposed { .. } => Some("Keep the binding alive while issuing loads"),
            BindError::InvalidParams { .. } => Some("Pass params as an object, e.g. {\"page\": 2}"),
            BindError::NoRuntime { .. } => {
                Some("Mount inside a tokio runtime or pass one with ManagerBuilder::runtime")
            }
            BindError::InvalidBindingFile { .. } => {
                Some("Start the file with: schema: restbind/binding@0.1")
            }
            BindError::InvalidPair { .. } => Some("Use key=value (the value may be JSON, e.g. page=2)"),
            BindError::UnknownTransport { .. } => Some("Available transports: http, mock"),
            BindError::TransportSetup(_) => Some("Check the TLS/HTTP client setup of this host"),
            BindError::YamlParse(_) => Some("Check YAML syntax: indentation and quoting"),
            BindError::Json(_) => Some("Check the JSON value is well formed"),
            BindError::Io(_) => Some("Check file path and permissions"),
        }
    }
}

/// Transport errors, captured into a query's status
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FetchError {
    /// Non-ok HTTP response
    #[error("HTTP {status}: {status_text}")]
    Status { status: u16, status_text: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

impl FetchError {
    /// Non-ok response carrying the given status text
    pub fn status(status: u16, status_text: impl Into<String>) -> Self {
        FetchError::Status {
            status,
            status_text: status_text.into(),
        }
    }

    /// Human-readable message stored in `error: <message>`
    ///
    /// For HTTP failures this is the bare status text.
    pub fn message(&self) -> String {
        match self {
            FetchError::Status { status_text, .. } => status_text.clone(),
            FetchError::Network(msg) | FetchError::InvalidUrl(msg) | FetchError::Decode(msg) => {
                msg.clone()
            }
        }
    }
}
