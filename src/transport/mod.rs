//! # Transport Abstraction Layer
//!
//! The single collaborator the lifecycle manager talks to the network through:
//!
//! - [`Transport`] - `fetch_json(url)` over an abstract HTTP GET
//! - [`HttpTransport`] - production transport on a shared `reqwest::Client`
//! - [`MockTransport`] - scripted replies and request recording for tests
//!
//! A non-ok response must surface as [`FetchError::Status`] carrying the
//! response's status text; that text becomes the query status
//! `error: <status text>`.
//!
//! ## Creating Transports
//!
//! ```rust
//! use restbind::transport::create_transport;
//!
//! assert!(create_transport("http").is_ok());
//! assert!(create_transport("mock").is_ok());
//! assert!(create_transport("carrier-pigeon").is_err());
//! ```

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::{MockReply, MockTransport};

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{BindError, FetchError};

/// Abstract `fetchJSON(url) -> Result<JSON, HttpError>`
#[async_trait]
pub trait Transport: Send + Sync {
    /// Transport name (e.g., "http", "mock")
    fn name(&self) -> &str;

    /// GET `url` and decode the body as JSON
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError>;
}

/// Create a transport by name
pub fn create_transport(name: &str) -> Result<Arc<dyn Transport>, BindError> {
    match name.to_lowercase().as_str() {
        "http" => Ok(Arc::new(HttpTransport::new()?)),
        "mock" => Ok(Arc::new(MockTransport::new())),
        _ => Err(BindError::UnknownTransport {
            name: name.to_string(),
        }),
    }
}
