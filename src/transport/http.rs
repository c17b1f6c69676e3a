//! HTTP transport on reqwest

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, instrument, warn};

use super::Transport;
use crate::error::FetchError;

/// Default total timeout for a request (30 seconds)
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connect timeout (10 seconds)
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// GET transport with a shared connection pool
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeouts(REQUEST_TIMEOUT, CONNECT_TIMEOUT)
    }

    pub fn with_timeouts(timeout: Duration, connect_timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout)
            .redirect(reqwest::redirect::Policy::limited(5))
            .user_agent(concat!("restbind/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| FetchError::Network(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (custom TLS, proxies, default headers)
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self))]
    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        let parsed = url::Url::parse(url)
            .map_err(|e| FetchError::InvalidUrl(format!("{} ({})", url, e)))?;

        let response = self
            .client
            .get(parsed)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let status_text = status.canonical_reason().unwrap_or("Unknown Status");
            warn!(status = status.as_u16(), "request failed");
            return Err(FetchError::status(status.as_u16(), status_text));
        }

        debug!(status = status.as_u16(), "response received");
        response
            .json::<Value>()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))
    }
}
