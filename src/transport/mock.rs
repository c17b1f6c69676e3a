//! Mock transport for testing
//!
//! Returns scripted replies without touching the network, optionally after a
//! simulated latency. Essential for unit tests and CI pipelines.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::Transport;
use crate::error::FetchError;

/// One scripted reply
#[derive(Debug, Clone)]
pub struct MockReply {
    result: Result<Value, FetchError>,
    delay: Duration,
}

impl MockReply {
    pub fn ok(json: Value) -> Self {
        Self {
            result: Ok(json),
            delay: Duration::ZERO,
        }
    }

    pub fn err(error: FetchError) -> Self {
        Self {
            result: Err(error),
            delay: Duration::ZERO,
        }
    }

    /// Non-ok HTTP response with the given status text
    pub fn status(status: u16, status_text: impl Into<String>) -> Self {
        Self::err(FetchError::status(status, status_text))
    }

    /// Resolve only after `delay`
    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Transport that replays queued replies (FIFO)
///
/// Routed replies take precedence: a request whose URL contains a route's
/// fragment always gets that route's reply.
pub struct MockTransport {
    routes: Mutex<Vec<(String, MockReply)>>,
    replies: Mutex<VecDeque<MockReply>>,
    /// Used when the queue is empty
    default_reply: Mutex<MockReply>,
    /// Every URL requested, in order
    requests: Mutex<Vec<String>>,
}

impl MockTransport {
    /// Mock answering every request with `[]`
    pub fn new() -> Self {
        Self {
            routes: Mutex::new(Vec::new()),
            replies: Mutex::new(VecDeque::new()),
            default_reply: Mutex::new(MockReply::ok(Value::Array(Vec::new()))),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies(replies: Vec<MockReply>) -> Self {
        let mock = Self::new();
        mock.replies.lock().extend(replies);
        mock
    }

    pub fn with_default(self, reply: MockReply) -> Self {
        *self.default_reply.lock() = reply;
        self
    }

    /// Answer every URL containing `fragment` with `reply`
    pub fn with_route(self, fragment: impl Into<String>, reply: MockReply) -> Self {
        self.routes.lock().push((fragment.into(), reply));
        self
    }

    pub fn push_reply(&self, reply: MockReply) {
        self.replies.lock().push_back(reply);
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn last_request(&self) -> Option<String> {
        self.requests.lock().last().cloned()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().clear();
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch_json(&self, url: &str) -> Result<Value, FetchError> {
        self.requests.lock().push(url.to_string());

        let routed = self
            .routes
            .lock()
            .iter()
            .find(|(fragment, _)| url.contains(fragment.as_str()))
            .map(|(_, reply)| reply.clone());
        let reply = routed
            .or_else(|| self.replies.lock().pop_front())
            .unwrap_or_else(|| self.default_reply.lock().clone());

        if !reply.delay.is_zero() {
            tokio::time::sleep(reply.delay).await;
        }
        reply.result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn default_reply_is_empty_array() {
        let mock = MockTransport::new();
        assert_eq!(mock.fetch_json("/a").await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn queued_replies_in_order() {
        let mock = MockTransport::with_replies(vec![
            MockReply::ok(json!([1])),
            MockReply::status(500, "Some error"),
        ]);

        assert_eq!(mock.fetch_json("/a").await.unwrap(), json!([1]));
        assert_eq!(
            mock.fetch_json("/b").await.unwrap_err(),
            FetchError::status(500, "Some error")
        );
        assert_eq!(mock.fetch_json("/c").await.unwrap(), json!([]));
    }

    #[tokio::test]
    async fn records_requests() {
        let mock = MockTransport::new().with_default(MockReply::ok(json!({})));
        mock.fetch_json("/first").await.unwrap();
        mock.fetch_json("/second").await.unwrap();

        assert_eq!(mock.requests(), ["/first", "/second"]);
        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.last_request().as_deref(), Some("/second"));

        mock.clear_requests();
        assert_eq!(mock.request_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn delayed_reply_waits() {
        let mock = MockTransport::with_replies(vec![
            MockReply::ok(json!([1])).after(Duration::from_millis(100))
        ]);
        let start = tokio::time::Instant::now();
        mock.fetch_json("/a").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn routes_win_over_queue() {
        let mock = MockTransport::with_replies(vec![MockReply::ok(json!([1]))])
            .with_route("/orders", MockReply::ok(json!(["o"])));

        assert_eq!(mock.fetch_json("http://x/orders?a=1").await.unwrap(), json!(["o"]));
        assert_eq!(mock.fetch_json("http://x/orders").await.unwrap(), json!(["o"]));
        assert_eq!(mock.fetch_json("http://x/users").await.unwrap(), json!([1]));
    }
}
