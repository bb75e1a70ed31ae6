//! Mock transport for testing.
//!
//! Allows queueing responses and capturing executed requests for
//! verification.

use super::{HttpRequest, HttpResponse, Transport, TransportError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

enum Reply {
    Response(HttpResponse),
    Error(TransportError),
}

/// Mock transport for testing.
///
/// Replies are consumed in FIFO order; every executed request is recorded.
#[derive(Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[derive(Default)]
struct MockTransportInner {
    executed: Vec<HttpRequest>,
    replies: VecDeque<Reply>,
}

impl MockTransport {
    /// Create a new mock transport with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response for the next unanswered `execute()` call.
    pub fn queue_response(&self, response: HttpResponse) {
        let mut inner = self.inner.lock().unwrap();
        inner.replies.push_back(Reply::Response(response));
    }

    /// Queue a transport failure for the next unanswered `execute()` call.
    pub fn queue_error(&self, error: TransportError) {
        let mut inner = self.inner.lock().unwrap();
        inner.replies.push_back(Reply::Error(error));
    }

    /// All requests executed so far.
    pub fn executed_requests(&self) -> Vec<HttpRequest> {
        let inner = self.inner.lock().unwrap();
        inner.executed.clone()
    }

    /// The most recent executed request.
    pub fn last_request(&self) -> Option<HttpRequest> {
        let inner = self.inner.lock().unwrap();
        inner.executed.last().cloned()
    }

    /// Number of requests executed so far.
    pub fn request_count(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        inner.executed.len()
    }

    /// Clear recorded requests and queued replies.
    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        *inner = MockTransportInner::default();
    }
}

impl Clone for MockTransport {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut inner = self.inner.lock().unwrap();
        inner.executed.push(request);
        match inner.replies.pop_front() {
            Some(Reply::Response(response)) => Ok(response),
            Some(Reply::Error(error)) => Err(error),
            None => Err(TransportError::ConnectionFailed(
                "no queued response".into(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replies_are_consumed_in_order() {
        let transport = MockTransport::new();
        transport.queue_response(HttpResponse::ok("first"));
        transport.queue_response(HttpResponse::with_status(401, "second"));

        let a = transport
            .execute(HttpRequest::get("https://svc/a"))
            .await
            .unwrap();
        let b = transport
            .execute(HttpRequest::get("https://svc/b"))
            .await
            .unwrap();

        assert_eq!(a.body, "first");
        assert_eq!(b.status, 401);
    }

    #[tokio::test]
    async fn requests_are_recorded() {
        let transport = MockTransport::new();
        transport.queue_response(HttpResponse::ok("{}"));

        let request = HttpRequest::post("https://svc/login").with_form("username", "u");
        transport.execute(request.clone()).await.unwrap();

        assert_eq!(transport.executed_requests(), vec![request]);
    }

    #[tokio::test]
    async fn queued_errors_are_returned() {
        let transport = MockTransport::new();
        transport.queue_error(TransportError::Timeout);

        let err = transport
            .execute(HttpRequest::get("https://svc/a"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout));
    }

    #[tokio::test]
    async fn exhausted_queue_fails_the_call() {
        let transport = MockTransport::new();
        let err = transport
            .execute(HttpRequest::get("https://svc/a"))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ConnectionFailed(_)));
    }
}
