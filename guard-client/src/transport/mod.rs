//! Transport abstraction for GuardSync.
//!
//! This module provides a pluggable request layer that abstracts the
//! underlying HTTP mechanism (reqwest, mock for testing).
//!
//! # Design
//!
//! The transport trait is async and request-oriented: one `execute()` call
//! takes a fully-described [`HttpRequest`] and yields the raw
//! [`HttpResponse`]. Authentication, signing and retry policy live above
//! this seam; connection pooling and TLS live below it.
//!
//! # Example
//!
//! ```ignore
//! let transport = MockTransport::new();
//! transport.queue_response(HttpResponse::ok(r#"{"success":true}"#));
//! let response = transport.execute(HttpRequest::get("https://x/confirmations")).await?;
//! ```

mod http;
mod limit;
mod mock;

pub use http::HttpTransport;
pub use limit::RateLimitedTransport;
pub use mock::MockTransport;

use async_trait::async_trait;
use guard_types::GuardError;
use thiserror::Error;

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// No admission slot opened within the caller's patience.
    #[error("rate limited")]
    RateLimited,

    /// The request was aborted by the caller.
    #[error("request canceled")]
    Canceled,

    /// The request could not be built or sent as described.
    #[error("malformed request: {0}")]
    MalformedRequest(String),
}

impl From<TransportError> for GuardError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::ConnectionFailed(detail) => GuardError::TransientNetwork(detail),
            TransportError::Timeout => GuardError::TransientNetwork("request timed out".into()),
            TransportError::RateLimited => GuardError::RateLimited,
            TransportError::Canceled => GuardError::Canceled,
            TransportError::MalformedRequest(detail) => GuardError::ProtocolError(detail),
        }
    }
}

/// HTTP method of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// An idempotent read.
    Get,
    /// A state-changing submission with a form body.
    Post,
}

/// One fully-described request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: Method,
    /// Absolute URL including any query string.
    pub url: String,
    /// Form fields sent as the body (POST only). Repeated keys allowed.
    pub form: Vec<(String, String)>,
    /// Extra headers.
    pub headers: Vec<(String, String)>,
    /// Session cookies sent with the request.
    pub cookies: Vec<(String, String)>,
}

impl HttpRequest {
    /// Build a GET request for the given URL.
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            form: Vec::new(),
            headers: Vec::new(),
            cookies: Vec::new(),
        }
    }

    /// Build a POST request for the given URL.
    pub fn post(url: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            form: Vec::new(),
            headers: Vec::new(),
            cookies: Vec::new(),
        }
    }

    /// Append one form field.
    pub fn with_form(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form.push((key.into(), value.into()));
        self
    }

    /// Append one header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    /// Append one cookie.
    pub fn with_cookie(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((key.into(), value.into()));
        self
    }

    /// Values of all form fields with the given key, in order.
    pub fn form_values(&self, key: &str) -> Vec<&str> {
        self.form
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
            .collect()
    }
}

/// One raw response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,
    /// The response body as text.
    pub body: String,
}

impl HttpResponse {
    /// Build a 200 response with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    /// Build a response with an explicit status.
    pub fn with_status(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Interpret a raw response as a JSON payload.
///
/// 401 is the one status with protocol meaning of its own: the session is
/// gone and the caller must re-authenticate, so it maps to `Unauthorized`
/// rather than a generic protocol error.
pub(crate) fn decode_json<T: serde::de::DeserializeOwned>(
    response: &HttpResponse,
) -> Result<T, GuardError> {
    if response.status == 401 {
        return Err(GuardError::Unauthorized);
    }
    if !response.is_success() {
        return Err(GuardError::ProtocolError(format!(
            "unexpected status {}",
            response.status
        )));
    }
    serde_json::from_str(&response.body)
        .map_err(|err| GuardError::ProtocolError(format!("unparsable body: {err}")))
}

/// Transport trait for executing protocol requests.
///
/// Implementations handle the underlying HTTP mechanism (reqwest, mock,
/// rate-limited wrapper).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute one request and return the raw response.
    ///
    /// Transport-level failures (connect, timeout, cancel) come back as
    /// errors; HTTP error statuses come back as responses and are
    /// interpreted by the caller.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}
