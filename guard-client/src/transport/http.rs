//! HTTP transport backed by reqwest.

use super::{HttpRequest, HttpResponse, Method, Transport, TransportError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Production transport over HTTPS.
///
/// Holds one pooled [`reqwest::Client`]; cheap to clone. Cookies are sent
/// per-request from the [`HttpRequest`], never stored here, so one transport
/// can serve many accounts.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Create a transport with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| TransportError::MalformedRequest(err.to_string()))?;
        Ok(Self { client })
    }

    fn cookie_header(cookies: &[(String, String)]) -> String {
        cookies
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        debug!(method = ?request.method, url = %request.url, "executing request");

        let mut builder = match request.method {
            Method::Get => self.client.get(&request.url),
            Method::Post => self.client.post(&request.url).form(&request.form),
        };
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if !request.cookies.is_empty() {
            builder = builder.header("Cookie", Self::cookie_header(&request.cookies));
        }

        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::ConnectionFailed(err.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|err| TransportError::ConnectionFailed(err.to_string()))?;

        debug!(status, bytes = body.len(), "response received");
        Ok(HttpResponse { status, body })
    }
}
