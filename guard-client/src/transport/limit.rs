//! Admission control wrapper around any transport.

use super::{HttpRequest, HttpResponse, Transport, TransportError};
use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::time::Duration;
use tracing::warn;

/// Type alias for a direct (non-keyed) rate limiter.
type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Wraps a transport so every request first acquires an admission slot.
///
/// When no slot opens within the configured patience the request fails with
/// [`TransportError::RateLimited`] instead of waiting indefinitely, giving
/// callers a value they can back off on.
pub struct RateLimitedTransport<T> {
    inner: T,
    limiter: DirectLimiter,
    patience: Duration,
}

impl<T> RateLimitedTransport<T> {
    /// Wrap `inner`, allowing `requests_per_minute` sustained requests and
    /// waiting at most `patience` for a slot.
    pub fn new(inner: T, requests_per_minute: NonZeroU32, patience: Duration) -> Self {
        Self {
            inner,
            limiter: RateLimiter::direct(Quota::per_minute(requests_per_minute)),
            patience,
        }
    }
}

impl<T> std::fmt::Debug for RateLimitedTransport<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitedTransport")
            .field("patience", &self.patience)
            .finish()
    }
}

#[async_trait]
impl<T: Transport> Transport for RateLimitedTransport<T> {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        match tokio::time::timeout(self.patience, self.limiter.until_ready()).await {
            Ok(()) => self.inner.execute(request).await,
            Err(_) => {
                warn!(url = %request.url, "no admission slot within patience");
                Err(TransportError::RateLimited)
            }
        }
    }
}
