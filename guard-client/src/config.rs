//! Client configuration.

use std::num::NonZeroU32;
use std::time::Duration;

/// Configuration shared by the client components.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the remote service, without a trailing slash.
    pub base_url: String,
    /// How often the offer engine and auto-resolver poll.
    pub poll_interval: Duration,
    /// Sustained request budget for the admission limiter.
    pub requests_per_minute: NonZeroU32,
    /// How long a request may wait for an admission slot before failing
    /// with a rate-limit error.
    pub admission_patience: Duration,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
}

impl ClientConfig {
    /// Configuration with defaults for the given service URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            poll_interval: Duration::from_secs(10),
            requests_per_minute: NonZeroU32::new(60).expect("default budget is non-zero"),
            admission_patience: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Set the polling interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the sustained request budget.
    pub fn with_requests_per_minute(mut self, budget: NonZeroU32) -> Self {
        self.requests_per_minute = budget;
        self
    }

    /// Set the admission patience.
    pub fn with_admission_patience(mut self, patience: Duration) -> Self {
        self.admission_patience = patience;
        self
    }
}
