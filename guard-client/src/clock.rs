//! Server-aligned time source.
//!
//! One-time codes are only valid if generated against the server's clock.
//! The offset between server and local time is measured once per process and
//! reused; after that, reads are lock-free.

use crate::transport::{HttpRequest, Transport};
use guard_types::wire::TimeQueryResponse;
use guard_types::GuardError;
use std::sync::{Arc, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tracing::debug;

/// Time source aligned to the remote service's clock.
///
/// Concurrent first callers collapse into a single synchronization request:
/// the offset cell is double-checked under an async mutex, so whoever loses
/// the race reuses the winner's measurement.
pub struct ClockSource {
    transport: Arc<dyn Transport>,
    base_url: String,
    offset: OnceLock<i64>,
    sync_lock: Mutex<()>,
}

impl ClockSource {
    /// Create an unsynchronized clock talking to `base_url`.
    pub fn new(transport: Arc<dyn Transport>, base_url: impl Into<String>) -> Self {
        Self {
            transport,
            base_url: base_url.into(),
            offset: OnceLock::new(),
            sync_lock: Mutex::new(()),
        }
    }

    /// Measure the server/local offset if not measured yet.
    pub async fn synchronize(&self) -> Result<(), GuardError> {
        if self.offset.get().is_some() {
            return Ok(());
        }
        let _guard = self.sync_lock.lock().await;
        if self.offset.get().is_some() {
            // Another caller synchronized while we waited.
            return Ok(());
        }

        let request = HttpRequest::post(format!("{}/server-time", self.base_url));
        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(GuardError::ProtocolError(format!(
                "time query returned status {}",
                response.status
            )));
        }
        let parsed: TimeQueryResponse = serde_json::from_str(&response.body)
            .map_err(|err| GuardError::ProtocolError(format!("bad time response: {err}")))?;

        let offset = parsed.response.server_time - local_unix_now();
        debug!(offset, "clock synchronized");
        let _ = self.offset.set(offset);
        Ok(())
    }

    /// Current server time, unix seconds. Errors if never synchronized.
    pub fn now(&self) -> Result<i64, GuardError> {
        match self.offset.get() {
            Some(offset) => Ok(local_unix_now() + offset),
            None => Err(GuardError::ProtocolError(
                "clock has not been synchronized".into(),
            )),
        }
    }

    /// Current server time, synchronizing first if needed.
    pub async fn now_synchronized(&self) -> Result<i64, GuardError> {
        self.synchronize().await?;
        self.now()
    }
}

impl std::fmt::Debug for ClockSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockSource")
            .field("base_url", &self.base_url)
            .field("offset", &self.offset.get())
            .finish()
    }
}

fn local_unix_now() -> i64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(_) => 0,
    }
}
