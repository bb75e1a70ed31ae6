//! Retry delay calculation for recoverable failures.

use std::time::Duration;

/// Calculate the delay before retry attempt `attempt` (1-based).
///
/// Exponential base capped at 30 seconds, plus random jitter so many
/// authenticators recovering from one outage do not retry in lockstep.
pub fn calculate_backoff(attempt: u32) -> Duration {
    // Base: 2^attempt seconds, capped at 30 seconds
    let base_secs = 2u64.pow(attempt.min(5)).min(30);
    let base = Duration::from_secs(base_secs);

    // Jitter: 0-5000ms random
    let jitter = Duration::from_millis(random_jitter_ms());

    base + jitter
}

/// Generate random jitter between 0 and 5000 milliseconds.
fn random_jitter_ms() -> u64 {
    let mut bytes = [0u8; 8];
    getrandom::getrandom(&mut bytes).expect("getrandom failed");
    let random = u64::from_le_bytes(bytes);
    random % 5001
}
