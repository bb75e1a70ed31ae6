//! Error taxonomy for GuardSync.

use thiserror::Error;

/// Errors that can occur in GuardSync operations.
///
/// Each variant carries a distinct recovery policy:
/// - [`CryptoFailure`](Self::CryptoFailure) is fatal; the enrolled secret is
///   malformed and only re-enrollment helps.
/// - [`Unauthorized`](Self::Unauthorized) means the session expired; the
///   caller must re-authenticate, not retry the same call.
/// - [`RateLimited`](Self::RateLimited) asks for backoff before the next
///   attempt.
/// - [`TransientNetwork`](Self::TransientNetwork) is safe to retry with
///   backoff.
/// - [`ProtocolError`](Self::ProtocolError) is surfaced to the caller, never
///   silently treated as "no data".
/// - [`Canceled`](Self::Canceled) is a caller-requested abort, not a failure
///   to retry.
#[derive(Debug, Error)]
pub enum GuardError {
    /// Enrolled secret material is malformed (bad base64). Fatal.
    #[error("crypto failure: {0}")]
    CryptoFailure(String),

    /// The session is expired or invalid; re-authentication required.
    #[error("not authorized")]
    Unauthorized,

    /// The remote service refused the call due to rate limiting, or no
    /// admission slot opened within the caller's patience.
    #[error("rate limited")]
    RateLimited,

    /// Unexpected or unparsable response from the remote service.
    #[error("protocol error: {0}")]
    ProtocolError(String),

    /// Connectivity or timeout failure; safe to retry with backoff.
    #[error("transient network error: {0}")]
    TransientNetwork(String),

    /// The caller aborted the operation.
    #[error("operation canceled")]
    Canceled,

    /// A secondary authenticator type this client cannot satisfy.
    #[error("unsupported second factor: {0}")]
    UnsupportedSecondFactor(String),
}

impl GuardError {
    /// Whether the failed call may be retried as-is after a delay.
    ///
    /// `Unauthorized` is deliberately not retryable: the same call will keep
    /// failing until the caller re-authenticates.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited | Self::TransientNetwork(_))
    }

    /// Whether the error is fatal for the authenticator as a whole.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::CryptoFailure(_))
    }
}
