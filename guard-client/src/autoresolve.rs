//! Unattended acceptance of exchange and market confirmations.
//!
//! Every tick the resolver fetches pending confirmations and accepts the
//! trade and market-sale ones in a single signed call. A dead session is
//! escalated to a fresh login with the stored credentials; recoverable
//! failures delay the next tick with backoff. No single bad cycle
//! terminates the loop.

use crate::confirmations::{ConfirmationClient, ResolveAction};
use crate::session::SessionManager;
use guard_core::calculate_backoff;
use guard_types::{ConfirmationKind, GuardError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, warn};

/// Stored login credentials for session re-establishment.
#[derive(Clone)]
pub struct Credentials {
    /// Account name.
    pub username: String,
    /// Account password.
    pub password: String,
}

impl Credentials {
    /// Bundle a username/password pair.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Background loop accepting trade and market-sale confirmations.
pub struct AutoResolver {
    confirmations: Arc<ConfirmationClient>,
    session: Arc<SessionManager>,
    credentials: Credentials,
    poll_interval: Duration,
    stop: Notify,
}

impl AutoResolver {
    /// Create a resolver; it does nothing until [`run`](Self::run) is driven.
    pub fn new(
        confirmations: Arc<ConfirmationClient>,
        session: Arc<SessionManager>,
        credentials: Credentials,
        poll_interval: Duration,
    ) -> Self {
        Self {
            confirmations,
            session,
            credentials,
            poll_interval,
            stop: Notify::new(),
        }
    }

    /// One fetch-and-accept pass. Returns how many confirmations were
    /// accepted.
    pub async fn resolve_pending(&self) -> Result<usize, GuardError> {
        let pending = self.confirmations.fetch_pending().await?;
        let accepted: Vec<_> = pending
            .into_iter()
            .filter(|confirmation| {
                matches!(
                    confirmation.kind,
                    ConfirmationKind::Trade | ConfirmationKind::MarketSale
                )
            })
            .collect();
        if accepted.is_empty() {
            return Ok(0);
        }
        self.confirmations
            .resolve(ResolveAction::Accept, &accepted)
            .await?;
        Ok(accepted.len())
    }

    /// Drive the loop until [`shutdown`](Self::shutdown).
    ///
    /// Each cycle is raced against the stop signal, so shutting down
    /// mid-fetch drops the in-flight request. Only a fatal crypto failure
    /// ends the loop with an error; everything else is absorbed and
    /// retried.
    pub async fn run(&self) -> Result<(), GuardError> {
        let mut failed_attempts: u32 = 0;

        loop {
            let delay = if failed_attempts == 0 {
                self.poll_interval
            } else {
                calculate_backoff(failed_attempts)
            };
            tokio::select! {
                _ = self.stop.notified() => {
                    debug!("auto-resolver stopped");
                    return Ok(());
                }
                _ = tokio::time::sleep(delay) => {}
            }

            let outcome = tokio::select! {
                _ = self.stop.notified() => {
                    debug!("auto-resolver stopped mid-cycle");
                    return Ok(());
                }
                outcome = self.resolve_pending() => outcome,
            };
            match outcome {
                Ok(accepted) => {
                    failed_attempts = 0;
                    if accepted > 0 {
                        debug!(accepted, "auto-accepted confirmations");
                    }
                }
                Err(GuardError::Unauthorized) => {
                    warn!("session rejected, re-running login");
                    let login = tokio::select! {
                        _ = self.stop.notified() => return Ok(()),
                        login = self
                            .session
                            .login(&self.credentials.username, &self.credentials.password) => login,
                    };
                    match login {
                        Ok(_) => failed_attempts = 0,
                        Err(err) => {
                            warn!(error = %err, "re-login failed");
                            failed_attempts = failed_attempts.saturating_add(1);
                        }
                    }
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(GuardError::Canceled) => return Ok(()),
                Err(err) => {
                    warn!(error = %err, "resolution cycle failed");
                    if err.is_retryable() {
                        failed_attempts = failed_attempts.saturating_add(1);
                    }
                }
            }
        }
    }

    /// Stop the loop; a cycle in flight is dropped mid-request.
    pub fn shutdown(&self) {
        self.stop.notify_one();
    }
}

impl std::fmt::Debug for AutoResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AutoResolver")
            .field("poll_interval", &self.poll_interval)
            .field("credentials", &self.credentials)
            .finish()
    }
}
