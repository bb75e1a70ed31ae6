//! Second-factor capability seam.
//!
//! Login needs a one-time code; some accounts additionally demand an email
//! code or an interactive approval. Each capability is a separate method so
//! an implementation can support exactly what it can actually do and return
//! a typed unsupported failure for the rest - callers branch on the error
//! instead of hanging on input that will never come.

use crate::clock::ClockSource;
use async_trait::async_trait;
use guard_core::generate_code;
use guard_types::{AuthenticatorSecret, GuardError};
use std::sync::Arc;

/// Supplier of second-factor proofs during login.
#[async_trait]
pub trait SecondFactor: Send + Sync {
    /// Produce the current one-time code.
    async fn provide_code(&self) -> Result<String, GuardError>;

    /// Produce a code the service sent to the account's email address.
    async fn provide_email_code(&self) -> Result<String, GuardError>;

    /// Approve the login without a code (push-style approval).
    async fn approve_silently(&self) -> Result<(), GuardError>;
}

/// Headless second factor backed by the enrolled shared secret.
///
/// Derives codes without any user interaction; email codes and push
/// approvals are unsupported by construction.
pub struct HeadlessSecondFactor {
    secret: AuthenticatorSecret,
    clock: Arc<ClockSource>,
}

impl HeadlessSecondFactor {
    /// Build a headless factor from enrollment material and a clock.
    pub fn new(secret: AuthenticatorSecret, clock: Arc<ClockSource>) -> Self {
        Self { secret, clock }
    }
}

#[async_trait]
impl SecondFactor for HeadlessSecondFactor {
    async fn provide_code(&self) -> Result<String, GuardError> {
        let timestamp = self.clock.now_synchronized().await?;
        generate_code(self.secret.shared_secret(), timestamp)
    }

    async fn provide_email_code(&self) -> Result<String, GuardError> {
        Err(GuardError::UnsupportedSecondFactor(
            "email codes require user interaction".into(),
        ))
    }

    async fn approve_silently(&self) -> Result<(), GuardError> {
        Err(GuardError::UnsupportedSecondFactor(
            "push approval requires user interaction".into(),
        ))
    }
}
