//! GuardClient - assembled client for one enrolled account.
//!
//! Wires the transport stack (HTTP behind admission control), the
//! server-aligned clock, the session manager and the confirmation client
//! together from a persisted [`AccountDocument`] and a [`ClientConfig`].
//!
//! # Example
//!
//! ```ignore
//! let document: AccountDocument = serde_json::from_str(&stored)?;
//! let client = GuardClient::from_document(&document, ClientConfig::new("https://svc"))?;
//!
//! client.session_manager().login("user", "password").await?;
//! let engine = client.offer_engine().await?;
//! ```

use crate::autoresolve::{AutoResolver, Credentials};
use crate::clock::ClockSource;
use crate::config::ClientConfig;
use crate::confirmations::ConfirmationClient;
use crate::engine::OfferSyncEngine;
use crate::second_factor::HeadlessSecondFactor;
use crate::session::SessionManager;
use crate::transport::{HttpTransport, RateLimitedTransport, Transport};
use guard_types::{AccountDocument, AuthenticatorSecret, GuardError};
use std::sync::Arc;

/// One account's assembled client components.
pub struct GuardClient {
    transport: Arc<dyn Transport>,
    clock: Arc<ClockSource>,
    session: Arc<SessionManager>,
    confirmations: Arc<ConfirmationClient>,
    secret: AuthenticatorSecret,
    config: ClientConfig,
}

impl GuardClient {
    /// Build the production stack: HTTPS behind the admission limiter.
    pub fn from_document(
        document: &AccountDocument,
        config: ClientConfig,
    ) -> Result<Self, GuardError> {
        let http = HttpTransport::new(config.request_timeout)?;
        let transport: Arc<dyn Transport> = Arc::new(RateLimitedTransport::new(
            http,
            config.requests_per_minute,
            config.admission_patience,
        ));
        Ok(Self::with_transport(document, config, transport))
    }

    /// Build on an externally supplied transport (tests, custom stacks).
    pub fn with_transport(
        document: &AccountDocument,
        config: ClientConfig,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let secret = document.secret();
        let clock = Arc::new(ClockSource::new(
            Arc::clone(&transport),
            config.base_url.clone(),
        ));
        let factor = Arc::new(HeadlessSecondFactor::new(secret.clone(), Arc::clone(&clock)));
        let session = Arc::new(SessionManager::new(
            Arc::clone(&transport),
            Arc::clone(&clock),
            factor,
            config.base_url.clone(),
        ));
        if let Some(restored) = &document.session {
            session.install_session(restored.clone());
        }
        let confirmations = Arc::new(ConfirmationClient::new(
            Arc::clone(&transport),
            Arc::clone(&clock),
            Arc::clone(&session),
            secret.clone(),
            config.base_url.clone(),
        ));
        Self {
            transport,
            clock,
            session,
            confirmations,
            secret,
            config,
        }
    }

    /// The session owner: login, refresh, current session.
    pub fn session_manager(&self) -> Arc<SessionManager> {
        Arc::clone(&self.session)
    }

    /// The signed confirmation endpoints.
    pub fn confirmations(&self) -> Arc<ConfirmationClient> {
        Arc::clone(&self.confirmations)
    }

    /// Build an offer sync engine; captures its start timestamp now.
    pub async fn offer_engine(&self) -> Result<OfferSyncEngine, GuardError> {
        OfferSyncEngine::new(
            Arc::clone(&self.transport),
            Arc::clone(&self.session),
            &self.clock,
            self.config.base_url.clone(),
            self.config.poll_interval,
        )
        .await
    }

    /// Build an auto-resolver that re-logs-in with `credentials` on session
    /// loss.
    pub fn auto_resolver(&self, credentials: Credentials) -> AutoResolver {
        AutoResolver::new(
            Arc::clone(&self.confirmations),
            Arc::clone(&self.session),
            credentials,
            self.config.poll_interval,
        )
    }

    /// The account document reflecting the current session, for persisting
    /// after login or token rotation.
    pub fn document(&self) -> AccountDocument {
        AccountDocument {
            shared_secret: self.secret.shared_secret().to_string(),
            identity_secret: self.secret.identity_secret().to_string(),
            device_id: self.secret.device_id().clone(),
            session: self.session.session(),
        }
    }
}

impl std::fmt::Debug for GuardClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GuardClient")
            .field("base_url", &self.config.base_url)
            .finish()
    }
}
