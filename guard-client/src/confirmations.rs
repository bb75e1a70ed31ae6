//! Fetching and resolving pending confirmations.

use crate::clock::ClockSource;
use crate::session::SessionManager;
use crate::transport::{decode_json, HttpRequest, Transport};
use guard_core::confirmation_query;
use guard_types::wire::{ConfirmationListResponse, ResolveResponse};
use guard_types::{AuthenticatorSecret, Confirmation, GuardError, Session};
use std::sync::Arc;
use tracing::debug;

/// What to do with a pending confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveAction {
    /// Approve the underlying action.
    Accept,
    /// Reject the underlying action.
    Deny,
}

impl ResolveAction {
    fn op(self) -> &'static str {
        match self {
            Self::Accept => "allow",
            Self::Deny => "cancel",
        }
    }
}

/// Client for the signed confirmation endpoints.
///
/// Every call carries one timestamp and one signature; batched resolution
/// reuses them for all members because the signed query is built once per
/// call, not per confirmation.
pub struct ConfirmationClient {
    transport: Arc<dyn Transport>,
    clock: Arc<ClockSource>,
    session: Arc<SessionManager>,
    secret: AuthenticatorSecret,
    base_url: String,
}

impl ConfirmationClient {
    /// Create a client bound to one account's secret material.
    pub fn new(
        transport: Arc<dyn Transport>,
        clock: Arc<ClockSource>,
        session: Arc<SessionManager>,
        secret: AuthenticatorSecret,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            clock,
            session,
            secret,
            base_url: base_url.into(),
        }
    }

    async fn signed_query(&self, session: &Session, tag: &str) -> Result<String, GuardError> {
        let timestamp = self.clock.now_synchronized().await?;
        confirmation_query(&self.secret, session.account_id, timestamp, tag)
    }

    fn with_auth(request: HttpRequest, session: &Session) -> HttpRequest {
        request
            .with_cookie("sessionid", session.session_id.clone())
            .with_cookie("token", session.access_token.clone())
    }

    /// Fetch the confirmations currently awaiting resolution.
    ///
    /// A dead session surfaces as `Unauthorized`, never as an empty list.
    pub async fn fetch_pending(&self) -> Result<Vec<Confirmation>, GuardError> {
        let session = self.session.ensure_fresh().await?;
        let query = self.signed_query(&session, "conf").await?;
        let request = Self::with_auth(
            HttpRequest::get(format!("{}/confirmations?{query}", self.base_url)),
            &session,
        );

        let response = self.transport.execute(request).await?;
        let parsed: ConfirmationListResponse = decode_json(&response)?;
        if !parsed.success {
            return Err(GuardError::ProtocolError(
                "confirmation list rejected".into(),
            ));
        }

        let pending = parsed.confirmations.unwrap_or_default();
        debug!(count = pending.len(), "fetched pending confirmations");
        Ok(pending)
    }

    /// Resolve one or more confirmations with a single signed call.
    ///
    /// An empty slice is a no-op. One confirmation goes through the single
    /// endpoint, more through the batch endpoint; either way the whole call
    /// shares one timestamp and one signature.
    pub async fn resolve(
        &self,
        action: ResolveAction,
        confirmations: &[Confirmation],
    ) -> Result<(), GuardError> {
        if confirmations.is_empty() {
            return Ok(());
        }

        let session = self.session.ensure_fresh().await?;
        let query = self.signed_query(&session, action.op()).await?;

        let request = if let [single] = confirmations {
            HttpRequest::get(format!(
                "{}/confirmation-op?op={}&{query}&cid={}&ck={}",
                self.base_url,
                action.op(),
                single.id,
                single.key,
            ))
        } else {
            let mut request = HttpRequest::post(format!(
                "{}/confirmation-multi-op?{query}",
                self.base_url
            ))
            .with_form("op", action.op());
            for confirmation in confirmations {
                request = request
                    .with_form("cid[]", confirmation.id.to_string())
                    .with_form("ck[]", confirmation.key.to_string());
            }
            request
        };

        let response = self.transport.execute(Self::with_auth(request, &session)).await?;
        let parsed: ResolveResponse = decode_json(&response)?;
        if !parsed.success {
            return Err(GuardError::ProtocolError(format!(
                "server refused to {} {} confirmation(s)",
                action.op(),
                confirmations.len()
            )));
        }

        debug!(
            count = confirmations.len(),
            op = action.op(),
            "confirmations resolved"
        );
        Ok(())
    }
}

impl std::fmt::Debug for ConfirmationClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfirmationClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}
