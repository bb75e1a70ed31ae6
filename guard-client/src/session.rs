//! Session lifecycle: login, token refresh, atomic replacement.

use crate::clock::ClockSource;
use crate::crypto;
use crate::second_factor::SecondFactor;
use crate::transport::{decode_json, HttpRequest, Transport};
use guard_core::{LoginAction, LoginEvent, LoginFailure, LoginState};
use guard_types::wire::{LoginResponse, RefreshResponse, RsaKeyResponse};
use guard_types::{AccountId, GuardError, Session};
use std::sync::{Arc, RwLock};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Login errors.
///
/// The terminal classes of one attempt, plus everything the underlying
/// calls can fail with.
#[derive(Debug, Error)]
pub enum LoginError {
    /// The server rejected the username/password pair.
    #[error("credentials rejected")]
    BadCredentials,

    /// Too many recent attempts; back off before trying again.
    #[error("too many login attempts")]
    RateLimited,

    /// The account demands a secondary authenticator this client cannot
    /// satisfy.
    #[error("unsupported second factor: {0}")]
    UnsupportedSecondFactor(String),

    /// The server refused for a reason the classifier does not recognize.
    #[error("login failed{}", .0.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Unknown(Option<String>),

    /// A transport, crypto or protocol failure below the login flow.
    #[error(transparent)]
    Guard(#[from] GuardError),
}

impl From<LoginFailure> for LoginError {
    fn from(failure: LoginFailure) -> Self {
        match failure {
            LoginFailure::BadCredentials => Self::BadCredentials,
            LoginFailure::RateLimited => Self::RateLimited,
            LoginFailure::SecondFactorRequired => {
                // Callers only see this if the retry path also failed.
                Self::UnsupportedSecondFactor("second factor demanded twice".into())
            }
            LoginFailure::UnsupportedSecondFactor(detail) => {
                Self::UnsupportedSecondFactor(detail)
            }
            LoginFailure::Unknown(message) => Self::Unknown(message),
        }
    }
}

/// Owner of the authenticated session.
///
/// The session is replaced as a whole struct under a write lock, so a
/// concurrent reader sees either the old token pair or the new one, never a
/// mix. Login and refresh are serialized by one async mutex: a rejected
/// refresh can never wipe a session a concurrent login just installed, a
/// stale refresh result can never overwrite a fresher token pair, and
/// concurrent expired callers collapse into one refresh call.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    clock: Arc<ClockSource>,
    second_factor: Arc<dyn SecondFactor>,
    base_url: String,
    session: RwLock<Option<Session>>,
    auth_lock: Mutex<()>,
}

impl SessionManager {
    /// Create a manager with no session installed.
    pub fn new(
        transport: Arc<dyn Transport>,
        clock: Arc<ClockSource>,
        second_factor: Arc<dyn SecondFactor>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            transport,
            clock,
            second_factor,
            base_url: base_url.into(),
            session: RwLock::new(None),
            auth_lock: Mutex::new(()),
        }
    }

    /// The current session, if any.
    pub fn session(&self) -> Option<Session> {
        self.session.read().expect("session lock poisoned").clone()
    }

    /// Install a session, e.g. one restored from the account document.
    pub fn install_session(&self, session: Session) {
        *self.session.write().expect("session lock poisoned") = Some(session);
    }

    /// Drop the session; subsequent authenticated calls fail `Unauthorized`.
    pub fn clear_session(&self) {
        *self.session.write().expect("session lock poisoned") = None;
    }

    /// Run the full password login flow and install the issued session.
    ///
    /// Holds the auth lock for the whole flow: a refresh in flight finishes
    /// first, and its outcome cannot clobber the session this login
    /// installs.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session, LoginError> {
        let _guard = self.auth_lock.lock().await;
        let machine = LoginState::new();

        let key_request = HttpRequest::post(format!("{}/rsa-key", self.base_url))
            .with_form("username", username);
        let response = self
            .transport
            .execute(key_request)
            .await
            .map_err(GuardError::from)?;
        let key: RsaKeyResponse = decode_json(&response)?;

        let (machine, actions) = machine.on_event(LoginEvent::RsaKeyReceived(key));
        let challenge = match into_single_action(actions) {
            Some(LoginAction::EncryptAndSubmit { challenge }) => challenge,
            _ => return Err(failure_of(machine)),
        };

        let encrypted = crypto::encrypt_password(
            password,
            &challenge.modulus_hex,
            &challenge.exponent_hex,
        )?;
        let code = self.second_factor.provide_code().await?;

        let login_request = HttpRequest::post(format!("{}/login", self.base_url))
            .with_form("username", username)
            .with_form("password", encrypted)
            .with_form("one_time_code", code)
            .with_form("rsa_timestamp", challenge.timestamp.clone());

        let (machine, _) = machine.on_event(LoginEvent::CredentialsSent);
        let response = self
            .transport
            .execute(login_request.clone())
            .await
            .map_err(GuardError::from)?;
        let verdict: LoginResponse = decode_json(&response)?;

        let (machine, actions) = machine.on_event(LoginEvent::LoginResponseReceived(verdict));
        match into_single_action(actions) {
            Some(LoginAction::InstallSession { transfer }) => {
                Ok(self.accept_transfer(transfer))
            }
            _ => match machine {
                LoginState::Failed(LoginFailure::SecondFactorRequired) => {
                    self.retry_with_email_code(login_request).await
                }
                other => Err(failure_of(other)),
            },
        }
    }

    /// One resubmission carrying an email code, for accounts whose second
    /// factor is mail-based. Headless deployments fail fast here.
    async fn retry_with_email_code(
        &self,
        login_request: HttpRequest,
    ) -> Result<Session, LoginError> {
        let email_code = self.second_factor.provide_email_code().await.map_err(
            |err| match err {
                GuardError::UnsupportedSecondFactor(detail) => {
                    LoginError::UnsupportedSecondFactor(detail)
                }
                other => LoginError::Guard(other),
            },
        )?;

        let response = self
            .transport
            .execute(login_request.with_form("email_code", email_code))
            .await
            .map_err(GuardError::from)?;
        let verdict: LoginResponse = decode_json(&response)?;

        let (machine, actions) =
            LoginState::CredentialsSubmitted.on_event(LoginEvent::LoginResponseReceived(verdict));
        match into_single_action(actions) {
            Some(LoginAction::InstallSession { transfer }) => {
                Ok(self.accept_transfer(transfer))
            }
            _ => Err(failure_of(machine)),
        }
    }

    fn accept_transfer(
        &self,
        transfer: guard_types::wire::TransferParameters,
    ) -> Session {
        let session = Session {
            session_id: transfer.session_id,
            access_token: transfer.access_token,
            refresh_token: transfer.refresh_token,
            account_id: AccountId::new(transfer.account_id),
        };
        self.install_session(session.clone());
        info!(account = %session.account_id, "login succeeded");
        session
    }

    /// The current session, refreshed first if its access token expired.
    ///
    /// Concurrent callers with an expired token collapse into one refresh:
    /// whoever loses the race re-reads the session and finds it fresh.
    pub async fn ensure_fresh(&self) -> Result<Session, GuardError> {
        let now = self.clock.now_synchronized().await?;
        let session = self.session().ok_or(GuardError::Unauthorized)?;
        if !session.is_access_token_expired(now) {
            return Ok(session);
        }

        let _guard = self.auth_lock.lock().await;
        let session = self.session().ok_or(GuardError::Unauthorized)?;
        if !session.is_access_token_expired(now) {
            debug!("session already refreshed by a concurrent caller");
            return Ok(session);
        }
        self.refresh_locked(session).await
    }

    /// Exchange the refresh token unconditionally.
    pub async fn refresh(&self) -> Result<Session, GuardError> {
        let _guard = self.auth_lock.lock().await;
        let session = self.session().ok_or(GuardError::Unauthorized)?;
        self.refresh_locked(session).await
    }

    async fn refresh_locked(&self, session: Session) -> Result<Session, GuardError> {
        let request = HttpRequest::post(format!("{}/refresh", self.base_url))
            .with_form("refresh_token", session.refresh_token.clone());
        let response = self.transport.execute(request).await?;

        let renewed: RefreshResponse = match decode_json(&response) {
            Ok(renewed) => renewed,
            Err(GuardError::Unauthorized) => {
                // The refresh token itself was rejected. The session is
                // unrecoverable; the caller must log in again.
                warn!(account = %session.account_id, "refresh token rejected, dropping session");
                self.clear_session();
                return Err(GuardError::Unauthorized);
            }
            Err(other) => return Err(other),
        };

        let replacement = Session {
            session_id: session.session_id,
            access_token: renewed.response.access_token,
            refresh_token: renewed
                .response
                .refresh_token
                .unwrap_or(session.refresh_token),
            account_id: session.account_id,
        };
        self.install_session(replacement.clone());
        debug!(account = %replacement.account_id, "access token refreshed");
        Ok(replacement)
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("base_url", &self.base_url)
            .field("session", &self.session())
            .finish()
    }
}

fn into_single_action(actions: Vec<LoginAction>) -> Option<LoginAction> {
    actions.into_iter().next()
}

fn failure_of(state: LoginState) -> LoginError {
    match state {
        LoginState::Failed(failure) => failure.into(),
        _ => LoginError::Unknown(None),
    }
}
