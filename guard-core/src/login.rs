//! Login state machine and outcome classifier.
//!
//! This module provides a pure, side-effect-free state machine for the
//! password login flow. The state machine takes wire responses as events and
//! produces a new state plus a list of actions to execute.
//!
//! The actual I/O (RSA encryption, HTTP calls) is performed by guard-client,
//! not by this module. This enables instant unit testing without mocks.

use guard_types::wire::{LoginResponse, RsaKeyResponse, TransferParameters};

/// Login state machine - NO I/O, just state transitions.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginState {
    /// No login attempt in flight.
    Unauthenticated,
    /// The RSA public key arrived; credentials can be encrypted.
    RsaKeyObtained {
        /// The key to encrypt the password with.
        challenge: RsaKeyResponse,
    },
    /// Encrypted credentials were sent; awaiting the server verdict.
    CredentialsSubmitted,
    /// The server accepted the credentials and issued a session.
    Authenticated {
        /// Session material to install.
        transfer: TransferParameters,
    },
    /// The attempt ended without a session.
    Failed(LoginFailure),
}

/// Terminal failure classes of one login attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginFailure {
    /// The server rejected the username/password pair.
    BadCredentials,
    /// The server refused the attempt due to too many recent tries.
    RateLimited,
    /// The server wants a second factor this call did not supply.
    SecondFactorRequired,
    /// The account uses a secondary authenticator this client cannot
    /// satisfy. Fail fast, never hang waiting for input.
    UnsupportedSecondFactor(String),
    /// Anything the classifier does not recognize.
    Unknown(Option<String>),
}

/// Events driving [`LoginState`].
#[derive(Debug, Clone, PartialEq)]
pub enum LoginEvent {
    /// The `/rsa-key` response arrived.
    RsaKeyReceived(RsaKeyResponse),
    /// The client encrypted the password and sent the login call.
    CredentialsSent,
    /// The `/login` response arrived.
    LoginResponseReceived(LoginResponse),
}

/// Actions the caller must execute after a transition.
#[derive(Debug, Clone, PartialEq)]
pub enum LoginAction {
    /// Encrypt the password with this key and submit the login call.
    EncryptAndSubmit {
        /// The RSA challenge to encrypt against.
        challenge: RsaKeyResponse,
    },
    /// Install this session material atomically.
    InstallSession {
        /// The issued tokens and account id.
        transfer: TransferParameters,
    },
}

impl LoginState {
    /// Create a new state machine with no attempt in flight.
    pub fn new() -> Self {
        Self::Unauthenticated
    }

    /// Process an event and return the new state plus actions to execute.
    ///
    /// This is a pure function - no side effects. The caller (guard-client)
    /// is responsible for executing the returned actions.
    pub fn on_event(self, event: LoginEvent) -> (Self, Vec<LoginAction>) {
        match (self, event) {
            // From Unauthenticated
            (Self::Unauthenticated, LoginEvent::RsaKeyReceived(challenge)) => {
                if challenge.success {
                    (
                        Self::RsaKeyObtained {
                            challenge: challenge.clone(),
                        },
                        vec![LoginAction::EncryptAndSubmit { challenge }],
                    )
                } else {
                    // Key lookup failure is surfaced, not retried.
                    (Self::Failed(LoginFailure::Unknown(None)), vec![])
                }
            }

            // From RsaKeyObtained
            (Self::RsaKeyObtained { .. }, LoginEvent::CredentialsSent) => {
                (Self::CredentialsSubmitted, vec![])
            }

            // From CredentialsSubmitted
            (Self::CredentialsSubmitted, LoginEvent::LoginResponseReceived(response)) => {
                match classify_login_response(response) {
                    Ok(transfer) => (
                        Self::Authenticated {
                            transfer: transfer.clone(),
                        },
                        vec![LoginAction::InstallSession { transfer }],
                    ),
                    Err(failure) => (Self::Failed(failure), vec![]),
                }
            }

            // Unexpected (state, event) pairs leave the state untouched.
            (state, _) => (state, vec![]),
        }
    }
}

impl Default for LoginState {
    fn default() -> Self {
        Self::new()
    }
}

/// Classify a login verdict into session material or a failure class.
fn classify_login_response(
    response: LoginResponse,
) -> Result<TransferParameters, LoginFailure> {
    if response.success {
        return match response.transfer_parameters {
            Some(transfer) => Ok(transfer),
            // Success without tokens is a malformed verdict.
            None => Err(LoginFailure::Unknown(None)),
        };
    }
    if response.requires_second_factor {
        return Err(LoginFailure::SecondFactorRequired);
    }
    match response.message {
        Some(message) => Err(classify_failure_message(&message)),
        None => Err(LoginFailure::Unknown(None)),
    }
}

/// Map a server failure message onto a failure class.
///
/// The server states reasons as prose; matching is by substring,
/// case-insensitive, so punctuation and casing drift do not break
/// classification.
pub fn classify_failure_message(message: &str) -> LoginFailure {
    let lowered = message.to_lowercase();
    if lowered.contains("incorrect login") {
        LoginFailure::BadCredentials
    } else if lowered.contains("too many") {
        LoginFailure::RateLimited
    } else {
        LoginFailure::Unknown(Some(message.to_string()))
    }
}
