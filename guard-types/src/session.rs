//! Authenticated session state.

use crate::ids::AccountId;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The renewable credential pair authorizing authenticated calls.
///
/// Created by a successful login. The access token has a bounded lifetime
/// and is replaced together with the refresh token on refresh; the whole
/// struct is swapped at once so a reader never observes a mixed pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Server-issued session identifier, sent as a cookie.
    #[serde(rename = "session_id")]
    pub session_id: String,
    /// Short-lived bearer token (JWT) for authenticated calls.
    #[serde(rename = "access_token")]
    pub access_token: String,
    /// Long-lived token exchanged for fresh access tokens.
    #[serde(rename = "refresh_token")]
    pub refresh_token: String,
    /// The authenticated account. Immutable once set.
    #[serde(rename = "account_id")]
    pub account_id: AccountId,
}

impl Session {
    /// Whether the access token's embedded expiry has passed.
    ///
    /// The token is a JWT; its `exp` claim is read from the base64url
    /// payload without verifying the signature (the server does that).
    /// A token that cannot be parsed is treated as expired so the caller
    /// refreshes rather than issuing a call that will fail anyway.
    pub fn is_access_token_expired(&self, now_unix: i64) -> bool {
        match jwt_expiry(&self.access_token) {
            Some(exp) => exp <= now_unix,
            None => true,
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("session_id", &self.session_id)
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("account_id", &self.account_id)
            .finish()
    }
}

/// Extract the `exp` claim from a JWT without verifying it.
fn jwt_expiry(token: &str) -> Option<i64> {
    let mut parts = token.split('.');
    let _header = parts.next()?;
    let payload = parts.next()?;
    if parts.next().is_none() || token.split('.').count() != 3 {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload).ok()?;

    #[derive(Deserialize)]
    struct Claims {
        exp: i64,
    }

    let claims: Claims = serde_json::from_slice(&bytes).ok()?;
    Some(claims.exp)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build an unsigned JWT with the given expiry claim.
    pub(crate) fn jwt_with_exp(exp: i64) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(format!(r#"{{"exp":{exp}}}"#).as_bytes());
        format!("{header}.{payload}.sig")
    }

    fn session_with_token(token: String) -> Session {
        Session {
            session_id: "sess-1".into(),
            access_token: token,
            refresh_token: "refresh-1".into(),
            account_id: AccountId::new(76561198000000001),
        }
    }

    #[test]
    fn future_expiry_is_not_expired() {
        let session = session_with_token(jwt_with_exp(2_000_000_000));
        assert!(!session.is_access_token_expired(1_700_000_000));
    }

    #[test]
    fn past_expiry_is_expired() {
        let session = session_with_token(jwt_with_exp(1_600_000_000));
        assert!(session.is_access_token_expired(1_700_000_000));
    }

    #[test]
    fn exact_expiry_counts_as_expired() {
        let session = session_with_token(jwt_with_exp(1_700_000_000));
        assert!(session.is_access_token_expired(1_700_000_000));
    }

    #[test]
    fn malformed_token_is_treated_as_expired() {
        let session = session_with_token("not-a-jwt".into());
        assert!(session.is_access_token_expired(0));

        let session = session_with_token("a.b".into());
        assert!(session.is_access_token_expired(0));
    }

    #[test]
    fn debug_redacts_tokens() {
        let session = session_with_token(jwt_with_exp(2_000_000_000));
        let debug = format!("{session:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("refresh-1"));
    }

    #[test]
    fn session_roundtrips_through_json() {
        let session = session_with_token(jwt_with_exp(2_000_000_000));
        let json = serde_json::to_string(&session).unwrap();
        let back: Session = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
