//! Persisted account file.

use crate::ids::DeviceId;
use crate::secrets::AuthenticatorSecret;
use crate::session::Session;
use serde::{Deserialize, Serialize};

/// The on-disk JSON document describing one enrolled account.
///
/// Secrets are stored as issued; the session block is absent until the first
/// successful login and rewritten whenever tokens rotate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountDocument {
    /// Base64 secret backing one-time code generation.
    pub shared_secret: String,
    /// Base64 secret backing confirmation signatures.
    pub identity_secret: String,
    /// The enrolled device identifier.
    pub device_id: DeviceId,
    /// Last known session, if a login succeeded before.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
}

impl AccountDocument {
    /// Build the secret bundle this document describes.
    pub fn secret(&self) -> AuthenticatorSecret {
        AuthenticatorSecret::new(
            self.shared_secret.clone(),
            self.identity_secret.clone(),
            self.device_id.clone(),
        )
    }
}
