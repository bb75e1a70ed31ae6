//! Enrolled authenticator secret material.

use crate::ids::DeviceId;
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// The immutable secret bundle issued at enrollment.
///
/// `shared_secret` derives one-time login codes; `identity_secret` signs
/// confirmation requests. Both are base64 strings as issued by the service
/// and are never regenerated without re-enrollment.
///
/// Secrets are zeroed on drop and redacted from Debug output.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct AuthenticatorSecret {
    shared_secret: String,
    identity_secret: String,
    #[zeroize(skip)]
    device_id: DeviceId,
}

impl AuthenticatorSecret {
    /// Bundle enrollment material.
    pub fn new(
        shared_secret: impl Into<String>,
        identity_secret: impl Into<String>,
        device_id: DeviceId,
    ) -> Self {
        Self {
            shared_secret: shared_secret.into(),
            identity_secret: identity_secret.into(),
            device_id,
        }
    }

    /// The base64 secret backing one-time code generation.
    pub fn shared_secret(&self) -> &str {
        &self.shared_secret
    }

    /// The base64 secret backing confirmation signatures.
    pub fn identity_secret(&self) -> &str {
        &self.identity_secret
    }

    /// The enrolled device identifier.
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }
}

impl fmt::Debug for AuthenticatorSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatorSecret")
            .field("shared_secret", &"[REDACTED]")
            .field("identity_secret", &"[REDACTED]")
            .field("device_id", &self.device_id)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_secret() -> AuthenticatorSecret {
        AuthenticatorSecret::new(
            "zvIJbyNW15bOxPcHuYOKWxbQTWA=",
            "Ks0wwT2eMLRz9qO6ZKRQFTMURNw=",
            DeviceId::new("android:test-device"),
        )
    }

    #[test]
    fn accessors_return_enrollment_material() {
        let secret = test_secret();
        assert_eq!(secret.shared_secret(), "zvIJbyNW15bOxPcHuYOKWxbQTWA=");
        assert_eq!(secret.identity_secret(), "Ks0wwT2eMLRz9qO6ZKRQFTMURNw=");
        assert_eq!(secret.device_id().as_str(), "android:test-device");
    }

    #[test]
    fn debug_redacts_secrets() {
        let secret = test_secret();
        let debug = format!("{secret:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("zvIJbyNW15bOxPcHuYOKWxbQTWA="));
        assert!(!debug.contains("Ks0wwT2eMLRz9qO6ZKRQFTMURNw="));
        assert!(debug.contains("android:test-device"));
    }
}
