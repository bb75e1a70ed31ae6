//! Password encryption for the login call.
//!
//! The service hands out a per-username RSA public key; the password is
//! encrypted with PKCS#1 v1.5 and sent base64-encoded. The plaintext
//! password never travels, even inside TLS.

use base64::{engine::general_purpose::STANDARD, Engine};
use guard_types::GuardError;
use rsa::{BigUint, Pkcs1v15Encrypt, RsaPublicKey};

/// Encrypt a password with the hex-encoded key from the `/rsa-key` call.
pub fn encrypt_password(
    password: &str,
    modulus_hex: &str,
    exponent_hex: &str,
) -> Result<String, GuardError> {
    let modulus = hex::decode(modulus_hex)
        .map_err(|err| GuardError::CryptoFailure(format!("bad key modulus: {err}")))?;
    let exponent = hex::decode(exponent_hex)
        .map_err(|err| GuardError::CryptoFailure(format!("bad key exponent: {err}")))?;

    let key = RsaPublicKey::new(
        BigUint::from_bytes_be(&modulus),
        BigUint::from_bytes_be(&exponent),
    )
    .map_err(|err| GuardError::CryptoFailure(format!("key rejected: {err}")))?;

    let mut rng = rand::rngs::OsRng;
    let ciphertext = key
        .encrypt(&mut rng, Pkcs1v15Encrypt, password.as_bytes())
        .map_err(|err| GuardError::CryptoFailure(format!("encryption failed: {err}")))?;

    Ok(STANDARD.encode(ciphertext))
}
