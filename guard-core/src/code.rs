//! One-time codes and confirmation signatures.
//!
//! Both derive from HMAC-SHA1 over a base64-encoded enrollment secret. The
//! one-time code proves possession of the shared secret at a 30-second time
//! step; the confirmation signature proves it for one specific signed request.
//! Everything here is deterministic given (secret, timestamp, tag).

use base64::{engine::general_purpose::STANDARD, Engine};
use guard_types::{AccountId, AuthenticatorSecret, GuardError};
use hmac::{Hmac, Mac};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// Width of one code time step, in seconds.
pub const CODE_INTERVAL_SECS: i64 = 30;

/// The 26-symbol alphabet one-time codes are drawn from.
///
/// Chosen by the service to avoid visually ambiguous characters; changing it
/// would break verification, so it is fixed here.
const CODE_ALPHABET: &[u8; 26] = b"23456789BCDFGHJKMNPQRTVWXY";

/// Length of a one-time code in symbols.
const CODE_LENGTH: usize = 5;

/// Confirmation tags longer than this are truncated before signing.
const MAX_TAG_LEN: usize = 32;

fn hmac_sha1(secret_b64: &str, payload: &[u8]) -> Result<[u8; 20], GuardError> {
    let key = STANDARD
        .decode(secret_b64)
        .map_err(|err| GuardError::CryptoFailure(format!("secret is not valid base64: {err}")))?;
    let mut mac = HmacSha1::new_from_slice(&key)
        .map_err(|err| GuardError::CryptoFailure(format!("hmac key rejected: {err}")))?;
    mac.update(payload);
    Ok(mac.finalize().into_bytes().into())
}

/// Derive the one-time login code for the given unix timestamp.
///
/// The timestamp is floored to its 30-second step, so any two calls within
/// the same step yield the same code. Fails only when the secret is not
/// valid base64.
pub fn generate_code(shared_secret: &str, timestamp: i64) -> Result<String, GuardError> {
    let step = (timestamp / CODE_INTERVAL_SECS) as u64;
    let hash = hmac_sha1(shared_secret, &step.to_be_bytes())?;

    // Dynamic truncation: the low nibble of the last byte picks a 4-byte
    // window, whose top bit is masked off.
    let offset = (hash[19] & 0x0f) as usize;
    let mut value = u32::from_be_bytes([
        hash[offset] & 0x7f,
        hash[offset + 1],
        hash[offset + 2],
        hash[offset + 3],
    ]);

    let mut code = String::with_capacity(CODE_LENGTH);
    for _ in 0..CODE_LENGTH {
        code.push(CODE_ALPHABET[value as usize % CODE_ALPHABET.len()] as char);
        value /= CODE_ALPHABET.len() as u32;
    }
    Ok(code)
}

/// Sign one confirmation request.
///
/// The signed payload is the 8-byte big-endian timestamp followed by the
/// UTF-8 tag truncated to 32 bytes. The result is base64 then percent-encoded
/// so it can be embedded in a query string as-is.
pub fn confirmation_signature(
    identity_secret: &str,
    timestamp: i64,
    tag: &str,
) -> Result<String, GuardError> {
    let tag_bytes = tag.as_bytes();
    let tag_len = tag_bytes.len().min(MAX_TAG_LEN);

    let mut payload = Vec::with_capacity(8 + tag_len);
    payload.extend_from_slice(&(timestamp as u64).to_be_bytes());
    payload.extend_from_slice(&tag_bytes[..tag_len]);

    let hash = hmac_sha1(identity_secret, &payload)?;
    let signature = STANDARD.encode(hash);
    Ok(utf8_percent_encode(&signature, NON_ALPHANUMERIC).to_string())
}

/// Build the canonical signed query string for confirmation endpoints.
///
/// Both the list call and every resolve call (single or batched) append
/// their parameters to this exact shape, so a batch shares one timestamp and
/// one signature by construction.
pub fn confirmation_query(
    secret: &AuthenticatorSecret,
    account_id: AccountId,
    timestamp: i64,
    tag: &str,
) -> Result<String, GuardError> {
    let signature = confirmation_signature(secret.identity_secret(), timestamp, tag)?;
    Ok(format!(
        "p={device}&a={account}&k={signature}&t={timestamp}&m=android&tag={tag}",
        device = secret.device_id(),
        account = account_id,
    ))
}
