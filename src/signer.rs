//! HMAC-SHA256 notification signing.
//!
//! Every outgoing notification carries `X-Hub-Signature: sha256=<hex>`,
//! where `<hex>` is the lowercase hex HMAC of the raw body keyed with the
//! subscriber's secret. An empty secret is a valid (if weak) key.

use data_encoding::HEXLOWER;
use hmac::digest::{Key, KeyInit};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::constants::SIGNATURE_PREFIX;

type HmacSha256 = Hmac<Sha256>;

// RFC 2104 key block: longer keys are hashed first, shorter ones zero-padded.
fn keyed_mac(secret: &str) -> HmacSha256 {
    let mut key = Key::<HmacSha256>::default();
    let bytes = secret.as_bytes();
    if bytes.len() > key.len() {
        let digest = Sha256::digest(bytes);
        key[..digest.len()].copy_from_slice(&digest);
    } else {
        key[..bytes.len()].copy_from_slice(bytes);
    }
    <HmacSha256 as KeyInit>::new(&key)
}

/// Signs `message` with `secret`, returning the lowercase hex digest.
pub fn sign(secret: &str, message: &[u8]) -> String {
    let mut mac = keyed_mac(secret);
    mac.update(message);
    HEXLOWER.encode(&mac.finalize().into_bytes())
}

/// Full `X-Hub-Signature` header value: `sha256=<hex>`.
pub fn signature_header(secret: &str, message: &[u8]) -> String {
    format!("{}{}", SIGNATURE_PREFIX, sign(secret, message))
}

/// Checks a received `X-Hub-Signature` header value against `message`.
///
/// Subscriber-side helper. Comparison is constant-time; a missing prefix,
/// bad hex or wrong digest all return `false`.
pub fn verify_signature(secret: &str, message: &[u8], header: &str) -> bool {
    let Some(hex) = header.strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(expected) = HEXLOWER.decode(hex.as_bytes()) else {
        return false;
    };
    let mut mac = keyed_mac(secret);
    mac.update(message);
    mac.verify_slice(&expected).is_ok()
}
