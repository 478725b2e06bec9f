//! Keyed signatures for webhook payloads.
//!
//! Outbound deliveries are signed with HMAC-SHA256 over the exact serialized envelope bytes, hex-encoded, and
//! attached as the `X-Webhook-Signature` header. Receivers verify with [`verify_signature`], which compares in
//! constant time.

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Computes the hex-encoded HMAC-SHA256 of `payload` under `secret`.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let mut mac = new_mac(secret);
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Checks a hex-encoded signature against `payload` and `secret`.
///
/// The comparison runs in constant time regardless of where the signatures first differ, so an attacker cannot learn
/// the correct signature byte by byte from response timing.
pub fn verify_signature(payload: &[u8], signature: &str, secret: &str) -> bool {
    let Ok(signature) = hex::decode(signature) else {
        return false;
    };
    let mut mac = new_mac(secret);
    mac.update(payload);
    mac.verify_slice(&signature).is_ok()
}

fn new_mac(secret: &str) -> HmacSha256 {
    // HMAC-SHA256 accepts keys of any length, so this cannot fail for string secrets.
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any length")
}
