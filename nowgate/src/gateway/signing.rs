//! HMAC-SHA512 signature verification for NOWPayments IPN callbacks.
//!
//! NOWPayments signs each IPN delivery by computing a lowercase hex
//! HMAC-SHA512 over the raw request body, keyed by the account's IPN secret,
//! and sends it in the `x-nowpayments-sig` header. The signature must be
//! computed over the body bytes exactly as received, before any JSON
//! parsing or re-serialization.

use hmac::{Hmac, Mac};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Compute the IPN signature for a payload.
///
/// Returns the lowercase hex HMAC-SHA512 of `payload` keyed by `secret`.
pub fn sign_payload(payload: &[u8], secret: &str) -> String {
    let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).expect("HMAC accepts keys of any size");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

/// Verify a received IPN signature against the raw request body.
///
/// Returns `true` only if `received` equals the expected signature. The
/// comparison is constant-time; this header is the sole trust boundary for
/// inbound webhooks.
pub fn verify_signature(payload: &[u8], received: &str, secret: &str) -> bool {
    let expected = sign_payload(payload, secret);
    constant_time_eq(expected.as_bytes(), received.as_bytes())
}

/// Constant-time byte comparison to prevent timing attacks.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
