//! Webhook signature verification.
//!
//! LINE signs every webhook request body with the channel secret and sends
//! `base64(HMAC-SHA256(channel_secret, body))` in the `X-Line-Signature`
//! header.

use {
    base64::{Engine, engine::general_purpose::STANDARD},
    hmac::{Hmac, Mac},
    sha2::Sha256,
    tracing::debug,
};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "x-line-signature";

/// Compute the signature LINE would send for `body`.
pub fn compute_signature(body: &[u8], channel_secret: &str) -> String {
    // HMAC accepts keys of any length.
    let mut mac = match HmacSha256::new_from_slice(channel_secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Verify `signature_header` against the raw request body.
///
/// The comparison is constant-time. Must be called on the exact bytes
/// received, before any JSON parsing.
pub fn verify_signature(body: &[u8], signature_header: &str, channel_secret: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature_header.trim()) else {
        debug!("signature header is not valid base64");
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}
