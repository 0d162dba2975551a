//! Webhook signature verification.
//!
//! The sender signs the raw request body with HMAC-SHA256 using the shared
//! webhook key and puts the hex digest in the `X-Webhook-Signature` header.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded HMAC of the request body.
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Verify a webhook body against a hex-encoded HMAC-SHA256 signature.
///
/// # Arguments
///
/// * `body` - The raw request body, exactly as received
/// * `signature` - Hex digest supplied by the caller
/// * `secret` - The shared webhook key
///
/// # Returns
///
/// `true` only if `signature` decodes from hex and equals
/// HMAC-SHA256(secret, body). Bad hex and a wrong digest both yield `false`.
pub fn verify_webhook_signature(body: &[u8], signature: &str, secret: &str) -> bool {
    let provided = match hex::decode(signature) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(
                signature_length = signature.len(),
                error = %e,
                "webhook_signature_not_hex"
            );
            return false;
        }
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("webhook_signature_invalid_key");
            return false;
        }
    };

    mac.update(body);

    // verify_slice compares in constant time
    let valid = mac.verify_slice(&provided).is_ok();

    if !valid {
        warn!(
            provided_length = provided.len(),
            body_length = body.len(),
            "webhook_signature_mismatch"
        );
    }

    valid
}

/// Check if webhook signature verification is enabled.
pub fn is_signature_verification_enabled(webhook_key: &Option<String>) -> bool {
    webhook_key
        .as_ref()
        .map(|k| !k.trim().is_empty())
        .unwrap_or(false)
}
