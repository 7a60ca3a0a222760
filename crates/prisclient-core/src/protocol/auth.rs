//! Engage credential and correlation id minting.
//!
//! The credential is `base64(HMAC-SHA256(key = secret, msg = time ‖ source ‖ secret))`,
//! with the timestamp rendered in decimal and no separators. It is fully
//! deterministic so the hub can recompute and compare it; freshness is judged
//! by the hub from the timestamp carried next to it.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::error::{PrisError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Bytes of entropy in a correlation id (rendered as twice as many hex chars).
pub const RANDOM_ID_BYTES: usize = 8;

/// Compute the engage credential for `source_id` at `timestamp`.
pub fn compute_credential(secret: &str, source_id: &str, timestamp: i64) -> Result<String> {
    let msg = format!("{timestamp}{source_id}{secret}");
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| PrisError::Internal(format!("hmac key rejected: {e}")))?;
    mac.update(msg.as_bytes());
    Ok(BASE64.encode(mac.finalize().into_bytes()))
}

/// Current wall-clock time in whole seconds since the epoch (UTC).
pub fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}

/// Mint a 16-char lowercase hex correlation id from the thread-local CSPRNG.
pub fn random_id() -> String {
    let mut b = [0u8; RANDOM_ID_BYTES];
    rand::rng().fill_bytes(&mut b);
    hex::encode(b)
}
