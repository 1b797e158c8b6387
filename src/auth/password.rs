use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

use crate::AppResult;

type HmacSha256 = Hmac<Sha256>;

/// Hash a password under a fresh random salt. Stored as
/// `base64(salt)$base64(mac)`.
pub fn hash_password(password: &str) -> AppResult<String> {
    let mut salt = [0u8; 16];
    rand::rng().fill_bytes(&mut salt);

    let mac = mac_bytes(&salt, password)?;
    Ok(format!("{}${}", STANDARD.encode(salt), STANDARD.encode(mac)))
}

/// Constant-time check of `password` against a stored hash. A malformed
/// stored value verifies as false rather than erroring.
pub fn verify_password(password: &str, stored: &str) -> AppResult<bool> {
    let Some((salt_b64, mac_b64)) = stored.split_once('$') else {
        return Ok(false);
    };
    let (Ok(salt), Ok(expected)) = (STANDARD.decode(salt_b64), STANDARD.decode(mac_b64)) else {
        return Ok(false);
    };

    let mut mac = HmacSha256::new_from_slice(&salt)
        .map_err(|e| anyhow::anyhow!("hmac key: {e}"))?;
    mac.update(password.as_bytes());
    Ok(mac.verify_slice(&expected).is_ok())
}

fn mac_bytes(salt: &[u8], password: &str) -> AppResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(salt)
        .map_err(|e| anyhow::anyhow!("hmac key: {e}"))?;
    mac.update(password.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}
