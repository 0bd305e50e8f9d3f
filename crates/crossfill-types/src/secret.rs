//! Hashlock secrets.
//!
//! A hashlock is `SHA-256(secret)`. Secrets are validated for length before
//! they are hashed, so an empty or oversized payload is rejected as
//! malformed rather than compared.

use sha2::{Digest, Sha256};

use crate::constants::MAX_SECRET_LEN;
use crate::error::{CrossfillError, Result};
use crate::ids::Hash32;

/// Reject secrets that are empty or longer than [`MAX_SECRET_LEN`].
pub fn validate_secret(secret: &[u8]) -> Result<()> {
    if secret.is_empty() || secret.len() > MAX_SECRET_LEN {
        return Err(CrossfillError::MalformedSecret { len: secret.len() });
    }
    Ok(())
}

/// Hashlock committing to `secret`.
pub fn hashlock(secret: &[u8]) -> Result<Hash32> {
    validate_secret(secret)?;
    Ok(Hash32(Sha256::digest(secret).into()))
}

/// Check a disclosed secret against a stored hashlock.
pub fn verify_secret(secret: &[u8], expected: &Hash32) -> Result<()> {
    if hashlock(secret)? == *expected {
        Ok(())
    } else {
        Err(CrossfillError::HashMismatch)
    }
}

/// Random 32-byte secret together with its hashlock.
#[cfg(any(test, feature = "test-helpers"))]
#[must_use]
pub fn random_secret() -> (Vec<u8>, Hash32) {
    use rand::RngCore;

    let mut secret = vec![0u8; MAX_SECRET_LEN];
    rand::thread_rng().fill_bytes(&mut secret);
    let lock = Hash32(Sha256::digest(&secret).into());
    (secret, lock)
}
