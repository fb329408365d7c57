//! Single-use secrets for email verification and password reset.
//!
//! The raw token only ever travels inside the emailed link; storage keeps its SHA-256 digest.

use rand::{rngs::OsRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use time::{Duration, OffsetDateTime};

const TOKEN_BYTES: usize = 32;

/// A freshly generated token: `raw` goes into the email, `digest` into storage.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub raw: String,
    pub digest: String,
    pub expires_at: OffsetDateTime,
}

pub fn issue(ttl_minutes: i64) -> IssuedToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let raw = hex::encode(bytes);
    IssuedToken {
        digest: digest(&raw),
        raw,
        expires_at: OffsetDateTime::now_utc() + Duration::minutes(ttl_minutes),
    }
}

pub fn digest(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

/// True when `raw` hashes to `stored_digest` and `expires_at` is still ahead.
pub fn matches(raw: &str, stored_digest: &str, expires_at: OffsetDateTime) -> bool {
    if OffsetDateTime::now_utc() >= expires_at {
        return false;
    }
    digest(raw).as_bytes().ct_eq(stored_digest.as_bytes()).into()
}
