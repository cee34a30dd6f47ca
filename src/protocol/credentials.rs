//! Login and CSRF hashing
//!
//! Login: `password = base64(hex(sha256(salt + password)))`, username is the
//! fixed `base64("admin")`. CSRF: `hex(sha256(token))`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

pub const ADMIN_USERNAME: &str = "admin";

/// Lowercase hex SHA-256 of the input
pub fn sha256_hex(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for b in digest {
        out.push_str(&format!("{:02x}", b));
    }
    out
}

/// Credential pair sent with `LOGIN`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub username: String,
    pub password: String,
}

impl LoginCredentials {
    pub fn derive(salt: &str, password: &str) -> Self {
        let hash = sha256_hex(&format!("{}{}", salt, password));
        Self {
            username: STANDARD.encode(ADMIN_USERNAME),
            password: STANDARD.encode(hash),
        }
    }
}

/// Derive the CSRF value from the raw `token` field
pub fn csrf_from_raw(raw: &str) -> String {
    sha256_hex(raw)
}
