//! Token and password digests
//!
//! Tokens are indexed by a SHA-256 digest so stored indexes never hold the
//! plaintext. Passwords are digested with the principal's salt under the
//! dialect recorded on the principal: Argon2id for everything written by
//! this crate, SHA-256 only to read accounts imported from older stores.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use subtle::ConstantTimeEq;

use crate::types::TurnstileError;

/// Output length of the canonical password digest in bytes
const ARGON2_OUTPUT_LEN: usize = 32;

/// Algorithm a stored password digest was produced with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashDialect {
    /// Argon2id over password and salt, hex encoded
    #[default]
    Argon2id,
    /// Legacy hex(SHA-256(password + "." + salt)), read-only
    Sha256,
}

impl HashDialect {
    /// Dialect used for every new write
    pub const CANONICAL: HashDialect = HashDialect::Argon2id;

    pub fn is_legacy(self) -> bool {
        self != Self::CANONICAL
    }
}

impl fmt::Display for HashDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashDialect::Argon2id => write!(f, "argon2id"),
            HashDialect::Sha256 => write!(f, "sha256"),
        }
    }
}

/// Digest a bearer token for indexed lookup.
///
/// URL-safe base64 so the digest can travel in a path or query string.
pub fn token_digest(token: &str) -> String {
    let hash = Sha256::digest(token.as_bytes());
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(hash)
}

/// Digest a password with its salt under the given dialect.
pub fn password_digest(
    password: &str,
    salt: &str,
    dialect: HashDialect,
) -> Result<String, TurnstileError> {
    match dialect {
        HashDialect::Argon2id => {
            let mut output = [0u8; ARGON2_OUTPUT_LEN];
            Argon2::default()
                .hash_password_into(password.as_bytes(), salt.as_bytes(), &mut output)
                .map_err(|e| TurnstileError::InvalidInput(format!("Failed to hash password: {e}")))?;
            Ok(hex::encode(output))
        }
        HashDialect::Sha256 => {
            let hash = Sha256::digest(format!("{}.{}", password, salt).as_bytes());
            Ok(hex::encode(hash))
        }
    }
}

/// Generate a fresh random salt for a new password digest
pub fn generate_salt() -> String {
    SaltString::generate(&mut OsRng).as_str().to_string()
}

/// Constant-time comparison of two digests
pub fn digests_match(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
