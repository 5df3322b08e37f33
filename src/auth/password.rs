//! Password Validator
//!
//! Checks a username/password pair against the stored digest. Accounts carry
//! the dialect their digest was written with; older accounts may hold an
//! unsalted value or a bcrypt hash instead. Every failure reports the same
//! detail so callers cannot tell unknown users from wrong passwords.

use tracing::{debug, info, instrument, warn};

use crate::auth::{
    digests_match, generate_salt, password_digest, AuthContext, AuthenticationResult,
    HashDialect, Principal,
};
use crate::types::{Result, TurnstileError};

pub const USER_NOT_FOUND: &str = "user not found";
pub const USER_AUTHENTICATED: &str = "user authenticated";

/// Which comparison accepted the password
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MatchedBy {
    Salted(HashDialect),
    /// Unsalted accounts compare against the stored value directly
    Plaintext,
    Bcrypt,
}

impl MatchedBy {
    fn is_legacy(self) -> bool {
        match self {
            MatchedBy::Salted(dialect) => dialect.is_legacy(),
            MatchedBy::Plaintext | MatchedBy::Bcrypt => true,
        }
    }
}

/// Salt and digest for a new password under the canonical dialect
pub fn hash_new_password(password: &str) -> Result<(String, String)> {
    if password.is_empty() {
        return Err(TurnstileError::InvalidInput("password must not be empty".into()));
    }
    let salt = generate_salt();
    let digest = password_digest(password, &salt, HashDialect::CANONICAL)?;
    Ok((salt, digest))
}

/// Salt for the throwaway digest run on rejected logins
const DUMMY_SALT: &str = "turnstile-timing-pad";

#[cfg(test)]
thread_local! {
    static CANONICAL_DIGESTS: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

fn salted_digest(password: &str, salt: &str, dialect: HashDialect) -> Result<String> {
    #[cfg(test)]
    if dialect == HashDialect::CANONICAL {
        CANONICAL_DIGESTS.with(|n| n.set(n.get() + 1));
    }
    password_digest(password, salt, dialect)
}

/// Pay for one canonical digest so a rejection costs the same whether or
/// not the account exists.
fn pad_rejection(password: &str) {
    let _ = salted_digest(password, DUMMY_SALT, HashDialect::CANONICAL);
}

/// Whether checking this account already ran a canonical digest
fn digests_canonically(principal: &Principal) -> bool {
    !principal.salt.is_empty() && principal.hash_dialect == HashDialect::CANONICAL
}

fn looks_like_bcrypt(hash: &str) -> bool {
    hash.starts_with("$2")
}

fn match_password(principal: &Principal, password: &str) -> Option<MatchedBy> {
    if principal.salt.is_empty() {
        if !principal.pass_hash.is_empty() && digests_match(password, &principal.pass_hash) {
            return Some(MatchedBy::Plaintext);
        }
    } else {
        match salted_digest(password, &principal.salt, principal.hash_dialect) {
            Ok(digest) if digests_match(&digest, &principal.pass_hash) => {
                return Some(MatchedBy::Salted(principal.hash_dialect));
            }
            Ok(_) => {}
            Err(e) => debug!(principal = principal.id, "cannot digest password: {}", e),
        }
    }

    if looks_like_bcrypt(&principal.pass_hash)
        && bcrypt::verify(password, &principal.pass_hash).unwrap_or(false)
    {
        return Some(MatchedBy::Bcrypt);
    }

    None
}

#[derive(Clone)]
pub struct PasswordValidator {
    ctx: AuthContext,
    migrate_legacy: bool,
}

impl PasswordValidator {
    pub fn new(ctx: AuthContext) -> Self {
        Self {
            ctx,
            migrate_legacy: true,
        }
    }

    /// Rehash passwords accepted through a legacy path on successful login
    pub fn with_migration(mut self, enabled: bool) -> Self {
        self.migrate_legacy = enabled;
        self
    }

    /// Check `password` for `username`.
    ///
    /// Lookup is on the lowercased username; the result echoes the username
    /// as given. Only `StoreUnavailable` comes back as an error.
    #[instrument(skip(self, password))]
    pub async fn validate(&self, username: &str, password: &str) -> Result<AuthenticationResult> {
        let normalized = username.to_lowercase();
        let principal = match self
            .ctx
            .bounded(
                "find_principal_by_username",
                self.ctx.store().find_principal_by_username(&normalized),
            )
            .await?
        {
            Some(principal) => principal,
            None => {
                debug!("no such user");
                pad_rejection(password);
                return Ok(AuthenticationResult::rejected(username, USER_NOT_FOUND));
            }
        };

        if password.is_empty() {
            pad_rejection(password);
            return Ok(AuthenticationResult::rejected(username, USER_NOT_FOUND));
        }

        let matched = match match_password(&principal, password) {
            Some(matched) => matched,
            None => {
                debug!(principal = principal.id, "password mismatch");
                if !digests_canonically(&principal) {
                    pad_rejection(password);
                }
                return Ok(AuthenticationResult::rejected(username, USER_NOT_FOUND));
            }
        };

        if self.migrate_legacy && matched.is_legacy() {
            self.migrate(&principal, password, matched).await;
        }

        Ok(AuthenticationResult::validated(username, USER_AUTHENTICATED))
    }

    /// Best effort; a failed rehash leaves the old digest in place.
    async fn migrate(&self, principal: &Principal, password: &str, from: MatchedBy) {
        let (salt, digest) = match hash_new_password(password) {
            Ok(pair) => pair,
            Err(e) => {
                warn!(principal = principal.id, "cannot rehash password: {}", e);
                return;
            }
        };

        let update = self.ctx.store().update_password(
            principal.id,
            &salt,
            &digest,
            HashDialect::CANONICAL,
        );
        match self.ctx.bounded("update_password", update).await {
            Ok(()) => info!(
                principal = principal.id,
                from = ?from,
                "migrated password digest to {}",
                HashDialect::CANONICAL
            ),
            Err(e) => warn!(principal = principal.id, "password migration failed: {}", e),
        }
    }
}
