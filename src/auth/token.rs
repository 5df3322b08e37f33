//! Bearer token format and issuance
//!
//! Tokens look like `EST<uuid>ARY`. Older deployments also handed out
//! `SECRET<uuid>SECRET`; that wrapper is still recognized as well-formed but
//! never issued.

use chrono::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{token_digest, AuthContext, Capabilities, PrincipalId, Token};
use crate::types::{Result, TurnstileError};

pub const TOKEN_PREFIX: &str = "EST";
pub const TOKEN_SUFFIX: &str = "ARY";
const LEGACY_WRAPPER: &str = "SECRET";

/// Label stored on tokens when the caller does not choose one
pub const DEFAULT_TOKEN_LABEL: &str = "issued";

/// Lifetime used for "permanent" tokens (100 years)
pub fn permanent_lifetime() -> Duration {
    Duration::hours(24 * 365 * 100)
}

/// Create a new plaintext token
pub fn generate_token() -> String {
    format!("{}{}{}", TOKEN_PREFIX, Uuid::new_v4(), TOKEN_SUFFIX)
}

/// Check if a string has the shape of a token this service issued
pub fn is_valid_token_format(candidate: &str) -> bool {
    let inner = candidate
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|rest| rest.strip_suffix(TOKEN_SUFFIX))
        .or_else(|| {
            candidate
                .strip_prefix(LEGACY_WRAPPER)
                .and_then(|rest| rest.strip_suffix(LEGACY_WRAPPER))
        });

    match inner {
        Some(uuid) if !uuid.is_empty() => Uuid::parse_str(uuid).is_ok(),
        _ => false,
    }
}

/// Short, non-reversible handle for logging a token
pub fn log_handle(token_hash: &str) -> &str {
    token_hash.get(..8).unwrap_or(token_hash)
}

/// Mints tokens for existing principals
#[derive(Clone)]
pub struct TokenIssuer {
    ctx: AuthContext,
    label: String,
}

impl TokenIssuer {
    pub fn new(ctx: AuthContext) -> Self {
        Self {
            ctx,
            label: DEFAULT_TOKEN_LABEL.to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Issue a token for `principal_id`.
    ///
    /// A zero `lifetime` means permanent (100 years). Negative lifetimes are
    /// rejected. New tokens are upload-only session tokens. The returned
    /// token carries the plaintext; the store only ever receives the digest.
    pub async fn issue(&self, principal_id: PrincipalId, lifetime: Duration) -> Result<Token> {
        if lifetime < Duration::zero() {
            return Err(TurnstileError::InvalidInput(format!(
                "token lifetime must not be negative (got {}s)",
                lifetime.num_seconds()
            )));
        }

        let principal = self
            .ctx
            .bounded(
                "find_principal_by_id",
                self.ctx.store().find_principal_by_id(principal_id),
            )
            .await?
            .ok_or_else(|| {
                TurnstileError::InvalidInput(format!("principal {} does not exist", principal_id))
            })?;

        let lifetime = if lifetime.is_zero() {
            permanent_lifetime()
        } else {
            lifetime
        };
        let expiry = self
            .ctx
            .clock()
            .now()
            .checked_add_signed(lifetime)
            .ok_or_else(|| TurnstileError::InvalidInput("token lifetime out of range".into()))?;

        let plaintext = generate_token();
        let record = Token {
            token: None,
            token_hash: token_digest(&plaintext),
            label: self.label.clone(),
            user: principal.id,
            capabilities: Capabilities::UPLOAD_ONLY | Capabilities::SESSION,
            expiry,
        };

        if let Err(e) = self
            .ctx
            .bounded("insert_token", self.ctx.store().insert_token(&record))
            .await
        {
            warn!(principal = principal.id, "token issuance failed: {}", e);
            return Err(e);
        }

        info!(
            principal = principal.id,
            token = log_handle(&record.token_hash),
            expires = %record.expiry,
            "issued token"
        );

        Ok(Token {
            token: Some(plaintext),
            ..record
        })
    }
}
