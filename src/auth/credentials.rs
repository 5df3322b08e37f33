//! Credential Validator
//!
//! Resolves a bearer token to its owning principal, and answers the
//! yes/no API-key checks exposed to other services.

use tracing::{debug, instrument};

use crate::auth::token::log_handle;
use crate::auth::{token_digest, AuthContext, AuthenticationResult, Principal, Token};
use crate::types::{Result, TurnstileError};

pub const KEY_NOT_FOUND: &str = "api key does not exist";
pub const KEY_EXPIRED: &str = "api key expired";
pub const KEY_VALIDATED: &str = "api key validated";
pub const KEY_ORPHANED: &str = "no user exists for the specified api key";
pub const KEY_WRONG_OWNER: &str = "api key does not belong to user";
pub const KEY_AND_USER_VALIDATED: &str = "api key and user is validated";

#[derive(Clone)]
pub struct CredentialValidator {
    ctx: AuthContext,
}

impl CredentialValidator {
    pub fn new(ctx: AuthContext) -> Self {
        Self { ctx }
    }

    /// Find an unexpired token row for `token`.
    ///
    /// Rows stored by plaintext (pre-digest) and by digest both match.
    async fn live_token(&self, token: &str) -> Result<Token> {
        if token.is_empty() {
            return Err(TurnstileError::InvalidToken(KEY_NOT_FOUND.into()));
        }

        let digest = token_digest(token);
        let record = self
            .ctx
            .bounded("find_token", self.ctx.store().find_token(token, &digest))
            .await?
            .ok_or_else(|| TurnstileError::InvalidToken(KEY_NOT_FOUND.into()))?;

        if record.is_expired_at(self.ctx.clock().now()) {
            debug!(token = log_handle(&digest), "token expired");
            return Err(TurnstileError::TokenExpired(format!(
                "token for user {} expired {}",
                record.user,
                record.expiry.to_rfc3339()
            )));
        }

        Ok(record)
    }

    /// Resolve `token` to its principal.
    ///
    /// The returned principal carries the token so its capabilities can be
    /// checked without another lookup. A token whose owner no longer exists
    /// is reported as invalid.
    #[instrument(skip_all)]
    pub async fn validate(&self, token: &str) -> Result<Principal> {
        let record = self.live_token(token).await?;

        let mut principal = self
            .ctx
            .bounded(
                "find_principal_by_id",
                self.ctx.store().find_principal_by_id(record.user),
            )
            .await?
            .ok_or_else(|| {
                debug!(principal = record.user, "token has no owner");
                TurnstileError::InvalidToken(KEY_ORPHANED.into())
            })?;

        principal.token = Some(record);
        Ok(principal)
    }

    /// Check that `token` exists and has not expired.
    ///
    /// Only `StoreUnavailable` is returned as an error; every other outcome
    /// is a result with `validated` set accordingly.
    pub async fn check_api_key(&self, username: &str, token: &str) -> Result<AuthenticationResult> {
        match self.live_token(token).await {
            Ok(_) => Ok(AuthenticationResult::validated(username, KEY_VALIDATED)),
            Err(e) => Self::as_rejection(username, e),
        }
    }

    /// Like [`check_api_key`](Self::check_api_key), and also check that the
    /// owner exists and, when `username` is given, that it owns the token.
    pub async fn check_user_api_key(
        &self,
        username: &str,
        token: &str,
    ) -> Result<AuthenticationResult> {
        let principal = match self.validate(token).await {
            Ok(principal) => principal,
            Err(e) => return Self::as_rejection(username, e),
        };

        if !username.is_empty() && !principal.username.eq_ignore_ascii_case(username) {
            return Ok(AuthenticationResult::rejected(username, KEY_WRONG_OWNER));
        }

        Ok(AuthenticationResult::validated(
            username,
            KEY_AND_USER_VALIDATED,
        ))
    }

    fn as_rejection(username: &str, err: TurnstileError) -> Result<AuthenticationResult> {
        match err {
            TurnstileError::StoreUnavailable(_) => Err(err),
            TurnstileError::TokenExpired(_) => {
                Ok(AuthenticationResult::rejected(username, KEY_EXPIRED))
            }
            other => Ok(AuthenticationResult::rejected(username, other.details())),
        }
    }
}
