//! Credential storage
//!
//! The validators only ever see this trait. `MongoCredentialStore` backs it
//! in production; `MemoryStore` backs tests and dev mode.

pub mod memory;

pub use memory::MemoryStore;

use crate::auth::{HashDialect, Principal, PrincipalId, Token};
use crate::types::Result;

/// Point lookups and writes over principals and tokens.
///
/// Not-found is `Ok(None)`. Driver or connection failures are
/// `TurnstileError::StoreUnavailable`.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    /// Find a token stored either by plaintext (legacy rows) or by digest
    async fn find_token(&self, plaintext: &str, digest: &str) -> Result<Option<Token>>;

    async fn find_principal_by_id(&self, id: PrincipalId) -> Result<Option<Principal>>;

    /// `username` is expected to be lowercase already
    async fn find_principal_by_username(&self, username: &str) -> Result<Option<Principal>>;

    /// Persist a new token by digest. Either the whole record is written or
    /// nothing is.
    async fn insert_token(&self, token: &Token) -> Result<()>;

    /// Replace a principal's password digest
    async fn update_password(
        &self,
        id: PrincipalId,
        salt: &str,
        pass_hash: &str,
        dialect: HashDialect,
    ) -> Result<()>;

    /// Cheap reachability check for health probes
    async fn ping(&self) -> Result<()>;
}
