//! In-memory credential store
//!
//! Concurrent maps keyed the same way the database indexes are, so the
//! uniqueness rules match. Used by tests and by dev mode when no database is
//! reachable.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::debug;

use super::CredentialStore;
use crate::auth::{HashDialect, Principal, PrincipalId, Token};
use crate::types::{Result, TurnstileError};

#[derive(Default)]
pub struct MemoryStore {
    principals: DashMap<PrincipalId, Principal>,
    /// username -> principal id
    usernames: DashMap<String, PrincipalId>,
    /// row id -> token
    tokens: DashMap<u64, Token>,
    /// token digest -> row id
    token_hashes: DashMap<String, u64>,
    /// legacy plaintext -> row id
    token_plaintexts: DashMap<String, u64>,
    next_row: AtomicU64,
    unavailable: AtomicBool,
    latency: Mutex<Option<Duration>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a principal. Usernames are stored lowercase and must be unique,
    /// as must ids.
    pub fn insert_principal(&self, mut principal: Principal) -> Result<()> {
        principal.username = principal.username.to_lowercase();
        principal.token = None;

        let id_slot = match self.principals.entry(principal.id) {
            Entry::Occupied(_) => {
                return Err(TurnstileError::InvalidInput(format!(
                    "principal {} already exists",
                    principal.id
                )))
            }
            Entry::Vacant(slot) => slot,
        };
        match self.usernames.entry(principal.username.clone()) {
            Entry::Occupied(_) => {
                return Err(TurnstileError::InvalidInput(format!(
                    "username {} already exists",
                    principal.username
                )))
            }
            Entry::Vacant(slot) => {
                slot.insert(principal.id);
            }
        }

        debug!("memory store: added principal {}", principal.id);
        id_slot.insert(principal);
        Ok(())
    }

    /// Add a token row as it would exist from before digests were indexed:
    /// plaintext kept, digest possibly empty.
    pub fn insert_legacy_token(&self, token: Token) -> Result<()> {
        let plaintext = token.token.clone().ok_or_else(|| {
            TurnstileError::InvalidInput("legacy token rows need a plaintext".into())
        })?;

        let row = self.next_row.fetch_add(1, Ordering::SeqCst);
        match self.token_plaintexts.entry(plaintext) {
            Entry::Occupied(_) => {
                return Err(TurnstileError::InvalidInput("duplicate token".into()))
            }
            Entry::Vacant(slot) => {
                slot.insert(row);
            }
        }
        if !token.token_hash.is_empty() {
            self.token_hashes.insert(token.token_hash.clone(), row);
        }
        self.tokens.insert(row, token);
        Ok(())
    }

    /// Make every subsequent call fail as if the backend were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Delay every call by `latency`
    pub fn set_latency(&self, latency: Option<Duration>) {
        *self.latency.lock().unwrap_or_else(|e| e.into_inner()) = latency;
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn principal(&self, id: PrincipalId) -> Option<Principal> {
        self.principals.get(&id).map(|p| p.clone())
    }

    async fn simulate_backend(&self) -> Result<()> {
        let latency = *self.latency.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(TurnstileError::StoreUnavailable(
                "memory store marked unavailable".into(),
            ));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl CredentialStore for MemoryStore {
    async fn find_token(&self, plaintext: &str, digest: &str) -> Result<Option<Token>> {
        self.simulate_backend().await?;

        let row = self
            .token_plaintexts
            .get(plaintext)
            .map(|r| *r)
            .or_else(|| self.token_hashes.get(digest).map(|r| *r));

        Ok(row.and_then(|row| self.tokens.get(&row).map(|t| t.clone())))
    }

    async fn find_principal_by_id(&self, id: PrincipalId) -> Result<Option<Principal>> {
        self.simulate_backend().await?;
        Ok(self.principals.get(&id).map(|p| p.clone()))
    }

    async fn find_principal_by_username(&self, username: &str) -> Result<Option<Principal>> {
        self.simulate_backend().await?;
        let id = match self.usernames.get(username) {
            Some(id) => *id,
            None => return Ok(None),
        };
        Ok(self.principals.get(&id).map(|p| p.clone()))
    }

    async fn insert_token(&self, token: &Token) -> Result<()> {
        self.simulate_backend().await?;

        let row = self.next_row.fetch_add(1, Ordering::SeqCst);
        match self.token_hashes.entry(token.token_hash.clone()) {
            Entry::Occupied(_) => {
                return Err(TurnstileError::Internal("duplicate token digest".into()))
            }
            Entry::Vacant(slot) => {
                // Only the digest is persisted for new rows
                let mut stored = token.clone();
                stored.token = None;
                self.tokens.insert(row, stored);
                slot.insert(row);
            }
        }
        Ok(())
    }

    async fn update_password(
        &self,
        id: PrincipalId,
        salt: &str,
        pass_hash: &str,
        dialect: HashDialect,
    ) -> Result<()> {
        self.simulate_backend().await?;

        let mut principal = self
            .principals
            .get_mut(&id)
            .ok_or_else(|| TurnstileError::InvalidInput(format!("principal {} not found", id)))?;
        principal.salt = salt.to_string();
        principal.pass_hash = pass_hash.to_string();
        principal.hash_dialect = dialect;
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.simulate_backend().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{token_digest, Capabilities, Tier};
    use chrono::{Duration as ChronoDuration, Utc};

    fn principal(id: PrincipalId, username: &str) -> Principal {
        Principal {
            id,
            uuid: uuid::Uuid::new_v4().to_string(),
            username: username.into(),
            salt: String::new(),
            pass_hash: String::new(),
            hash_dialect: HashDialect::Argon2id,
            did: None,
            email: None,
            tier: Tier::USER,
            flags: 0,
            storage_disabled: false,
            token: None,
        }
    }

    fn token(plaintext: &str, user: PrincipalId) -> Token {
        Token {
            token: Some(plaintext.to_string()),
            token_hash: token_digest(plaintext),
            label: "test".into(),
            user,
            capabilities: Capabilities::empty(),
            expiry: Utc::now() + ChronoDuration::hours(1),
        }
    }

    #[test]
    fn test_usernames_are_unique_case_insensitively() {
        let store = MemoryStore::new();
        store.insert_principal(principal(1, "Alice")).unwrap();
        assert!(store.insert_principal(principal(2, "alice")).is_err());
        assert!(store.insert_principal(principal(1, "bob")).is_err());
        assert_eq!(store.principal(1).unwrap().username, "alice");
    }

    #[test]
    fn test_concurrent_inserts_with_same_id() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let handles: Vec<_> = (0..8)
            .map(|n| {
                let store = store.clone();
                std::thread::spawn(move || {
                    store
                        .insert_principal(principal(5, &format!("racer{}", n)))
                        .is_ok()
                })
            })
            .collect();

        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(inserted, 1);
        assert_eq!(store.usernames.len(), 1);
        let winner = store.principal(5).unwrap();
        assert_eq!(store.usernames.get(&winner.username).map(|id| *id), Some(5));
    }

    #[tokio::test]
    async fn test_new_tokens_persist_digest_only() {
        let store = MemoryStore::new();
        let issued = token("ESTnewARY", 1);
        store.insert_token(&issued).await.unwrap();

        let found = store
            .find_token("ESTnewARY", &issued.token_hash)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.token, None);
        assert_eq!(found.token_hash, issued.token_hash);

        // Same digest twice is rejected
        assert!(store.insert_token(&issued).await.is_err());
        assert_eq!(store.token_count(), 1);
    }

    #[tokio::test]
    async fn test_legacy_rows_found_by_plaintext() {
        let store = MemoryStore::new();
        let mut legacy = token("ESTlegacyARY", 1);
        legacy.token_hash = String::new();
        store.insert_legacy_token(legacy).unwrap();

        let found = store
            .find_token("ESTlegacyARY", &token_digest("ESTlegacyARY"))
            .await
            .unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_unavailable_store_errors() {
        let store = MemoryStore::new();
        store.set_unavailable(true);
        let err = store.find_principal_by_id(1).await.unwrap_err();
        assert!(err.is_retryable());

        store.set_unavailable(false);
        assert!(store.find_principal_by_id(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_password() {
        let store = MemoryStore::new();
        store.insert_principal(principal(3, "carol")).unwrap();
        store
            .update_password(3, "newsalt1", "digest", HashDialect::Argon2id)
            .await
            .unwrap();
        let carol = store.principal(3).unwrap();
        assert_eq!(carol.salt, "newsalt1");
        assert_eq!(carol.pass_hash, "digest");

        assert!(store
            .update_password(99, "s", "d", HashDialect::Argon2id)
            .await
            .is_err());
    }
}
