//! End-to-end authentication flows against the in-memory store

use chrono::{Duration, Utc};
use futures_util::future::join_all;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

use turnstile::auth::{
    hash_new_password, password_digest, permanent_lifetime, token_digest, AccessGate,
    AuthContext, Capabilities, Clock, CredentialValidator, HashDialect, ManualClock,
    PasswordValidator, Principal, PrincipalId, Tier, Token, TokenIssuer,
};
use turnstile::store::{CredentialStore, MemoryStore};
use turnstile::TurnstileError;

struct Harness {
    store: Arc<MemoryStore>,
    clock: ManualClock,
    issuer: TokenIssuer,
    credentials: CredentialValidator,
    passwords: PasswordValidator,
    gate: AccessGate,
}

fn harness() -> Harness {
    let store = Arc::new(MemoryStore::new());
    let clock = ManualClock::new(Utc::now());
    let ctx = AuthContext::new(store.clone()).with_clock(Arc::new(clock.clone()));
    let credentials = CredentialValidator::new(ctx.clone());
    Harness {
        store,
        clock,
        issuer: TokenIssuer::new(ctx.clone()),
        passwords: PasswordValidator::new(ctx.clone()),
        gate: AccessGate::new(credentials.clone()),
        credentials,
    }
}

fn principal(id: PrincipalId, username: &str, tier: Tier) -> Principal {
    Principal {
        id,
        uuid: format!("7d3e0c2a-0000-4000-8000-{:012}", id),
        username: username.into(),
        salt: String::new(),
        pass_hash: String::new(),
        hash_dialect: HashDialect::Argon2id,
        did: None,
        email: None,
        tier,
        flags: 0,
        storage_disabled: false,
        token: None,
    }
}

impl Harness {
    fn add(&self, principal: Principal) {
        self.store.insert_principal(principal).unwrap();
    }

    /// Store a token directly, bypassing the issuer's default capabilities
    async fn add_token(&self, plaintext: &str, user: PrincipalId, capabilities: Capabilities) {
        self.store
            .insert_token(&Token {
                token: None,
                token_hash: token_digest(plaintext),
                label: "seeded".into(),
                user,
                capabilities,
                expiry: self.clock.now() + Duration::days(1),
            })
            .await
            .unwrap();
    }
}

fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

#[tokio::test]
async fn two_hour_token_expires_between_one_and_three_hours() {
    let h = harness();
    h.add(principal(1, "uploader", Tier::UPLOAD));

    let issued = h.issuer.issue(1, Duration::hours(2)).await.unwrap();
    let header = bearer(issued.token.as_deref().unwrap());

    h.clock.advance(Duration::hours(1));
    let granted = assert_ok!(h.gate.authorize(Some(&header), Tier::UPLOAD).await);
    assert_eq!(granted.id, 1);

    h.clock.advance(Duration::hours(2));
    let err = assert_err!(h.gate.authorize(Some(&header), Tier::UPLOAD).await);
    assert!(matches!(err, TurnstileError::TokenExpired(_)));
}

#[tokio::test]
async fn permanent_tokens_last_a_century() {
    let h = harness();
    h.add(principal(1, "uploader", Tier::UPLOAD));
    let issued_at = h.clock.now();

    let issued = h.issuer.issue(1, Duration::zero()).await.unwrap();
    assert_eq!(issued.expiry - issued_at, permanent_lifetime());

    h.clock.advance(Duration::days(365 * 99));
    assert_ok!(h.credentials.validate(issued.token.as_deref().unwrap()).await);
}

#[tokio::test]
async fn header_shape_errors() {
    let h = harness();

    let err = assert_err!(h.gate.authorize(Some("Basic abc"), Tier::UPLOAD).await);
    assert!(matches!(err, TurnstileError::AuthMissingBearer(_)));

    let err = assert_err!(h.gate.authorize(None, Tier::UPLOAD).await);
    assert!(matches!(err, TurnstileError::AuthMissing(_)));

    let err = assert_err!(h.gate.authorize(Some("Bearer"), Tier::UPLOAD).await);
    assert!(matches!(err, TurnstileError::InvalidAuthFormat(_)));

    let err = assert_err!(h.gate.authorize(Some("Bearer ESTnopeARY"), Tier::UPLOAD).await);
    assert!(matches!(err, TurnstileError::InvalidToken(_)));
}

#[tokio::test]
async fn upload_tier_cannot_reach_user_operations() {
    let h = harness();
    h.add(principal(1, "uploader", Tier::UPLOAD));
    h.add_token("ESTsessionARY", 1, Capabilities::SESSION).await;
    h.add_token("ESTrestrictedARY", 1, Capabilities::UPLOAD_ONLY).await;

    for token in ["ESTsessionARY", "ESTrestrictedARY"] {
        let err = assert_err!(h.gate.authorize(Some(&bearer(token)), Tier::USER).await);
        assert!(matches!(err, TurnstileError::NotAuthorized(_)));
    }
}

#[tokio::test]
async fn upload_only_tokens_are_restricted_even_for_admins() {
    let h = harness();
    h.add(principal(1, "root", Tier::ADMIN));
    let issued = h.issuer.issue(1, Duration::hours(1)).await.unwrap();
    let header = bearer(issued.token.as_deref().unwrap());

    assert_ok!(h.gate.authorize(Some(&header), Tier::UPLOAD).await);
    for level in [Tier::USER, Tier::ADMIN] {
        let err = assert_err!(h.gate.authorize(Some(&header), level).await);
        assert!(matches!(err, TurnstileError::NotAuthorized(_)));
    }

    // The same admin with an unrestricted token passes
    h.add_token("ESTrootARY", 1, Capabilities::SESSION).await;
    assert_ok!(h.gate.authorize(Some(&bearer("ESTrootARY")), Tier::ADMIN).await);
}

#[tokio::test]
async fn legacy_plaintext_rows_and_digest_rows_resolve_alike() {
    let h = harness();
    h.add(principal(5, "migrated", Tier::USER));

    // Row from before digests were indexed
    h.store
        .insert_legacy_token(Token {
            token: Some("ESTolderARY".into()),
            token_hash: String::new(),
            label: "legacy".into(),
            user: 5,
            capabilities: Capabilities::empty(),
            expiry: h.clock.now() + Duration::days(1),
        })
        .unwrap();
    h.add_token("ESTnewerARY", 5, Capabilities::empty()).await;

    let by_plaintext = h.credentials.validate("ESTolderARY").await.unwrap();
    let by_digest = h.credentials.validate("ESTnewerARY").await.unwrap();
    assert_eq!(by_plaintext.id, 5);
    assert_eq!(by_digest.id, 5);
}

#[tokio::test]
async fn password_failures_are_indistinguishable() {
    let h = harness();
    let (salt, digest) = hash_new_password("s3cret-passphrase").unwrap();
    let mut alice = principal(1, "alice", Tier::USER);
    alice.salt = salt;
    alice.pass_hash = digest;
    h.add(alice);

    let ok = h.passwords.validate("ALICE", "s3cret-passphrase").await.unwrap();
    assert!(ok.is_validated());
    assert_eq!(ok.result.details, "user authenticated");

    let wrong_password = h.passwords.validate("alice", "s3cret-passphrasE").await.unwrap();
    let unknown_user = h.passwords.validate("bob", "s3cret-passphrase").await.unwrap();
    assert!(!wrong_password.is_validated());
    assert_eq!(wrong_password.result, unknown_user.result);
    assert_eq!(unknown_user.result.details, "user not found");
}

#[tokio::test]
async fn legacy_sha256_account_round_trip() {
    let h = harness();
    let mut carol = principal(3, "carol", Tier::USER);
    carol.salt = "legacysalt".into();
    carol.pass_hash = password_digest("tr0ub4dor", "legacysalt", HashDialect::Sha256).unwrap();
    carol.hash_dialect = HashDialect::Sha256;
    h.add(carol);

    assert!(!h.passwords.validate("carol", "tr0ub4dor&3").await.unwrap().is_validated());
    assert!(h.passwords.validate("carol", "tr0ub4dor").await.unwrap().is_validated());
    assert_eq!(h.store.principal(3).unwrap().hash_dialect, HashDialect::Argon2id);
}

#[tokio::test]
async fn slow_store_is_unavailable_not_invalid() {
    let store = Arc::new(MemoryStore::new());
    store.insert_principal(principal(1, "alice", Tier::ADMIN)).unwrap();
    let ctx = AuthContext::new(store.clone())
        .with_store_timeout(std::time::Duration::from_millis(20));
    let gate = AccessGate::new(CredentialValidator::new(ctx));

    store.set_latency(Some(std::time::Duration::from_millis(500)));
    let err = assert_err!(gate.authorize(Some("Bearer ESTanyARY"), Tier::UPLOAD).await);
    assert!(matches!(err, TurnstileError::StoreUnavailable(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn concurrent_validation() {
    let h = harness();
    h.add(principal(1, "alice", Tier::USER));
    let issued = h.issuer.issue(1, Duration::hours(1)).await.unwrap();
    let plaintext = issued.token.unwrap();

    let results = join_all((0..32).map(|_| h.credentials.validate(&plaintext))).await;
    assert!(results.iter().all(|r| matches!(r, Ok(p) if p.id == 1)));
}
