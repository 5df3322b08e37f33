//! Access Gate
//!
//! Runs in front of every protected handler:
//! `Unauthenticated -> Extracting -> Validating -> Authorizing -> Granted | Denied`.
//! A denied request never reaches its handler. A granted one carries the
//! resolved principal in its request extensions.

use hyper::header::AUTHORIZATION;
use hyper::Request;
use std::fmt;
use tracing::{debug, debug_span, field, Instrument, Span};

use crate::auth::{CredentialValidator, Principal, Tier};
use crate::types::{Result, TurnstileError};

pub const BEARER_SCHEME: &str = "Bearer";

/// Value some clients send after clearing a cookie
const CLEARED_PLACEHOLDER: &str = "undefined";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateStage {
    Unauthenticated,
    Extracting,
    Validating,
    Authorizing,
    Granted,
    Denied,
}

impl GateStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, GateStage::Granted | GateStage::Denied)
    }
}

impl fmt::Display for GateStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            GateStage::Unauthenticated => "unauthenticated",
            GateStage::Extracting => "extracting",
            GateStage::Validating => "validating",
            GateStage::Authorizing => "authorizing",
            GateStage::Granted => "granted",
            GateStage::Denied => "denied",
        };
        f.write_str(name)
    }
}

/// Pull the token out of an `Authorization` header value.
///
/// The value must be exactly `Bearer <token>` with a single space.
pub fn extract_bearer(header: Option<&str>) -> Result<&str> {
    let value = match header {
        None | Some("") | Some(CLEARED_PLACEHOLDER) => {
            return Err(TurnstileError::AuthMissing("no api key was specified".into()))
        }
        Some(value) => value,
    };

    let parts: Vec<&str> = value.split(' ').collect();
    if parts.len() != 2 {
        return Err(TurnstileError::InvalidAuthFormat(
            "invalid authorization header, expected 'Bearer <token>'".into(),
        ));
    }
    if parts[0] != BEARER_SCHEME {
        return Err(TurnstileError::AuthMissingBearer(
            "authorization header must use the Bearer scheme".into(),
        ));
    }
    Ok(parts[1])
}

/// Tier and capability rules for an already-resolved principal
pub fn check_access(principal: &Principal, level: Tier) -> Result<()> {
    if principal.token_capabilities().is_upload_only() && level >= Tier::USER {
        return Err(TurnstileError::NotAuthorized("api key is upload only".into()));
    }
    if !principal.tier.satisfies(level) {
        return Err(TurnstileError::NotAuthorized(format!(
            "user not authorized, requires {}",
            level
        )));
    }
    Ok(())
}

fn enter(stage: GateStage) {
    Span::current().record("stage", field::display(stage));
}

#[derive(Clone)]
pub struct AccessGate {
    validator: CredentialValidator,
}

impl AccessGate {
    pub fn new(validator: CredentialValidator) -> Self {
        Self { validator }
    }

    /// Authenticate the header value and require `level`.
    pub async fn authorize(&self, header: Option<&str>, level: Tier) -> Result<Principal> {
        let span = debug_span!(
            "access_gate",
            %level,
            stage = %GateStage::Unauthenticated,
            principal = field::Empty
        );

        let outcome = self.run(header, level).instrument(span.clone()).await;

        match &outcome {
            Ok(principal) => {
                span.record("stage", field::display(GateStage::Granted));
                span.record("principal", principal.id);
                debug!(parent: &span, "access granted");
            }
            Err(e) => {
                span.record("stage", field::display(GateStage::Denied));
                debug!(parent: &span, reason = e.reason(), "access denied");
            }
        }
        outcome
    }

    async fn run(&self, header: Option<&str>, level: Tier) -> Result<Principal> {
        enter(GateStage::Extracting);
        let token = extract_bearer(header)?;

        enter(GateStage::Validating);
        let principal = self.validator.validate(token).await?;

        enter(GateStage::Authorizing);
        check_access(&principal, level)?;
        Ok(principal)
    }

    /// Gate a request. On success the principal is also stored in the
    /// request extensions for downstream handlers.
    pub async fn guard<B>(&self, req: &mut Request<B>, level: Tier) -> Result<Principal> {
        let header = match req.headers().get(AUTHORIZATION) {
            Some(value) => Some(value.to_str().map_err(|_| {
                TurnstileError::InvalidAuthFormat("authorization header is not valid text".into())
            })?),
            None => None,
        };

        let principal = self.authorize(header, level).await?;
        req.extensions_mut().insert(principal.clone());
        Ok(principal)
    }
}

/// Principal attached by [`AccessGate::guard`]
pub fn principal_from<B>(req: &Request<B>) -> Option<&Principal> {
    req.extensions().get::<Principal>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{token_digest, AuthContext, Capabilities, HashDialect, Token};
    use crate::store::{CredentialStore, MemoryStore};
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn principal(id: i64, tier: Tier) -> Principal {
        Principal {
            id,
            uuid: format!("00000000-0000-4000-8000-{:012}", id),
            username: format!("user{}", id),
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

    fn with_caps(mut principal: Principal, capabilities: Capabilities) -> Principal {
        principal.token = Some(Token {
            token: None,
            token_hash: "digest".into(),
            label: "test".into(),
            user: principal.id,
            capabilities,
            expiry: Utc::now() + Duration::hours(1),
        });
        principal
    }

    #[test]
    fn test_extract_bearer() {
        assert_eq!(extract_bearer(Some("Bearer abc")).unwrap(), "abc");

        assert!(matches!(extract_bearer(None), Err(TurnstileError::AuthMissing(_))));
        assert!(matches!(extract_bearer(Some("")), Err(TurnstileError::AuthMissing(_))));
        assert!(matches!(
            extract_bearer(Some("undefined")),
            Err(TurnstileError::AuthMissing(_))
        ));
        assert!(matches!(
            extract_bearer(Some("Bearer")),
            Err(TurnstileError::InvalidAuthFormat(_))
        ));
        assert!(matches!(
            extract_bearer(Some("Bearer a b")),
            Err(TurnstileError::InvalidAuthFormat(_))
        ));
        assert!(matches!(
            extract_bearer(Some("Basic abc")),
            Err(TurnstileError::AuthMissingBearer(_))
        ));
        // Scheme is case-sensitive
        assert!(matches!(
            extract_bearer(Some("bearer abc")),
            Err(TurnstileError::AuthMissingBearer(_))
        ));
    }

    #[test]
    fn test_upload_only_never_reaches_user_level() {
        for tier in [Tier(0), Tier::UPLOAD, Tier::USER, Tier::ADMIN, Tier(1000)] {
            let p = with_caps(principal(1, tier), Capabilities::UPLOAD_ONLY);
            for level in [Tier::USER, Tier::ADMIN] {
                assert!(
                    matches!(check_access(&p, level), Err(TurnstileError::NotAuthorized(_))),
                    "tier {} at level {}",
                    tier,
                    level
                );
            }
        }

        // Upload-level operations stay open to upload-only tokens
        let p = with_caps(principal(1, Tier::ADMIN), Capabilities::UPLOAD_ONLY);
        assert!(check_access(&p, Tier::UPLOAD).is_ok());
    }

    #[test]
    fn test_tier_threshold() {
        let upload = with_caps(principal(1, Tier::UPLOAD), Capabilities::SESSION);
        assert!(check_access(&upload, Tier::UPLOAD).is_ok());
        assert!(matches!(
            check_access(&upload, Tier::USER),
            Err(TurnstileError::NotAuthorized(_))
        ));

        let admin = with_caps(principal(2, Tier::ADMIN), Capabilities::empty());
        assert!(check_access(&admin, Tier::ADMIN).is_ok());
    }

    #[test]
    fn test_terminal_stages() {
        assert!(GateStage::Granted.is_terminal());
        assert!(GateStage::Denied.is_terminal());
        assert!(!GateStage::Authorizing.is_terminal());
        assert_eq!(GateStage::Extracting.to_string(), "extracting");
    }

    #[tokio::test]
    async fn test_guard_attaches_principal() {
        let store = Arc::new(MemoryStore::new());
        store.insert_principal(principal(7, Tier::USER)).unwrap();
        store
            .insert_token(&Token {
                token: None,
                token_hash: token_digest("ESTsevenARY"),
                label: "test".into(),
                user: 7,
                capabilities: Capabilities::SESSION,
                expiry: Utc::now() + Duration::hours(1),
            })
            .await
            .unwrap();
        let gate = AccessGate::new(CredentialValidator::new(AuthContext::new(store)));

        let mut req = Request::builder()
            .header(AUTHORIZATION, "Bearer ESTsevenARY")
            .body(())
            .unwrap();
        let granted = gate.guard(&mut req, Tier::USER).await.unwrap();
        assert_eq!(granted.id, 7);
        assert_eq!(principal_from(&req).map(|p| p.id), Some(7));

        let mut anonymous = Request::builder().body(()).unwrap();
        let err = gate.guard(&mut anonymous, Tier::UPLOAD).await.unwrap_err();
        assert!(matches!(err, TurnstileError::AuthMissing(_)));
        assert!(principal_from(&anonymous).is_none());
    }
}
