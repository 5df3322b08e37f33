//! Principals, tokens and check results
//!
//! Storage-independent shapes. The database layer converts its documents
//! into these before anything in `auth` looks at them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{Capabilities, HashDialect, Tier};

/// Numeric principal identifier
pub type PrincipalId = i64;

/// An account that can hold tokens and log in
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: PrincipalId,
    pub uuid: String,
    /// Always lowercase
    pub username: String,
    /// Empty for legacy accounts that predate salting
    pub salt: String,
    pub pass_hash: String,
    pub hash_dialect: HashDialect,
    pub did: Option<String>,
    pub email: Option<String>,
    pub tier: Tier,
    pub flags: i64,
    pub storage_disabled: bool,
    /// Token the principal was resolved from for the current request.
    /// Never persisted.
    pub token: Option<Token>,
}

impl Principal {
    /// Capabilities of the resolved token, empty if resolved without one
    pub fn token_capabilities(&self) -> Capabilities {
        self.token
            .as_ref()
            .map(|t| t.capabilities)
            .unwrap_or_default()
    }
}

/// A bearer credential bound to a principal
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Plaintext. Present on freshly issued tokens and on legacy rows stored
    /// before digests existed; new rows persist only the digest.
    pub token: Option<String>,
    pub token_hash: String,
    pub label: String,
    pub user: PrincipalId,
    pub capabilities: Capabilities,
    pub expiry: DateTime<Utc>,
}

impl Token {
    /// A token is expired once its expiry is not in the future
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry <= now
    }

    pub fn is_upload_only(&self) -> bool {
        self.capabilities.is_upload_only()
    }
}

/// Yes/no outcome of a credential check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    pub validated: bool,
    pub details: String,
}

/// Response body of the check endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticationResult {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub username: String,
    pub result: AuthResult,
}

impl AuthenticationResult {
    pub fn validated(username: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            result: AuthResult {
                validated: true,
                details: details.into(),
            },
        }
    }

    pub fn rejected(username: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            result: AuthResult {
                validated: false,
                details: details.into(),
            },
        }
    }

    pub fn is_validated(&self) -> bool {
        self.result.validated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn token_expiring_at(expiry: DateTime<Utc>) -> Token {
        Token {
            token: None,
            token_hash: "hash".into(),
            label: "test".into(),
            user: 1,
            capabilities: Capabilities::UPLOAD_ONLY,
            expiry,
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let now = Utc::now();
        assert!(token_expiring_at(now).is_expired_at(now));
        assert!(token_expiring_at(now - Duration::seconds(1)).is_expired_at(now));
        assert!(!token_expiring_at(now + Duration::seconds(1)).is_expired_at(now));
    }

    #[test]
    fn test_result_serialization() {
        let result = AuthenticationResult::rejected("alice", "user not found");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["username"], "alice");
        assert_eq!(json["result"]["validated"], false);
        assert_eq!(json["result"]["details"], "user not found");

        // Empty usernames are omitted
        let json = serde_json::to_value(AuthenticationResult::validated("", "ok")).unwrap();
        assert!(json.get("username").is_none());
    }
}
