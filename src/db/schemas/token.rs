//! Token document schema

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::auth::{Capabilities, PrincipalId, Token};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

pub const TOKEN_COLLECTION: &str = "tokens";

/// Token as stored in MongoDB.
///
/// `token` (plaintext) only exists on rows written before digests were
/// indexed; this service never writes it. Capabilities are stored both as a
/// bitset and as the two flags older readers expect.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct TokenDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default)]
    pub token_hash: String,

    #[serde(default)]
    pub label: String,

    pub user: PrincipalId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<u32>,

    #[serde(default)]
    pub upload_only: bool,

    #[serde(default)]
    pub is_session: bool,

    pub expiry: DateTime,
}

impl TokenDoc {
    pub fn capability_set(&self) -> Capabilities {
        match self.capabilities {
            Some(bits) => Capabilities::from_bits_truncate(bits),
            None => Capabilities::from_flags(self.upload_only, self.is_session),
        }
    }
}

impl From<&Token> for TokenDoc {
    fn from(token: &Token) -> Self {
        TokenDoc {
            _id: None,
            metadata: Metadata::new(),
            token: None,
            token_hash: token.token_hash.clone(),
            label: token.label.clone(),
            user: token.user,
            capabilities: Some(token.capabilities.bits()),
            upload_only: token.capabilities.is_upload_only(),
            is_session: token.capabilities.is_session(),
            expiry: DateTime::from_chrono(token.expiry),
        }
    }
}

impl From<TokenDoc> for Token {
    fn from(doc: TokenDoc) -> Self {
        let capabilities = doc.capability_set();
        Token {
            token: doc.token,
            token_hash: doc.token_hash,
            label: doc.label,
            user: doc.user,
            capabilities,
            expiry: doc.expiry.to_chrono(),
        }
    }
}

impl IntoIndexes for TokenDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Legacy plaintext rows only; sparse so digest-only rows don't collide
            (
                doc! { "token": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .sparse(true)
                        .name("token_unique".to_string())
                        .build(),
                ),
            ),
            // Partial so legacy rows with a missing or empty digest don't collide
            (
                doc! { "token_hash": 1 },
                Some(
                    IndexOptions::builder()
                        .unique(true)
                        .partial_filter_expression(doc! {
                            "token_hash": { "$type": "string", "$gt": "" }
                        })
                        .name("token_hash_unique".to_string())
                        .build(),
                ),
            ),
            (
                doc! { "user": 1 },
                Some(
                    IndexOptions::builder()
                        .name("user_index".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for TokenDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn issued() -> Token {
        Token {
            token: Some("ESTsecretARY".into()),
            token_hash: "digest".into(),
            label: "issued".into(),
            user: 3,
            capabilities: Capabilities::UPLOAD_ONLY | Capabilities::SESSION,
            expiry: Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_plaintext_is_never_written() {
        let stored = TokenDoc::from(&issued());
        assert!(stored.token.is_none());

        let raw = bson::to_document(&stored).unwrap();
        assert!(!raw.contains_key("token"));
        assert_eq!(raw.get_str("token_hash").unwrap(), "digest");
        assert!(raw.get_bool("upload_only").unwrap());
        assert!(raw.get_bool("is_session").unwrap());
    }

    #[test]
    fn test_legacy_flags_without_bitset() {
        let raw = doc! {
            "token": "ESTlegacyARY",
            "user": 3_i64,
            "upload_only": true,
            "expiry": DateTime::now(),
        };
        let stored: TokenDoc = bson::from_document(raw).unwrap();
        let token = Token::from(stored);

        assert_eq!(token.token.as_deref(), Some("ESTlegacyARY"));
        assert!(token.token_hash.is_empty());
        assert!(token.is_upload_only());
        assert!(!token.capabilities.is_session());
    }

    #[test]
    fn test_digest_index_skips_legacy_rows() {
        let (keys, opts) = TokenDoc::into_indices()
            .into_iter()
            .find(|(keys, _)| keys.contains_key("token_hash"))
            .unwrap();
        assert_eq!(keys, doc! { "token_hash": 1 });

        let opts = opts.unwrap();
        assert_eq!(opts.unique, Some(true));
        assert_eq!(
            opts.partial_filter_expression,
            Some(doc! { "token_hash": { "$type": "string", "$gt": "" } })
        );

        // Legacy rows deserialize with an empty digest, which the filter excludes
        let legacy: TokenDoc = bson::from_document(doc! {
            "token": "ESTlegacyARY",
            "user": 3_i64,
            "expiry": DateTime::now(),
        })
        .unwrap();
        assert!(legacy.token_hash.is_empty());

        let plaintext = TokenDoc::into_indices()
            .into_iter()
            .find(|(keys, _)| keys.contains_key("token"))
            .and_then(|(_, opts)| opts)
            .unwrap();
        assert_eq!(plaintext.sparse, Some(true));
    }

    #[test]
    fn test_expiry_survives_storage() {
        let original = issued();
        let restored = Token::from(TokenDoc::from(&original));
        assert_eq!(restored.expiry, original.expiry);
        assert_eq!(restored.capabilities, original.capabilities);
        assert_eq!(restored.token, None);
    }
}
