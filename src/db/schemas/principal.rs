//! Principal document schema

use bson::{doc, oid::ObjectId, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::auth::{HashDialect, Principal, PrincipalId, Tier};
use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;

pub const PRINCIPAL_COLLECTION: &str = "principals";

/// Principal as stored in MongoDB. Created outside this service; only the
/// password fields are ever written back (on hash migration).
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct PrincipalDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub _id: Option<ObjectId>,

    #[serde(default)]
    pub metadata: Metadata,

    pub id: PrincipalId,

    pub uuid: String,

    /// Lowercase
    pub username: String,

    #[serde(default)]
    pub salt: String,

    #[serde(default)]
    pub pass_hash: String,

    /// Missing on documents written before dialects were recorded, which
    /// are read as argon2id. Salted SHA-256 accounts must be imported with
    /// `"hash_dialect": "sha256"` or they will never authenticate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hash_dialect: Option<HashDialect>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub did: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(rename = "perm", default)]
    pub tier: Tier,

    #[serde(default)]
    pub flags: i64,

    #[serde(default)]
    pub storage_disabled: bool,
}

impl PrincipalDoc {
    /// Recorded dialect, or the canonical one when none was stored
    pub fn dialect(&self) -> HashDialect {
        match self.hash_dialect {
            Some(dialect) => dialect,
            None => {
                if !self.salt.is_empty() {
                    warn!(
                        principal = self.id,
                        "salted account has no hash_dialect, assuming {}",
                        HashDialect::CANONICAL
                    );
                }
                HashDialect::CANONICAL
            }
        }
    }
}

impl From<PrincipalDoc> for Principal {
    fn from(doc: PrincipalDoc) -> Self {
        let hash_dialect = doc.dialect();
        Principal {
            id: doc.id,
            uuid: doc.uuid,
            username: doc.username.to_lowercase(),
            salt: doc.salt,
            pass_hash: doc.pass_hash,
            hash_dialect,
            did: doc.did,
            email: doc.email,
            tier: doc.tier,
            flags: doc.flags,
            storage_disabled: doc.storage_disabled,
            token: None,
        }
    }
}

impl From<&Principal> for PrincipalDoc {
    fn from(principal: &Principal) -> Self {
        PrincipalDoc {
            _id: None,
            metadata: Metadata::new(),
            id: principal.id,
            uuid: principal.uuid.clone(),
            username: principal.username.to_lowercase(),
            salt: principal.salt.clone(),
            pass_hash: principal.pass_hash.clone(),
            hash_dialect: Some(principal.hash_dialect),
            did: principal.did.clone(),
            email: principal.email.clone(),
            tier: principal.tier,
            flags: principal.flags,
            storage_disabled: principal.storage_disabled,
        }
    }
}

fn unique(name: &str) -> Option<IndexOptions> {
    Some(
        IndexOptions::builder()
            .unique(true)
            .name(name.to_string())
            .build(),
    )
}

impl IntoIndexes for PrincipalDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            (doc! { "id": 1 }, unique("id_unique")),
            (doc! { "username": 1 }, unique("username_unique")),
            (doc! { "uuid": 1 }, unique("uuid_unique")),
        ]
    }
}

impl MutMetadata for PrincipalDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
