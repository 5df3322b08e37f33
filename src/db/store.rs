//! `CredentialStore` backed by MongoDB

use bson::{doc, DateTime};
use tracing::{debug, info};

use crate::auth::{HashDialect, Principal, PrincipalId, Token};
use crate::db::mongo::{MongoClient, MongoCollection};
use crate::db::schemas::{PrincipalDoc, TokenDoc, PRINCIPAL_COLLECTION, TOKEN_COLLECTION};
use crate::store::CredentialStore;
use crate::types::{Result, TurnstileError};

#[derive(Clone)]
pub struct MongoCredentialStore {
    client: MongoClient,
    principals: MongoCollection<PrincipalDoc>,
    tokens: MongoCollection<TokenDoc>,
}

impl MongoCredentialStore {
    /// Open both collections, creating indexes as needed
    pub async fn open(client: MongoClient) -> Result<Self> {
        let principals = client.collection::<PrincipalDoc>(PRINCIPAL_COLLECTION).await?;
        let tokens = client.collection::<TokenDoc>(TOKEN_COLLECTION).await?;
        info!(
            "Credential store ready ({}.{}, {}.{})",
            client.db_name(),
            PRINCIPAL_COLLECTION,
            client.db_name(),
            TOKEN_COLLECTION
        );
        Ok(Self {
            client,
            principals,
            tokens,
        })
    }
}

#[async_trait::async_trait]
impl CredentialStore for MongoCredentialStore {
    async fn find_token(&self, plaintext: &str, digest: &str) -> Result<Option<Token>> {
        let filter = doc! {
            "$or": [
                { "token": plaintext },
                { "token_hash": digest },
            ]
        };
        Ok(self.tokens.find_one(filter).await?.map(Token::from))
    }

    async fn find_principal_by_id(&self, id: PrincipalId) -> Result<Option<Principal>> {
        Ok(self
            .principals
            .find_one(doc! { "id": id })
            .await?
            .map(Principal::from))
    }

    async fn find_principal_by_username(&self, username: &str) -> Result<Option<Principal>> {
        Ok(self
            .principals
            .find_one(doc! { "username": username })
            .await?
            .map(Principal::from))
    }

    async fn insert_token(&self, token: &Token) -> Result<()> {
        let id = self.tokens.insert_one(TokenDoc::from(token)).await?;
        debug!(principal = token.user, "stored token document {}", id);
        Ok(())
    }

    async fn update_password(
        &self,
        id: PrincipalId,
        salt: &str,
        pass_hash: &str,
        dialect: HashDialect,
    ) -> Result<()> {
        let update = doc! {
            "$set": {
                "salt": salt,
                "pass_hash": pass_hash,
                "hash_dialect": dialect.to_string(),
                "metadata.updated_at": DateTime::now(),
            }
        };
        let result = self.principals.update_one(doc! { "id": id }, update).await?;
        if result.matched_count == 0 {
            return Err(TurnstileError::InvalidInput(format!(
                "principal {} not found",
                id
            )));
        }
        Ok(())
    }

    async fn ping(&self) -> Result<()> {
        self.client.ping().await
    }
}
