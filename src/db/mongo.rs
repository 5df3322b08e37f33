//! MongoDB client and typed collection wrapper
//!
//! Every collection applies its schema's indexes on open, and every read
//! skips soft-deleted documents.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::{
    options::{IndexOptions, UpdateModifications},
    results::UpdateResult,
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use std::time::Duration;
use tracing::info;

use crate::db::schemas::Metadata;
use crate::types::{Result, TurnstileError};

/// Schemas that declare their own indexes
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Schemas carrying a [`Metadata`] block
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and ping. Server selection and connect are bounded by
    /// `timeout` so an unreachable server fails fast.
    pub async fn new(uri: &str, db_name: &str, timeout: Duration) -> Result<Self> {
        info!("Connecting to MongoDB database '{}'", db_name);

        let ms = timeout.as_millis();
        let separator = if uri.contains('?') { '&' } else { '?' };
        let bounded_uri = format!(
            "{uri}{separator}serverSelectionTimeoutMS={ms}&connectTimeoutMS={ms}"
        );

        let client = Client::with_uri_str(&bounded_uri).await.map_err(|e| {
            TurnstileError::StoreUnavailable(format!("Failed to connect to MongoDB: {}", e))
        })?;

        let mongo = Self {
            client,
            db_name: db_name.to_string(),
        };
        mongo.ping().await?;

        info!("Connected to MongoDB database '{}'", db_name);
        Ok(mongo)
    }

    pub async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| TurnstileError::StoreUnavailable(format!("MongoDB ping failed: {}", e)))?;
        Ok(())
    }

    /// Open a typed collection, creating its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    pub async fn new(client: &Client, db_name: &str, collection_name: &str) -> Result<Self> {
        let collection = MongoCollection {
            inner: client.database(db_name).collection::<T>(collection_name),
        };
        collection.apply_indexes().await?;
        Ok(collection)
    }

    async fn apply_indexes(&self) -> Result<()> {
        let indices: Vec<IndexModel> = T::into_indices()
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        if indices.is_empty() {
            return Ok(());
        }

        self.inner.create_indexes(indices).await.map_err(|e| {
            TurnstileError::StoreUnavailable(format!("Failed to create indexes: {}", e))
        })?;
        Ok(())
    }

    /// Insert one document with fresh timestamps. Single-document inserts
    /// are atomic.
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId> {
        let metadata = item.mut_metadata();
        let now = DateTime::now();
        metadata.is_deleted = false;
        metadata.created_at = Some(now);
        metadata.updated_at = Some(now);

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| TurnstileError::StoreUnavailable(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| TurnstileError::Internal("Failed to get inserted ID".into()))
    }

    /// Find one live (not soft-deleted) document
    pub async fn find_one(&self, mut filter: Document) -> Result<Option<T>> {
        filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .find_one(filter)
            .await
            .map_err(|e| TurnstileError::StoreUnavailable(format!("Find failed: {}", e)))
    }

    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| TurnstileError::StoreUnavailable(format!("Update failed: {}", e)))
    }
}
