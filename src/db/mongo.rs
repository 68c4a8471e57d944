//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, DateTime, Document};
use futures_util::TryStreamExt;
use mongodb::{
    options::{FindOptions, IndexOptions, ReturnDocument, UpdateModifications},
    results::{DeleteResult, UpdateResult},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::db::schemas::Metadata;
use crate::types::QandaError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Create a new MongoDB client and verify the connection
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, QandaError> {
        info!("Connecting to MongoDB at {}", uri);

        // Fail fast instead of hanging on an unreachable server
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| QandaError::Database(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| QandaError::Database(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection, applying its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, QandaError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }
}

/// Typed MongoDB collection with automatic indexing
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
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, QandaError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), QandaError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| QandaError::Database(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, setting metadata timestamps
    pub async fn insert_one(&self, mut item: T) -> Result<ObjectId, QandaError> {
        // Restored documents keep their original timestamps
        let now = DateTime::now();
        let metadata = item.mut_metadata();
        metadata.is_deleted = false;
        metadata.created_at.get_or_insert(now);
        metadata.updated_at.get_or_insert(now);

        let result = self
            .inner
            .insert_one(item)
            .await
            .map_err(|e| QandaError::Database(format!("Insert failed: {}", e)))?;

        result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| QandaError::Database("Failed to get inserted ID".into()))
    }

    /// Find one live (not soft-deleted) document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, QandaError> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        self.inner
            .find_one(full_filter)
            .await
            .map_err(|e| QandaError::Database(format!("Find failed: {}", e)))
    }

    /// Find live documents by filter with optional sort/skip/limit
    pub async fn find_many(
        &self,
        filter: Document,
        options: Option<FindOptions>,
    ) -> Result<Vec<T>, QandaError> {
        let mut full_filter = filter;
        full_filter.insert("metadata.is_deleted", doc! { "$ne": true });

        let cursor = self
            .inner
            .find(full_filter)
            .with_options(options)
            .await
            .map_err(|e| QandaError::Database(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| QandaError::Database(format!("Cursor read failed: {}", e)))
    }

    /// Update one document
    pub async fn update_one(
        &self,
        filter: Document,
        update: impl Into<UpdateModifications>,
    ) -> Result<UpdateResult, QandaError> {
        self.inner
            .update_one(filter, update.into())
            .await
            .map_err(|e| QandaError::Database(format!("Update failed: {}", e)))
    }

    /// Atomically update one document and return it as it is after the update
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        update: Document,
        upsert: bool,
    ) -> Result<Option<T>, QandaError> {
        self.inner
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .upsert(upsert)
            .await
            .map_err(|e| QandaError::Database(format!("Update failed: {}", e)))
    }

    /// Hard delete one document
    pub async fn delete_one(&self, filter: Document) -> Result<DeleteResult, QandaError> {
        self.inner
            .delete_one(filter)
            .await
            .map_err(|e| QandaError::Database(format!("Delete failed: {}", e)))
    }

    /// Run an aggregation pipeline, returning raw documents
    pub async fn aggregate(&self, pipeline: Vec<Document>) -> Result<Vec<Document>, QandaError> {
        let cursor = self
            .inner
            .aggregate(pipeline)
            .await
            .map_err(|e| QandaError::Database(format!("Aggregate failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| QandaError::Database(format!("Aggregate cursor failed: {}", e)))
    }
}
