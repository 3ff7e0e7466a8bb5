use crate::error::StoreError;
use async_trait::async_trait;
use bson::{Bson, Document};
use futures::TryStreamExt;
use std::sync::Arc;

/// A named collection inside a named database.
///
/// This is the only store surface the instrumented primitives touch, which
/// keeps them independent of the driver and lets tests substitute doubles.
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    fn name(&self) -> &str;

    fn database_name(&self) -> &str;

    /// Runs `filter` and returns the complete matching set.
    async fn find_all(&self, filter: Document) -> Result<Vec<Document>, StoreError>;

    /// Inserts exactly one document and returns the store-generated `_id`.
    async fn insert_one(&self, document: Document) -> Result<Bson, StoreError>;

    /// Deletes at most one matching document and returns how many were removed.
    async fn delete_one(&self, filter: Document) -> Result<u64, StoreError>;
}

/// Hands out collections belonging to one database.
pub trait CollectionProvider: Send + Sync {
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection>;
}

/// The narrow view of a live store connection that the facade depends on.
pub trait ConnectionCapability: Send + Sync {
    fn database(&self, name: &str) -> Box<dyn CollectionProvider>;
}

/// A database handle from the MongoDB driver.
pub(crate) struct MongoDatabase {
    inner: mongodb::Database,
}

impl MongoDatabase {
    pub(crate) fn new(inner: mongodb::Database) -> Self {
        Self { inner }
    }
}

impl CollectionProvider for MongoDatabase {
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        Arc::new(MongoCollection {
            inner: self.inner.collection::<Document>(name),
            database: self.inner.name().to_string(),
        })
    }
}

/// A collection handle from the MongoDB driver.
pub(crate) struct MongoCollection {
    inner: mongodb::Collection<Document>,
    // The driver only hands out the namespace by value, so keep our own copy.
    database: String,
}

#[async_trait]
impl DocumentCollection for MongoCollection {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn database_name(&self) -> &str {
        &self.database
    }

    async fn find_all(&self, filter: Document) -> Result<Vec<Document>, StoreError> {
        let cursor = self.inner.find(filter, None).await?;
        let documents = cursor.try_collect::<Vec<Document>>().await?;
        Ok(documents)
    }

    async fn insert_one(&self, document: Document) -> Result<Bson, StoreError> {
        let result = self.inner.insert_one(document, None).await?;
        Ok(result.inserted_id)
    }

    async fn delete_one(&self, filter: Document) -> Result<u64, StoreError> {
        let result = self.inner.delete_one(filter, None).await?;
        Ok(result.deleted_count)
    }
}
