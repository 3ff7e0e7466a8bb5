//! An in-process document store implementing the same seam as MongoDB.
//!
//! Backs the test suites, and serves the API without a server when the
//! configured URI is `memory://`. Filters are evaluated as top-level field
//! equality; numbers compare by value across BSON integer and double widths. Query operators (`$gt`, `$or`, ...) are
//! not supported and are reported as store errors.

use crate::error::StoreError;
use crate::store::{CollectionProvider, ConnectionCapability, DocumentCollection};
use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

type Namespace = (String, String);

#[derive(Debug, Clone, Default)]
pub struct InMemoryConnection {
    collections: Arc<Mutex<HashMap<Namespace, Vec<Document>>>>,
}

impl InMemoryConnection {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ConnectionCapability for InMemoryConnection {
    fn database(&self, name: &str) -> Box<dyn CollectionProvider> {
        Box::new(InMemoryDatabase {
            name: name.to_string(),
            collections: self.collections.clone(),
        })
    }
}

struct InMemoryDatabase {
    name: String,
    collections: Arc<Mutex<HashMap<Namespace, Vec<Document>>>>,
}

impl CollectionProvider for InMemoryDatabase {
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection> {
        Arc::new(InMemoryCollection {
            namespace: (self.name.clone(), name.to_string()),
            collections: self.collections.clone(),
        })
    }
}

pub struct InMemoryCollection {
    namespace: Namespace,
    collections: Arc<Mutex<HashMap<Namespace, Vec<Document>>>>,
}

#[async_trait]
impl DocumentCollection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.namespace.1
    }

    fn database_name(&self) -> &str {
        &self.namespace.0
    }

    async fn find_all(&self, filter: Document) -> Result<Vec<Document>, StoreError> {
        check_filter(&filter)?;
        let collections = self.collections.lock().await;
        let found: Vec<Document> = collections
            .get(&self.namespace)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| matches_filter(document, &filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(found)
    }

    async fn insert_one(&self, mut document: Document) -> Result<Bson, StoreError> {
        let id = match document.get("_id") {
            Some(id) => id.clone(),
            None => {
                let id = Bson::ObjectId(ObjectId::new());
                document.insert("_id", id.clone());
                id
            }
        };

        let mut collections = self.collections.lock().await;
        let documents = collections.entry(self.namespace.clone()).or_default();
        if documents.iter().any(|existing| existing.get("_id") == Some(&id)) {
            return Err(StoreError::Backend(format!("duplicate key: _id {id}")));
        }
        documents.push(document);
        Ok(id)
    }

    async fn delete_one(&self, filter: Document) -> Result<u64, StoreError> {
        check_filter(&filter)?;
        let mut collections = self.collections.lock().await;
        let Some(documents) = collections.get_mut(&self.namespace) else {
            return Ok(0);
        };
        match documents.iter().position(|document| matches_filter(document, &filter)) {
            Some(index) => {
                documents.remove(index);
                Ok(1)
            }
            None => Ok(0),
        }
    }
}

fn check_filter(filter: &Document) -> Result<(), StoreError> {
    match filter.keys().find(|key| key.starts_with('$')) {
        Some(operator) => Err(StoreError::Backend(format!(
            "unsupported query operator: {operator}"
        ))),
        None => Ok(()),
    }
}

fn matches_filter(document: &Document, filter: &Document) -> bool {
    filter.iter().all(|(field, expected)| {
        document
            .get(field)
            .is_some_and(|actual| values_equal(actual, expected))
    })
}

fn values_equal(left: &Bson, right: &Bson) -> bool {
    match (left, right) {
        (Bson::Double(l), Bson::Double(r)) => l == r,
        (Bson::Double(d), other) | (other, Bson::Double(d)) => {
            as_integer(other).is_some_and(|n| integer_equals_double(n, *d))
        }
        _ => match (as_integer(left), as_integer(right)) {
            (Some(l), Some(r)) => l == r,
            _ => left == right,
        },
    }
}

fn as_integer(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(n) => Some(i64::from(*n)),
        Bson::Int64(n) => Some(*n),
        _ => None,
    }
}

// `i64::MAX as f64` is 2^63, one past the largest `i64`.
fn integer_equals_double(n: i64, d: f64) -> bool {
    d.fract() == 0.0 && d >= i64::MIN as f64 && d < i64::MAX as f64 && d as i64 == n
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    fn spells() -> Arc<dyn DocumentCollection> {
        InMemoryConnection::new().database("spellapi").collection("spells")
    }

    #[tokio::test]
    async fn numbers_match_across_widths() {
        let collection = spells();
        collection
            .insert_one(doc! { "name": "Shield", "level": 1_i64 })
            .await
            .unwrap();

        let found = collection.find_all(doc! { "level": 1_i32 }).await.unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn large_integers_compare_exactly() {
        let collection = spells();
        collection
            .insert_one(doc! { "serial": 9_007_199_254_740_992_i64 })
            .await
            .unwrap();

        let neighbour = doc! { "serial": 9_007_199_254_740_993_i64 };
        assert!(collection.find_all(neighbour.clone()).await.unwrap().is_empty());
        assert_eq!(collection.delete_one(neighbour).await.unwrap(), 0);

        let found = collection
            .find_all(doc! { "serial": 9_007_199_254_740_992_i64 })
            .await
            .unwrap();
        assert_eq!(found.len(), 1);
    }

    #[tokio::test]
    async fn doubles_match_only_whole_integers() {
        let collection = spells();
        collection
            .insert_one(doc! { "name": "Haste", "level": 3_i32 })
            .await
            .unwrap();

        assert_eq!(collection.find_all(doc! { "level": 3.0 }).await.unwrap().len(), 1);
        assert!(collection.find_all(doc! { "level": 3.5 }).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn insert_keeps_a_caller_supplied_id() {
        let collection = spells();
        let id = collection
            .insert_one(doc! { "_id": "mm", "name": "Magic Missile" })
            .await
            .unwrap();
        assert_eq!(id, Bson::String("mm".into()));

        let duplicate = collection.insert_one(doc! { "_id": "mm" }).await;
        assert!(matches!(duplicate, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn delete_removes_only_the_first_match() {
        let collection = spells();
        for level in [1, 2] {
            collection
                .insert_one(doc! { "school": "evocation", "level": level })
                .await
                .unwrap();
        }

        let deleted = collection
            .delete_one(doc! { "school": "evocation" })
            .await
            .unwrap();
        assert_eq!(deleted, 1);

        let remaining = collection.find_all(doc! {}).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].get_i32("level").unwrap(), 2);
    }

    #[tokio::test]
    async fn operators_are_rejected() {
        let result = spells().find_all(doc! { "$or": [] }).await;
        assert!(matches!(result, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn collections_are_isolated_by_namespace() {
        let connection = InMemoryConnection::new();
        connection
            .database("spellapi")
            .collection("spells")
            .insert_one(doc! { "name": "Light" })
            .await
            .unwrap();

        let other = connection.database("other").collection("spells");
        assert!(other.find_all(doc! {}).await.unwrap().is_empty());
    }
}
