use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::filter::Query;
use crate::model::Id;

/// A stored document: `_id` plus one entry per stored field, keyed by
/// storage name.
pub type Document = Map<String, Value>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("Duplicate id {id} in collection {collection}")]
    Duplicate { collection: String, id: Id },

    #[error("Document codec error: {0}")]
    Codec(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// A document store with one collection per model. Every call is a single
/// atomic operation on the collection.
#[async_trait]
pub trait Store: Send + Sync {
    /// Matching documents, sorted by the query's keys; ties keep insertion
    /// order.
    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    async fn find_one(&self, collection: &str, id: Id) -> Result<Option<Document>, StoreError>;

    /// Fails with `StoreError::Duplicate` when the id is taken.
    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError>;

    /// Replace the whole document with this id. Returns false when absent.
    async fn replace(&self, collection: &str, id: Id, document: Document) -> Result<bool, StoreError>;

    /// Returns false when absent.
    async fn remove(&self, collection: &str, id: Id) -> Result<bool, StoreError>;

    /// Remove every matching document and return how many went.
    async fn remove_all(&self, collection: &str, query: &Query) -> Result<usize, StoreError>;

    async fn count(&self, collection: &str, query: &Query) -> Result<usize, StoreError> {
        Ok(self.find(collection, query).await?.len())
    }
}

pub(crate) fn document_id(document: &Document) -> Result<Id, StoreError> {
    let raw = document
        .get("_id")
        .and_then(Value::as_str)
        .ok_or_else(|| StoreError::Codec("document has no _id".to_string()))?;
    Id::parse(raw).map_err(|e| StoreError::Codec(e.to_string()))
}
