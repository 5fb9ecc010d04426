use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::store::{document_id, Document, Store, StoreError};
use crate::filter::filter_order::FilterOrder;
use crate::filter::filter_where::FilterWhere;
use crate::filter::Query;
use crate::model::Id;

/// In-process store keeping each collection as an insertion-ordered list.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all collections
    pub async fn clear(&self) {
        self.collections.write().await.clear();
    }
}

fn has_id(document: &Document, id: Id) -> bool {
    document_id(document).map(|found| found == id).unwrap_or(false)
}

#[async_trait]
impl Store for MemoryStore {
    async fn find(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;
        let mut found: Vec<Document> = collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| FilterWhere::matches(d, &query.conditions))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(collections);

        FilterOrder::apply(&mut found, &query.sort);
        debug!(collection, matched = found.len(), "find");
        Ok(found)
    }

    async fn find_one(&self, collection: &str, id: Id) -> Result<Option<Document>, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| has_id(d, id)))
            .cloned())
    }

    async fn insert(&self, collection: &str, document: Document) -> Result<(), StoreError> {
        let id = document_id(&document)?;
        let mut collections = self.collections.write().await;
        let docs = collections.entry(collection.to_string()).or_default();
        if docs.iter().any(|d| has_id(d, id)) {
            return Err(StoreError::Duplicate {
                collection: collection.to_string(),
                id,
            });
        }
        docs.push(document);
        debug!(collection, %id, "insert");
        Ok(())
    }

    async fn replace(&self, collection: &str, id: Id, document: Document) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(slot) = collections
            .get_mut(collection)
            .and_then(|docs| docs.iter_mut().find(|d| has_id(d, id)))
        else {
            return Ok(false);
        };
        *slot = document;
        debug!(collection, %id, "replace");
        Ok(true)
    }

    async fn remove(&self, collection: &str, id: Id) -> Result<bool, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let before = docs.len();
        docs.retain(|d| !has_id(d, id));
        debug!(collection, %id, "remove");
        Ok(docs.len() != before)
    }

    async fn remove_all(&self, collection: &str, query: &Query) -> Result<usize, StoreError> {
        let mut collections = self.collections.write().await;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(0);
        };
        let before = docs.len();
        docs.retain(|d| !FilterWhere::matches(d, &query.conditions));
        let removed = before - docs.len();
        debug!(collection, removed, "remove_all");
        Ok(removed)
    }

    async fn count(&self, collection: &str, query: &Query) -> Result<usize, StoreError> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| docs.iter().filter(|d| FilterWhere::matches(d, &query.conditions)).count())
            .unwrap_or(0))
    }
}
