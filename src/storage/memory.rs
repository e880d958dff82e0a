use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{Document, DocumentStore, Query, StoreError};

/// In-process document store. Collections keep insertion order so listing
/// behaves like a stable enumeration.
#[derive(Default)]
pub struct MemoryStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    #[cfg(test)]
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| d.id == id).cloned()))
    }

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError> {
        let guard = self.collections.read().await;
        let mut hits: Vec<Document> = guard
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|d| d.fields.get(&query.field) == Some(&query.value))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        if let Some(limit) = query.limit {
            hits.truncate(limit);
        }
        Ok(hits)
    }

    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError> {
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.to_string()).or_default();
        match docs.iter_mut().find(|d| d.id == id) {
            Some(existing) => existing.fields = fields,
            None => docs.push(Document {
                id: id.to_string(),
                fields,
            }),
        }
        Ok(())
    }

    async fn add(&self, collection: &str, fields: Map<String, Value>) -> Result<String, StoreError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        self.set(collection, &id, fields).await?;
        Ok(id)
    }
}
