//! Document storage.
//!
//! Everything the service persists goes through [`DocumentStore`]: the
//! Firestore REST backend in production, [`MemoryStore`] for local runs and
//! tests.

pub mod firestore;
pub mod memory;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

pub use self::firestore::FirestoreStore;
pub use self::memory::MemoryStore;

/// A stored document: its id within the collection plus its fields
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

/// Single-field equality query with an optional limit. Only single-field
/// filters are offered so Firestore never needs a composite index.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub field: String,
    pub value: Value,
    pub limit: Option<usize>,
}

impl Query {
    pub fn eq(field: &str, value: impl Into<Value>) -> Self {
        Self {
            field: field.to_string(),
            value: value.into(),
            limit: None,
        }
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("request to document store failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("document store returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("unexpected document format: {0}")]
    Decode(String),

    #[error("authentication failed: {0}")]
    Auth(#[from] crate::auth::AuthError),
}

/// Minimal document database surface used by the service
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document of a collection, in the store's enumeration order
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Fetch by primary key
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Create or replace the document with the given id
    async fn set(
        &self,
        collection: &str,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<(), StoreError>;

    /// Create a document with a store-generated id and return that id
    async fn add(&self, collection: &str, fields: Map<String, Value>) -> Result<String, StoreError>;
}
