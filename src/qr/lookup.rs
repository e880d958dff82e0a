use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use serde_json::Value;

use crate::storage::{Document, DocumentStore, Query, StoreError};
use crate::types::{derived_key, field_string, value_string, QR_RESULT_COLLECTION};

/// Lookup parameters: either the derived `key` or all of its parts
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LookupForm {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QrResult {
    pub qr_url: String,
    pub request_id: String,
}

impl LookupForm {
    /// The derived string to look up, or `None` when neither a key nor all
    /// three parts were given
    pub fn key(&self) -> Option<String> {
        if let Some(key) = self.key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            return Some(key.to_string());
        }
        let store = self.store.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let price = self
            .price
            .as_ref()
            .map(value_string)
            .filter(|p| !p.trim().is_empty())?;
        let timestamp = self
            .timestamp
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())?;
        Some(derived_key(store, price.trim(), timestamp))
    }
}

/// Latest generated code for a derived string. The store filters on the
/// key alone and the newest `created_at` is picked here, so no composite
/// index is needed.
pub async fn find_latest(store: &dyn DocumentStore, key: &str) -> Result<Option<QrResult>, StoreError> {
    let hits = store
        .query(QR_RESULT_COLLECTION, &Query::eq("original_data", key))
        .await?;
    Ok(hits.iter().max_by_key(|doc| created_at(doc)).map(|doc| QrResult {
        qr_url: field_string(&doc.fields, "qr_url"),
        request_id: field_string(&doc.fields, "request_id"),
    }))
}

/// Sort key for a result record. Parsed RFC 3339 time first, raw text as a
/// tie-breaker; records without a readable time sort oldest.
fn created_at(doc: &Document) -> (Option<DateTime<FixedOffset>>, String) {
    let raw = field_string(&doc.fields, "created_at");
    (DateTime::parse_from_rfc3339(&raw).ok(), raw)
}
