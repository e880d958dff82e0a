use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use super::publisher::Publisher;
use super::QrError;
use crate::storage::{DocumentStore, StoreError};
use crate::types::{derived_key, qr_timestamp, value_string, QrMessage, QR_REQUEST_COLLECTION};

/// Longest store name accepted, in bytes. Keeps the derived key well inside
/// QR code capacity.
pub const MAX_STORE_BYTES: usize = 500;

#[derive(Error, Debug)]
pub enum QrRequestError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("store must be at most {MAX_STORE_BYTES} bytes")]
    TooLong,

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Publish(#[from] QrError),
}

/// QR generation request as submitted. `price` may be a number or a string.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct QrRequestForm {
    #[serde(default)]
    pub store: Option<String>,
    #[serde(default)]
    pub price: Option<Value>,
    #[serde(default)]
    pub address: Option<String>,
}

/// What the caller gets back after a request is queued
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QrReceipt {
    pub request_id: String,
    pub timestamp: String,
    pub key: String,
    pub message_id: String,
}

/// Record the request, then publish it for the worker
pub async fn submit(
    store: &dyn DocumentStore,
    publisher: &dyn Publisher,
    form: &QrRequestForm,
) -> Result<QrReceipt, QrRequestError> {
    let shop = form
        .store
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(QrRequestError::Missing("store"))?;
    if shop.len() > MAX_STORE_BYTES {
        return Err(QrRequestError::TooLong);
    }
    let price = form
        .price
        .as_ref()
        .filter(|v| v.is_string() || v.is_number())
        .map(|v| value_string(v).trim().to_string())
        .filter(|p| !p.is_empty())
        .ok_or(QrRequestError::Missing("price"))?;

    let request_id = uuid::Uuid::new_v4().to_string();
    let timestamp = qr_timestamp(Utc::now());
    let key = derived_key(shop, &price, &timestamp);

    let mut fields = Map::new();
    fields.insert("store".into(), Value::from(shop));
    fields.insert("price".into(), Value::from(price.as_str()));
    fields.insert(
        "address".into(),
        Value::from(form.address.as_deref().map(str::trim).unwrap_or_default()),
    );
    fields.insert("request_id".into(), Value::from(request_id.as_str()));
    fields.insert("timestamp".into(), Value::from(timestamp.as_str()));
    fields.insert("original_data".into(), Value::from(key.as_str()));
    store.set(QR_REQUEST_COLLECTION, &request_id, fields).await?;

    let message = QrMessage {
        store: shop.to_string(),
        price,
        timestamp: timestamp.clone(),
        request_id: request_id.clone(),
        original_data: key.clone(),
    };
    let message_id = publisher.publish(&message).await?;

    tracing::info!("Queued QR request {} for {}", request_id, shop);
    Ok(QrReceipt {
        request_id,
        timestamp,
        key,
        message_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingPublisher {
        sent: Mutex<Vec<QrMessage>>,
    }

    #[async_trait]
    impl Publisher for RecordingPublisher {
        async fn publish(&self, message: &QrMessage) -> Result<String, QrError> {
            self.sent.lock().unwrap().push(message.clone());
            Ok("m-1".into())
        }
    }

    fn form(value: Value) -> QrRequestForm {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn test_submit_records_and_publishes() {
        let store = MemoryStore::new();
        let publisher = RecordingPublisher::default();
        let receipt = submit(
            &store,
            &publisher,
            &form(json!({"store": "의성마늘가게", "price": 15000, "address": "의성읍"})),
        )
        .await
        .unwrap();

        assert_eq!(receipt.message_id, "m-1");
        assert_eq!(receipt.key, format!("의성마늘가게|15000|{}", receipt.timestamp));

        let doc = store
            .get(QR_REQUEST_COLLECTION, &receipt.request_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc.fields["price"], "15000");
        assert_eq!(doc.fields["address"], "의성읍");

        let sent = publisher.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].original_data, receipt.key);
    }

    #[tokio::test]
    async fn test_submit_requires_store_and_price() {
        let store = MemoryStore::new();
        let publisher = RecordingPublisher::default();

        let err = submit(&store, &publisher, &form(json!({"price": "1000"}))).await.unwrap_err();
        assert!(matches!(err, QrRequestError::Missing("store")));

        let err = submit(&store, &publisher, &form(json!({"store": "가게", "price": ""})))
            .await
            .unwrap_err();
        assert!(matches!(err, QrRequestError::Missing("price")));

        assert_eq!(store.count(QR_REQUEST_COLLECTION).await, 0);
        assert!(publisher.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_rejects_oversized_store() {
        let store = MemoryStore::new();
        let publisher = RecordingPublisher::default();

        let err = submit(
            &store,
            &publisher,
            &form(json!({"store": "가".repeat(1200), "price": "1000"})),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, QrRequestError::TooLong));
        assert_eq!(store.count(QR_REQUEST_COLLECTION).await, 0);
        assert!(publisher.sent.lock().unwrap().is_empty());
    }
}
