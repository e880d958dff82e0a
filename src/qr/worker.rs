use std::sync::Arc;

use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::object_store::ObjectStore;
use super::render::render_png;
use super::QrError;
use crate::storage::DocumentStore;
use crate::types::{derived_key, qr_timestamp, value_string, QrMessage, QR_RESULT_COLLECTION};

/// Why a push delivery was dropped without processing
#[derive(Error, Debug)]
pub enum EnvelopeError {
    #[error("envelope is not valid JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("envelope carries no message data")]
    MissingData,

    #[error("message data is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("message data is not UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("message payload is empty")]
    Empty,
}

#[derive(Debug, Deserialize)]
struct PushEnvelope {
    message: Option<PushMessage>,
    #[serde(default)]
    subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PushMessage {
    data: Option<String>,
    #[serde(default, alias = "message_id")]
    message_id: Option<String>,
}

/// Message fields as published. Anything missing is filled in by
/// [`parse_payload`].
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct IncomingMessage {
    store: Option<Value>,
    price: Option<Value>,
    timestamp: Option<String>,
    request_id: Option<String>,
    original_data: Option<String>,
}

/// Decode a Pub/Sub push body into the message it carries
pub fn decode_push(body: &[u8]) -> Result<QrMessage, EnvelopeError> {
    let envelope: PushEnvelope = serde_json::from_slice(body)?;
    let message = envelope.message.ok_or(EnvelopeError::MissingData)?;
    let data = message.data.ok_or(EnvelopeError::MissingData)?;

    let raw = base64::engine::general_purpose::STANDARD.decode(data.trim())?;
    let text = String::from_utf8(raw)?;

    tracing::debug!(
        "Push message {} from {}",
        message.message_id.as_deref().unwrap_or("-"),
        envelope.subscription.as_deref().unwrap_or("-")
    );
    parse_payload(&text)
}

/// Interpret a message payload. JSON objects are read field by field; any
/// other text is taken as a bare derived string.
pub fn parse_payload(text: &str) -> Result<QrMessage, EnvelopeError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(EnvelopeError::Empty);
    }

    let incoming = match serde_json::from_str::<Value>(text) {
        Ok(value @ Value::Object(_)) => {
            serde_json::from_value::<IncomingMessage>(value).unwrap_or_default()
        }
        _ => IncomingMessage {
            original_data: Some(text.to_string()),
            ..Default::default()
        },
    };

    let store = incoming.store.as_ref().map(value_string).unwrap_or_default();
    let price = incoming.price.as_ref().map(value_string).unwrap_or_default();
    let timestamp = non_empty(incoming.timestamp).unwrap_or_else(|| qr_timestamp(Utc::now()));
    let original_data = match non_empty(incoming.original_data) {
        Some(data) => data,
        None if !store.is_empty() => derived_key(&store, &price, &timestamp),
        None => return Err(EnvelopeError::Empty),
    };

    Ok(QrMessage {
        store,
        price,
        timestamp,
        request_id: non_empty(incoming.request_id)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string()),
        original_data,
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Object name for a rendered code
pub fn object_name(message: &QrMessage) -> String {
    format!("qr_{}_{}.png", message.timestamp, message.request_id)
}

/// Renders codes, uploads them and records where they ended up
pub struct QrWorker {
    store: Arc<dyn DocumentStore>,
    objects: Arc<dyn ObjectStore>,
}

impl QrWorker {
    pub fn new(store: Arc<dyn DocumentStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { store, objects }
    }

    /// Render, upload and record one message. Returns the public URL.
    pub async fn process(&self, message: &QrMessage) -> Result<String, QrError> {
        let png = render_png(&message.original_data)?;
        let name = object_name(message);

        self.objects.upload(&name, png, "image/png").await?;
        self.objects.make_public(&name).await?;
        let url = self.objects.public_url(&name);

        let mut fields = Map::new();
        fields.insert("qr_url".into(), Value::from(url.as_str()));
        fields.insert("original_data".into(), Value::from(message.original_data.as_str()));
        fields.insert("request_id".into(), Value::from(message.request_id.as_str()));
        fields.insert("store".into(), Value::from(message.store.as_str()));
        fields.insert("created_at".into(), Value::from(Utc::now().to_rfc3339()));
        self.store.add(QR_RESULT_COLLECTION, fields).await?;

        tracing::info!("QR for request {} stored at {}", message.request_id, url);
        Ok(url)
    }

    /// Render a code for a bare store name, bypassing the queue
    pub async fn generate_direct(&self, store: &str) -> Result<String, QrError> {
        let message = QrMessage {
            store: store.to_string(),
            price: String::new(),
            timestamp: qr_timestamp(Utc::now()),
            request_id: uuid::Uuid::new_v4().to_string(),
            original_data: store.to_string(),
        };
        self.process(&message).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::QrConfig;
    use crate::qr::MemoryObjectStore;
    use crate::storage::{MemoryStore, Query};
    use serde_json::json;

    fn encode(text: &str) -> String {
        base64::engine::general_purpose::STANDARD.encode(text)
    }

    fn envelope(data: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "message": {"data": encode(data), "messageId": "42"},
            "subscription": "projects/demo/subscriptions/qr-push"
        }))
        .unwrap()
    }

    #[test]
    fn test_decode_json_message() {
        let payload = r#"{"store": "의성마늘가게", "price": "15000", "timestamp": "20250101_120000", "request_id": "r1", "original_data": "의성마늘가게|15000|20250101_120000"}"#;
        let message = decode_push(&envelope(payload)).unwrap();
        assert_eq!(message.store, "의성마늘가게");
        assert_eq!(message.request_id, "r1");
        assert_eq!(message.original_data, "의성마늘가게|15000|20250101_120000");
    }

    #[test]
    fn test_decode_fills_missing_fields() {
        let message = decode_push(&envelope(r#"{"store": "가게", "price": 5000, "timestamp": "20250101_000000"}"#)).unwrap();
        assert_eq!(message.price, "5000");
        assert_eq!(message.original_data, "가게|5000|20250101_000000");
        assert!(!message.request_id.is_empty());
    }

    #[test]
    fn test_decode_raw_text_is_derived_string() {
        let message = decode_push(&envelope("가게|1000|20250101_000000")).unwrap();
        assert_eq!(message.original_data, "가게|1000|20250101_000000");
        assert_eq!(message.store, "");
        assert_eq!(message.timestamp.len(), 15);
    }

    #[test]
    fn test_decode_rejects_malformed_envelopes() {
        assert!(matches!(decode_push(b"not json"), Err(EnvelopeError::Malformed(_))));
        assert!(matches!(decode_push(b"{}"), Err(EnvelopeError::MissingData)));
        assert!(matches!(
            decode_push(br#"{"message": {"data": "%%%"}}"#),
            Err(EnvelopeError::Base64(_))
        ));
        assert!(matches!(decode_push(&envelope("  ")), Err(EnvelopeError::Empty)));
    }

    #[test]
    fn test_object_name() {
        let message = parse_payload(r#"{"store": "s", "timestamp": "20250101_120000", "request_id": "abc"}"#).unwrap();
        assert_eq!(object_name(&message), "qr_20250101_120000_abc.png");
    }

    #[tokio::test]
    async fn test_process_uploads_and_records() {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryObjectStore::new(&QrConfig::default()));
        let worker = QrWorker::new(store.clone(), objects.clone());

        let message = parse_payload(
            r#"{"store": "가게", "price": "1000", "timestamp": "20250101_120000", "request_id": "r9"}"#,
        )
        .unwrap();
        let url = worker.process(&message).await.unwrap();
        assert_eq!(
            url,
            "https://storage.googleapis.com/us-check-bucket/qr_20250101_120000_r9.png"
        );

        let object = objects.object("qr_20250101_120000_r9.png").await.unwrap();
        assert!(object.public);
        assert_eq!(object.content_type, "image/png");
        assert!(object.bytes.starts_with(b"\x89PNG"));

        let results = store
            .query(QR_RESULT_COLLECTION, &Query::eq("original_data", "가게|1000|20250101_120000"))
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].fields["qr_url"], url.as_str());
        assert_eq!(results[0].fields["request_id"], "r9");
    }

    #[tokio::test]
    async fn test_generate_direct() {
        let store = Arc::new(MemoryStore::new());
        let objects = Arc::new(MemoryObjectStore::new(&QrConfig::default()));
        let worker = QrWorker::new(store.clone(), objects);

        let url = worker.generate_direct("의성마늘가게").await.unwrap();
        assert!(url.ends_with(".png"));
        assert_eq!(store.count(QR_RESULT_COLLECTION).await, 1);
    }
}
