use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{send_checked, QrError};
use crate::auth::TokenProvider;
use crate::config::QrConfig;

const GCS_BASE: &str = "https://storage.googleapis.com";

/// Bucket the worker uploads rendered codes to
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), QrError>;

    /// Grant anonymous read access to an uploaded object
    async fn make_public(&self, name: &str) -> Result<(), QrError>;

    fn public_url(&self, name: &str) -> String;
}

/// Cloud Storage JSON API
pub struct GcsStore {
    http: reqwest::Client,
    auth: Arc<TokenProvider>,
    base_url: String,
    config: QrConfig,
}

impl GcsStore {
    pub fn new(config: &QrConfig, auth: Arc<TokenProvider>) -> Self {
        Self::with_base_url(config, auth, GCS_BASE)
    }

    pub fn with_base_url(config: &QrConfig, auth: Arc<TokenProvider>, base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
            base_url: base_url.trim_end_matches('/').to_string(),
            config: config.clone(),
        }
    }

    fn upload_url(&self, name: &str) -> String {
        format!(
            "{}/upload/storage/v1/b/{}/o?uploadType=media&name={}",
            self.base_url,
            self.config.bucket,
            urlencoding::encode(name)
        )
    }

    fn acl_url(&self, name: &str) -> String {
        format!(
            "{}/storage/v1/b/{}/o/{}/acl",
            self.base_url,
            self.config.bucket,
            urlencoding::encode(name)
        )
    }
}

#[async_trait]
impl ObjectStore for GcsStore {
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), QrError> {
        let request = self
            .http
            .post(self.upload_url(name))
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes);
        send_checked("Cloud Storage", &self.auth, request).await?;
        tracing::info!("Uploaded gs://{}/{}", self.config.bucket, name);
        Ok(())
    }

    async fn make_public(&self, name: &str) -> Result<(), QrError> {
        let request = self
            .http
            .post(self.acl_url(name))
            .json(&serde_json::json!({"entity": "allUsers", "role": "READER"}));
        send_checked("Cloud Storage", &self.auth, request).await?;
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        self.config.public_url(name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub public: bool,
}

/// In-process bucket for local runs and tests
pub struct MemoryObjectStore {
    config: QrConfig,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new(config: &QrConfig) -> Self {
        Self {
            config: config.clone(),
            objects: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub async fn object(&self, name: &str) -> Option<StoredObject> {
        self.objects.read().await.get(name).cloned()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(&self, name: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), QrError> {
        self.objects.write().await.insert(
            name.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
                public: false,
            },
        );
        Ok(())
    }

    async fn make_public(&self, name: &str) -> Result<(), QrError> {
        let mut objects = self.objects.write().await;
        let Some(object) = objects.get_mut(name) else {
            return Err(QrError::Status {
                service: "memory storage",
                status: 404,
                body: format!("no object named {name}"),
            });
        };
        if !object.public {
            object.public = true;
            tracing::debug!(
                "Published {} ({} bytes, {})",
                name,
                object.bytes.len(),
                object.content_type
            );
        }
        Ok(())
    }

    fn public_url(&self, name: &str) -> String {
        self.config.public_url(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gcs_urls() {
        let store = GcsStore::new(&QrConfig::default(), Arc::new(TokenProvider::fixed("t")));
        assert_eq!(
            store.upload_url("qr_20250101_120000_abc.png"),
            "https://storage.googleapis.com/upload/storage/v1/b/us-check-bucket/o?uploadType=media&name=qr_20250101_120000_abc.png"
        );
        assert_eq!(
            store.acl_url("a/b.png"),
            "https://storage.googleapis.com/storage/v1/b/us-check-bucket/o/a%2Fb.png/acl"
        );
        assert_eq!(
            store.public_url("x.png"),
            "https://storage.googleapis.com/us-check-bucket/x.png"
        );
    }

    #[tokio::test]
    async fn test_memory_store_upload_and_publish() {
        let store = MemoryObjectStore::new(&QrConfig::default());
        store.upload("x.png", vec![1, 2, 3], "image/png").await.unwrap();
        assert!(!store.object("x.png").await.unwrap().public);

        store.make_public("x.png").await.unwrap();
        let object = store.object("x.png").await.unwrap();
        assert!(object.public);
        assert_eq!(object.content_type, "image/png");
        assert_eq!(object.bytes, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_memory_store_publish_missing_object() {
        let store = MemoryObjectStore::new(&QrConfig::default());
        let result = store.make_public("missing.png").await;
        assert!(matches!(result, Err(QrError::Status { status: 404, .. })));
    }

    #[tokio::test]
    async fn test_gcs_connection_refused() {
        let store = GcsStore::with_base_url(
            &QrConfig::default(),
            Arc::new(TokenProvider::fixed("t")),
            "http://127.0.0.1:19997",
        );
        let result = store.upload("x.png", vec![0], "image/png").await;
        assert!(matches!(result, Err(QrError::Transport { .. })));
    }
}
