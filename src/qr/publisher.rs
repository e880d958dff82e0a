use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;

use super::worker::QrWorker;
use super::{send_checked, QrError};
use crate::auth::TokenProvider;
use crate::types::QrMessage;

const PUBSUB_BASE: &str = "https://pubsub.googleapis.com/v1";

/// Hands QR messages to whoever renders them
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Publish a message and return its id
    async fn publish(&self, message: &QrMessage) -> Result<String, QrError>;
}

/// Pub/Sub topic publisher over REST
pub struct PubSubPublisher {
    http: reqwest::Client,
    auth: Arc<TokenProvider>,
    topic_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublishResponse {
    #[serde(default)]
    message_ids: Vec<String>,
}

impl PubSubPublisher {
    pub fn new(project_id: &str, topic: &str, auth: Arc<TokenProvider>) -> Self {
        let base = match std::env::var("PUBSUB_EMULATOR_HOST") {
            Ok(host) if !host.is_empty() => format!("http://{}/v1", host.trim_end_matches('/')),
            _ => PUBSUB_BASE.to_string(),
        };
        Self::with_base_url(&base, project_id, topic, auth)
    }

    pub fn with_base_url(base: &str, project_id: &str, topic: &str, auth: Arc<TokenProvider>) -> Self {
        Self {
            http: reqwest::Client::new(),
            auth,
            topic_url: format!(
                "{}/projects/{}/topics/{}",
                base.trim_end_matches('/'),
                project_id,
                topic
            ),
        }
    }
}

/// Request body for `topics/{topic}:publish`
pub fn publish_body(message: &QrMessage) -> Result<serde_json::Value, QrError> {
    let data = base64::engine::general_purpose::STANDARD.encode(serde_json::to_vec(message)?);
    Ok(serde_json::json!({"messages": [{"data": data}]}))
}

#[async_trait]
impl Publisher for PubSubPublisher {
    async fn publish(&self, message: &QrMessage) -> Result<String, QrError> {
        let request = self
            .http
            .post(format!("{}:publish", self.topic_url))
            .json(&publish_body(message)?);
        let resp: PublishResponse = send_checked("Pub/Sub", &self.auth, request)
            .await?
            .json()
            .await
            .map_err(|source| QrError::Transport {
                service: "Pub/Sub",
                source,
            })?;

        let id = resp.message_ids.into_iter().next().unwrap_or_default();
        tracing::info!("Published QR request {} as message {}", message.request_id, id);
        Ok(id)
    }
}

/// Publisher for local runs: messages go straight to an in-process worker
pub struct LocalPublisher {
    worker: Arc<QrWorker>,
}

impl LocalPublisher {
    pub fn new(worker: Arc<QrWorker>) -> Self {
        Self { worker }
    }
}

#[async_trait]
impl Publisher for LocalPublisher {
    async fn publish(&self, message: &QrMessage) -> Result<String, QrError> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let worker = Arc::clone(&self.worker);
        let message = message.clone();
        tokio::spawn(async move {
            if let Err(e) = worker.process(&message).await {
                tracing::error!("Local QR generation failed for {}: {}", message.request_id, e);
            }
        });
        Ok(id)
    }
}
