//! QR code pipeline.
//!
//! The API records a request and publishes a [`QrMessage`](crate::types::QrMessage);
//! the worker renders the code, uploads it as a public PNG and records the
//! resulting URL, which the lookup endpoint later serves.

pub mod lookup;
pub mod object_store;
pub mod publisher;
pub mod render;
pub mod request;
pub mod worker;

use thiserror::Error;

pub use self::object_store::{GcsStore, MemoryObjectStore, ObjectStore};
pub use self::publisher::{LocalPublisher, Publisher, PubSubPublisher};
pub use self::worker::QrWorker;

#[derive(Error, Debug)]
pub enum QrError {
    #[error("could not encode QR code: {0}")]
    Encode(#[from] qrcode::types::QrError),

    #[error("could not write PNG: {0}")]
    Image(#[from] image::ImageError),

    #[error("request to {service} failed: {source}")]
    Transport {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned {status}: {body}")]
    Status {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("authentication failed: {0}")]
    Auth(#[from] crate::auth::AuthError),

    #[error(transparent)]
    Store(#[from] crate::storage::StoreError),

    #[error("could not encode message: {0}")]
    Message(#[from] serde_json::Error),
}

/// Send an authorized request and turn non-2xx answers into [`QrError::Status`]
pub(crate) async fn send_checked(
    service: &'static str,
    auth: &crate::auth::TokenProvider,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, QrError> {
    let token = auth.token().await?;
    let resp = request
        .bearer_auth(token)
        .send()
        .await
        .map_err(|source| QrError::Transport { service, source })?;
    if !resp.status().is_success() {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        return Err(QrError::Status {
            service,
            status,
            body,
        });
    }
    Ok(resp)
}
