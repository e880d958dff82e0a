//! Push endpoint for the QR worker.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use super::{ApiError, WorkerState};
use crate::qr::worker::decode_push;
use crate::qr::QrError;

pub(super) fn router(state: Arc<WorkerState>) -> axum::Router {
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    axum::Router::new()
        .route("/health", get(|| async { Json(serde_json::json!({"status": "ok"})) }))
        .route("/pubsub/push", post(push))
        .route("/generate", post(generate))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Serialize)]
struct GeneratedResponse {
    result: &'static str,
    qr_url: String,
}

// -- /pubsub/push --

/// Malformed deliveries, and payloads too large to encode, are acknowledged
/// so Pub/Sub stops redelivering them; other failures answer 500 so the
/// message is retried.
async fn push(State(state): State<Arc<WorkerState>>, body: Bytes) -> Result<Response, ApiError> {
    let message = match decode_push(&body) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!("Dropping push delivery: {}", e);
            return Ok(StatusCode::NO_CONTENT.into_response());
        }
    };

    let qr_url = match state.worker.process(&message).await {
        Ok(url) => url,
        Err(QrError::Encode(e)) => {
            tracing::warn!(
                "Dropping push delivery {}: payload does not fit a QR code: {}",
                message.request_id,
                e
            );
            return Ok(StatusCode::NO_CONTENT.into_response());
        }
        Err(e) => return Err(anyhow::Error::from(e).into()),
    };
    Ok(Json(GeneratedResponse {
        result: "success",
        qr_url,
    })
    .into_response())
}

// -- /generate --

#[derive(Debug, Default, Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    store: Option<String>,
}

async fn generate(
    State(state): State<Arc<WorkerState>>,
    body: Bytes,
) -> Result<Json<GeneratedResponse>, ApiError> {
    let request: GenerateRequest = serde_json::from_slice(&body)
        .map_err(|_| ApiError::BadRequest("No JSON data provided".into()))?;
    let store = request
        .store
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("store is required".into()))?;

    let qr_url = state.worker.generate_direct(store).await.map_err(|e| match e {
        QrError::Encode(e) => ApiError::BadRequest(format!("store does not fit a QR code: {e}")),
        other => anyhow::Error::from(other).into(),
    })?;
    Ok(Json(GeneratedResponse {
        result: "success",
        qr_url,
    }))
}
