use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::business::RegistrationError;
use crate::qr::request::QrRequestError;

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// Logged in full, answered with a generic message
    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(err) => {
                tracing::error!("Internal error: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (
            status,
            Json(ErrorBody {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

impl From<RegistrationError> for ApiError {
    fn from(err: RegistrationError) -> Self {
        match err {
            RegistrationError::Missing(_) => ApiError::BadRequest(err.to_string()),
            RegistrationError::Store(e) => ApiError::Internal(e.into()),
        }
    }
}

impl From<QrRequestError> for ApiError {
    fn from(err: QrRequestError) -> Self {
        match err {
            QrRequestError::Missing(_) | QrRequestError::TooLong => {
                ApiError::BadRequest(err.to_string())
            }
            QrRequestError::Store(e) => ApiError::Internal(e.into()),
            QrRequestError::Publish(e) => ApiError::Internal(e.into()),
        }
    }
}

impl From<crate::storage::StoreError> for ApiError {
    fn from(err: crate::storage::StoreError) -> Self {
        ApiError::Internal(err.into())
    }
}
