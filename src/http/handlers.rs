//! HTTP request handlers for the uscheck API.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;

use super::{ApiError, AppState};
use crate::business::{self, BusinessForm};
use crate::qr::lookup::{find_latest, LookupForm};
use crate::qr::request::{submit, QrReceipt, QrRequestForm};
use crate::types::Recommendation;

/// Build the axum router with all routes
pub(super) fn router(state: Arc<AppState>, cors: CorsLayer) -> axum::Router {
    use axum::routing::{get, post};
    use tower_http::trace::TraceLayer;

    axum::Router::new()
        .route("/health", get(health))
        .route("/api/query", get(query_get).post(query_post))
        .route("/api/query/", get(query_get).post(query_post))
        .route("/api/business", post(register_business))
        .route("/api/business/", post(register_business))
        .route("/api/qr/generate", post(qr_generate))
        .route("/api/qr/generate/", post(qr_generate))
        .route("/api/qr/generate/pubsub", get(qr_lookup_get).post(qr_lookup_post))
        .route("/api/qr/generate/pubsub/", get(qr_lookup_get).post(qr_lookup_post))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Parse a JSON request body. An empty body reads as the default value so
/// missing fields surface as validation errors rather than parse errors.
fn parse_body<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))
}

// -- /health --

async fn health() -> Json<Value> {
    Json(serde_json::json!({"status": "ok"}))
}

// -- /api/query --

#[derive(Debug, Default, Deserialize)]
struct QueryRequest {
    #[serde(default)]
    query: Option<String>,
}

async fn query_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<QueryRequest>,
) -> Result<Json<Recommendation>, ApiError> {
    recommend(&state, params).await
}

async fn query_post(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<Recommendation>, ApiError> {
    recommend(&state, parse_body(&body)?).await
}

async fn recommend(state: &AppState, request: QueryRequest) -> Result<Json<Recommendation>, ApiError> {
    let query = request.query.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::BadRequest("query is required".into()));
    }
    Ok(Json(state.recommender.recommend(query).await?))
}

// -- /api/business --

#[derive(Serialize)]
struct BusinessResponse {
    success: bool,
    business_id: String,
    message: String,
}

async fn register_business(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let form: BusinessForm = parse_body(&body)?;
    let business_id = business::register(state.store.as_ref(), &form).await?;
    Ok((
        StatusCode::CREATED,
        Json(BusinessResponse {
            success: true,
            business_id,
            message: "Business registered".into(),
        }),
    ))
}

// -- /api/qr/generate --

#[derive(Serialize)]
struct QrGenerateResponse {
    success: bool,
    #[serde(flatten)]
    receipt: QrReceipt,
}

async fn qr_generate(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<QrGenerateResponse>, ApiError> {
    let form: QrRequestForm = parse_body(&body)?;
    let receipt = submit(state.store.as_ref(), state.publisher.as_ref(), &form).await?;
    Ok(Json(QrGenerateResponse {
        success: true,
        receipt,
    }))
}

// -- /api/qr/generate/pubsub --

/// Query-string form of [`LookupForm`]
#[derive(Debug, Default, Deserialize)]
struct LookupParams {
    key: Option<String>,
    store: Option<String>,
    price: Option<String>,
    timestamp: Option<String>,
}

impl From<LookupParams> for LookupForm {
    fn from(params: LookupParams) -> Self {
        LookupForm {
            key: params.key,
            store: params.store,
            price: params.price.map(Value::from),
            timestamp: params.timestamp,
        }
    }
}

#[derive(Serialize)]
struct QrLookupResponse {
    success: bool,
    qr_url: String,
    request_id: String,
}

async fn qr_lookup_get(
    State(state): State<Arc<AppState>>,
    Query(params): Query<LookupParams>,
) -> Result<Json<QrLookupResponse>, ApiError> {
    qr_lookup(&state, params.into()).await
}

async fn qr_lookup_post(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<QrLookupResponse>, ApiError> {
    qr_lookup(&state, parse_body(&body)?).await
}

async fn qr_lookup(state: &AppState, form: LookupForm) -> Result<Json<QrLookupResponse>, ApiError> {
    let key = form
        .key()
        .ok_or_else(|| ApiError::BadRequest("key or store, price and timestamp are required".into()))?;

    match find_latest(state.store.as_ref(), &key).await? {
        Some(result) => Ok(Json(QrLookupResponse {
            success: true,
            qr_url: result.qr_url,
            request_id: result.request_id,
        })),
        None => Err(ApiError::NotFound(format!("No QR code generated for {key}"))),
    }
}
