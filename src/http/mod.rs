//! HTTP servers for uscheck.
//!
//! The API server answers recommendation, business and QR requests; the
//! worker server receives Pub/Sub push deliveries and renders QR codes.

pub mod client;
mod error;
mod handlers;
mod worker;

use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::ai::TextGenerator;
use crate::config::ServerConfig;
use crate::qr::{Publisher, QrWorker};
use crate::search::{QueryAnalyzer, Recommender};
use crate::storage::DocumentStore;

pub use self::error::{ApiError, ErrorBody};

/// Shared application state for API handlers
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub recommender: Recommender,
    pub publisher: Arc<dyn Publisher>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        generator: Option<Arc<dyn TextGenerator>>,
        publisher: Arc<dyn Publisher>,
        max_results: usize,
    ) -> Self {
        let recommender = Recommender::new(
            Arc::clone(&store),
            QueryAnalyzer::new(generator),
            max_results,
        );
        Self {
            store,
            recommender,
            publisher,
        }
    }
}

/// Shared state for the push worker
pub struct WorkerState {
    pub worker: Arc<QrWorker>,
}

/// CORS policy from server settings
pub fn cors_layer(config: &ServerConfig) -> Result<CorsLayer> {
    if config.allow_all_origins {
        return Ok(CorsLayer::permissive());
    }
    let origin = config
        .allowed_origin
        .parse::<axum::http::HeaderValue>()
        .with_context(|| format!("Invalid allowed origin: {}", config.allowed_origin))?;
    Ok(CorsLayer::new()
        .allow_origin(AllowOrigin::exact(origin))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any))
}

/// Run the API server
pub async fn run_server(state: Arc<AppState>, config: &ServerConfig) -> Result<()> {
    let app = handlers::router(state, cors_layer(config)?);
    serve(app, &config.host, config.port, "API").await
}

/// Run the QR worker server
pub async fn run_worker(state: Arc<WorkerState>, host: &str, port: u16) -> Result<()> {
    let app = worker::router(state);
    serve(app, host, port, "QR worker").await
}

/// Bind a listener, resolving host names such as `localhost`
async fn bind(host: &str, port: u16) -> Result<tokio::net::TcpListener> {
    tokio::net::TcpListener::bind((host, port))
        .await
        .with_context(|| format!("Failed to bind to {}:{}", host, port))
}

async fn serve(app: axum::Router, host: &str, port: u16, name: &str) -> Result<()> {
    let listener = bind(host, port).await?;
    let addr = listener
        .local_addr()
        .context("Failed to read listen address")?;
    tracing::info!("uscheck {} server listening on {}", name, addr);

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}
