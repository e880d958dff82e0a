//! HTTP client for a running uscheck server.
//!
//! Used by `uscheck query --server <url>` to ask a deployed API for
//! recommendations.

use anyhow::{Context, Result};
use serde::Deserialize;

use super::ErrorBody;
use crate::types::Recommendation;

/// HTTP client for the uscheck API
pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

/// Response from the /health endpoint
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

impl Client {
    /// Create a new client pointing at the given server URL.
    pub fn new(base_url: &str) -> Self {
        let base_url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url,
            http: reqwest::Client::new(),
        }
    }

    /// Ask the server for recommendations.
    pub async fn query(&self, query: &str) -> Result<Recommendation> {
        let url = format!("{}/api/query", self.base_url);

        let resp = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .context("Failed to connect to uscheck server")?;

        Self::check(resp)
            .await?
            .json()
            .await
            .context("Failed to parse query response")
    }

    /// Check that the server is up.
    pub async fn health(&self) -> Result<HealthResponse> {
        let url = format!("{}/health", self.base_url);

        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to connect to uscheck server")?;

        Self::check(resp)
            .await?
            .json()
            .await
            .context("Failed to parse health response")
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response> {
        if !resp.status().is_success() {
            let status = resp.status();
            let body: ErrorBody = resp.json().await.unwrap_or(ErrorBody {
                error: format!("HTTP {}", status),
            });
            anyhow::bail!("Server error ({}): {}", status, body.error);
        }
        Ok(resp)
    }

    /// Return the base URL (for display/logging).
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
