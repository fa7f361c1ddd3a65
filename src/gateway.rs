use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::Depth;

/// A synthesized research summary as returned by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub topic: String,
    pub depth: Depth,
    pub summary: String,
    pub created_at: DateTime<Utc>,
}

/// Error payload shape the backend uses for all failure statuses.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug, PartialEq, Error)]
pub enum GatewayError {
    /// Lookup found no fresh cached record (absent or expired).
    #[error("no fresh cached summary for this topic and depth")]
    NotFound,
    /// Application-level error payload from the backend.
    #[error("{0}")]
    Backend(String),
    /// Network-level failure with no structured payload.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        GatewayError::Transport(err.to_string())
    }
}

/// Boundary to the external research/summarization service.
#[async_trait]
pub trait SummaryGateway: Send + Sync {
    /// Synthesize a new summary for the topic at the given depth. The
    /// backend may answer from its own still-fresh copy, in which case the
    /// returned timestamp is the original creation time.
    async fn create_summary(
        &self,
        topic: &str,
        depth: Depth,
    ) -> Result<SummaryRecord, GatewayError>;

    /// Retrieve a previously computed summary without recomputation.
    async fn lookup_summary(
        &self,
        topic: &str,
        depth: Depth,
    ) -> Result<SummaryRecord, GatewayError>;
}

pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
}

impl HttpGateway {
    pub fn from_env() -> Result<Self> {
        let base_url = dotenv::var("INSIGHT_API_URL")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());
        let timeout_secs = dotenv::var("INSIGHT_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(120);

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    /// Resolve the search endpoint from the base URL.
    fn endpoint(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        if base.ends_with("/api/search") {
            format!("{}/", base)
        } else {
            format!("{}/api/search/", base)
        }
    }

    /// Map a non-success response to the error taxonomy. Falls back to the
    /// status code when the body carries no structured payload.
    async fn read_error(resp: reqwest::Response) -> GatewayError {
        let status = resp.status();
        match resp.json::<ErrorBody>().await {
            Ok(body) => GatewayError::Backend(body.error),
            Err(_) => GatewayError::Backend(format!("backend returned {}", status)),
        }
    }
}

#[async_trait]
impl SummaryGateway for HttpGateway {
    async fn create_summary(
        &self,
        topic: &str,
        depth: Depth,
    ) -> Result<SummaryRecord, GatewayError> {
        let body = serde_json::json!({ "topic": topic, "depth": depth });
        let resp = self.client.post(self.endpoint()).json(&body).send().await?;

        if !resp.status().is_success() {
            return Err(Self::read_error(resp).await);
        }
        Ok(resp.json::<SummaryRecord>().await?)
    }

    async fn lookup_summary(
        &self,
        topic: &str,
        depth: Depth,
    ) -> Result<SummaryRecord, GatewayError> {
        let resp = self
            .client
            .get(self.endpoint())
            .query(&[("topic", topic), ("depth", depth.as_str())])
            .send()
            .await?;

        // 404 is the distinguished "absent or expired" outcome, not a failure.
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(GatewayError::NotFound);
        }
        if !resp.status().is_success() {
            return Err(Self::read_error(resp).await);
        }
        Ok(resp.json::<SummaryRecord>().await?)
    }
}
