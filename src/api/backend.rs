//! Fire-and-forget submission to the analysis backend.
//!
//! The POST exists only to trigger backend-side processing; its response
//! body is never relied upon, and a transport failure is logged rather
//! than surfaced, since the job may still run server-side.

use crate::models::AnalysisRequest;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

/// Something that can trigger backend-side analysis of a URL.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn submit(&self, request: &AnalysisRequest) -> Result<()>;
}

/// HTTP implementation posting `{"url": ...}` to the analyze endpoint.
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(endpoint: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client, endpoint })
    }
}

#[async_trait]
impl AnalysisBackend for HttpBackend {
    async fn submit(&self, request: &AnalysisRequest) -> Result<()> {
        info!("Submitting {} to {}", request.url, self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .with_context(|| format!("Failed to reach analysis backend at {}", self.endpoint))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Analysis backend returned {}: {}", status, body);
        }

        debug!("Backend accepted submission ({})", status);
        Ok(())
    }
}

/// Backend that does nothing, for `--no-submit` runs where the job was
/// already triggered elsewhere.
pub struct NoopBackend;

#[async_trait]
impl AnalysisBackend for NoopBackend {
    async fn submit(&self, request: &AnalysisRequest) -> Result<()> {
        debug!("Skipping submission for {}", request.url);
        Ok(())
    }
}
