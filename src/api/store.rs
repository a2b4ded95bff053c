//! Record-store polling query.
//!
//! The backend writes analysis records into a hosted Postgres table
//! exposed over the Supabase REST (PostgREST) API. The client only ever
//! reads it: exact match on `url`, newest row by `inserted_at`, one row.
//!
//! "No rows yet" is an expected outcome while the backend is still
//! working, so it is modeled as `Ok(None)` and kept distinct from
//! genuine query failures.

use crate::models::PollableRecord;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Errors from a record-store query. The empty-result case is not an
/// error and never appears here.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("record store returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to decode record store response: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Read access to the analysis records table.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// The most recently inserted record for `url`, if any exists yet.
    async fn latest_record(&self, url: &str) -> Result<Option<PollableRecord>, StoreError>;
}

/// Supabase REST implementation.
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    table: String,
}

impl SupabaseStore {
    pub fn new(
        base_url: String,
        api_key: String,
        table: String,
        timeout: Duration,
    ) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            table,
        })
    }

    /// Decode a PostgREST response body into at most one record.
    fn parse_rows(body: &str) -> Result<Option<PollableRecord>, StoreError> {
        let mut rows: Vec<PollableRecord> = serde_json::from_str(body)?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }
}

#[async_trait]
impl ContentStore for SupabaseStore {
    async fn latest_record(&self, url: &str) -> Result<Option<PollableRecord>, StoreError> {
        let endpoint = format!("{}/rest/v1/{}", self.base_url, self.table);

        let url_filter = format!("eq.{}", url);
        let response = self
            .client
            .get(&endpoint)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .query(&[
                ("select", "url,url_status,url_content,inserted_at"),
                ("url", url_filter.as_str()),
                ("order", "inserted_at.desc"),
                ("limit", "1"),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status { status, body });
        }

        let body = response.text().await?;
        let record = Self::parse_rows(&body)?;
        debug!(
            "store query for {}: {}",
            url,
            match &record {
                Some(r) => format!(
                    "status={}",
                    r.url_status.map(|s| s.to_string()).unwrap_or_else(|| "null".into())
                ),
                None => "no rows".to_string(),
            }
        );

        Ok(record)
    }
}
