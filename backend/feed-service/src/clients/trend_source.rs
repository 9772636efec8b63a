/// External trend source
///
/// A paginated (numeric offset) producer of trending candidates. The HTTP
/// implementation reads a Mastodon-compatible `/api/v1/trends/statuses`.
use crate::error::{AppError, Result};
use crate::models::{RemoteStatus, TrendCandidate};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TrendSource: Send + Sync {
    /// Candidates in source rank order
    async fn fetch_page(&self, limit: usize, offset: usize) -> Result<Vec<TrendCandidate>>;
}

#[derive(Clone)]
pub struct HttpTrendSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTrendSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build trend source client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/api/v1/trends/statuses",
            self.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl TrendSource for HttpTrendSource {
    async fn fetch_page(&self, limit: usize, offset: usize) -> Result<Vec<TrendCandidate>> {
        let statuses: Vec<RemoteStatus> = self
            .client
            .get(self.endpoint())
            .query(&[("limit", limit), ("offset", offset)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(
            source = %self.base_url,
            limit,
            offset,
            received = statuses.len(),
            "Fetched trend page"
        );
        Ok(statuses.into_iter().map(TrendCandidate::from).collect())
    }
}
