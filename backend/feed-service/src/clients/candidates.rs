/// Candidate source
///
/// Candidate statuses with engagement aggregates for one account, produced by
/// the aggregates service. Input to the Home and For You precompute.
use crate::error::{AppError, Result};
use crate::models::AggregatedCandidate;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CandidateSource: Send + Sync {
    async fn candidates(&self, account_id: u64, limit: usize) -> Result<Vec<AggregatedCandidate>>;
}

#[derive(Clone)]
pub struct HttpCandidateSource {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCandidateSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Config(format!("failed to build candidates client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl CandidateSource for HttpCandidateSource {
    async fn candidates(&self, account_id: u64, limit: usize) -> Result<Vec<AggregatedCandidate>> {
        let url = format!(
            "{}/accounts/{}/candidates",
            self.base_url.trim_end_matches('/'),
            account_id
        );
        let candidates: Vec<AggregatedCandidate> = self
            .client
            .get(url)
            .query(&[("limit", limit)])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        debug!(account_id, count = candidates.len(), "Fetched candidates");
        Ok(candidates)
    }
}
