/// Trending merge
///
/// Pulls ranked candidates from the external trend source, resolves each to a
/// local status (creating the local copy when needed) and scores the result
/// for the shared trending index.
use crate::clients::{ObjectStore, TrendSource};
use crate::config::TrendsConfig;
use crate::error::{AppError, Result};
use crate::metrics;
use crate::models::TrendCandidate;
use crate::services::precompute::FeedSource;
use async_trait::async_trait;
use feed_store::{ContentId, Entry, FeedKind, Subject};
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct TrendingMerge {
    source: Arc<dyn TrendSource>,
    store: Arc<dyn ObjectStore>,
    config: TrendsConfig,
}

impl TrendingMerge {
    pub fn new(
        source: Arc<dyn TrendSource>,
        store: Arc<dyn ObjectStore>,
        config: TrendsConfig,
    ) -> Self {
        Self {
            source,
            store,
            config,
        }
    }

    /// Up to `fetch_limit` candidates in source order, requested in pages of
    /// at most `page_size`. A failing page fails the whole batch.
    pub async fn fetch_candidates(&self) -> Result<Vec<TrendCandidate>> {
        let fetch_limit = self.config.fetch_limit;
        let page_size = self.config.page_size.max(1);
        let mut candidates = Vec::with_capacity(fetch_limit);
        let mut offset = 0;

        while candidates.len() < fetch_limit {
            let limit = page_size.min(fetch_limit - candidates.len());
            let page = self.source.fetch_page(limit, offset).await?;
            let received = page.len();
            candidates.extend(page);

            if received < limit {
                break;
            }
            offset += received;
        }

        candidates.truncate(fetch_limit);
        Ok(candidates)
    }

    /// Resolve candidates to scored entries.
    ///
    /// A candidate that fails or does not resolve is skipped. A status
    /// reached twice keeps its first (best ranked) entry. External scores are
    /// used only when every candidate carries one; otherwise the score is
    /// derived from position so the first candidate scores highest.
    ///
    /// Fails when there were candidates and every one of them errored, so a
    /// store outage never replaces the index with an empty batch.
    pub async fn resolve(&self, candidates: &[TrendCandidate]) -> Result<Vec<Entry>> {
        let total = candidates.len();
        let use_external = !candidates.is_empty()
            && candidates
                .iter()
                .all(|c| c.external_score.is_some_and(f64::is_finite));

        let concurrency = self.config.resolve_concurrency.max(1);
        let store = self.store.clone();
        let resolved: Vec<(usize, Result<Option<ContentId>>)> =
            stream::iter(candidates.iter().cloned().enumerate())
                .map(move |(position, candidate)| {
                    let store = store.clone();
                    async move { (position, store.resolve_or_create(&candidate).await) }
                })
                .buffered(concurrency)
                .collect()
                .await;

        let mut seen = HashSet::with_capacity(total);
        let mut entries = Vec::with_capacity(total);
        let mut failed = 0;
        for (position, outcome) in resolved {
            let candidate = &candidates[position];
            let id = match outcome {
                Ok(Some(id)) => id,
                Ok(None) => {
                    debug!(reference = %candidate.reference, "Trend candidate not resolvable");
                    metrics::record_trending_candidate("unresolved");
                    continue;
                }
                Err(e) => {
                    warn!(reference = %candidate.reference, error = %e, "Failed to resolve trend candidate");
                    metrics::record_trending_candidate("failed");
                    failed += 1;
                    continue;
                }
            };

            if !seen.insert(id) {
                metrics::record_trending_candidate("duplicate");
                continue;
            }
            metrics::record_trending_candidate("resolved");

            let score = match candidate.external_score {
                Some(score) if use_external => score,
                _ => (total - position) as f64,
            };
            entries.push(Entry::new(id, score));
        }

        if total > 0 && failed == total {
            return Err(AppError::Upstream(format!(
                "all {} trend candidates failed to resolve",
                total
            )));
        }
        Ok(entries)
    }
}

#[async_trait]
impl FeedSource for TrendingMerge {
    fn kind(&self) -> FeedKind {
        FeedKind::Trending
    }

    async fn compute(&self, subject: &Subject) -> Result<Vec<Entry>> {
        if *subject != Subject::Trending {
            return Err(AppError::Internal(format!(
                "trending merge only serves the shared subject, got {}",
                subject
            )));
        }

        let candidates = self.fetch_candidates().await?;
        let entries = self.resolve(&candidates).await?;
        debug!(
            fetched = candidates.len(),
            resolved = entries.len(),
            "Merged trending candidates"
        );
        Ok(entries)
    }
}
