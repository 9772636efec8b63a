//! Precompute Scheduler Background Job
//!
//! Keeps precomputed feeds warm. Every cycle:
//!
//! 1. Regenerates the shared trending index (when a trending source is registered)
//! 2. Regenerates Home and For You for the most recently active accounts
//!
//! A failing subject is logged and skipped; the next cycle retries it.

use crate::clients::ActiveAccounts;
use crate::config::PrecomputeConfig;
use crate::services::PrecomputeWorker;
use feed_store::{FeedKind, Subject};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::sleep;

/// How often to run a cycle (every 5 minutes)
const PRECOMPUTE_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Maximum accounts regenerated per cycle
const MAX_ACCOUNTS_PER_CYCLE: usize = 500;

/// Delay before the first cycle so dependencies can come up
const STARTUP_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct PrecomputeSchedulerConfig {
    pub enabled: bool,
    pub interval: Duration,
    pub max_accounts_per_cycle: usize,
    pub startup_delay: Duration,
}

impl Default for PrecomputeSchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: PRECOMPUTE_INTERVAL,
            max_accounts_per_cycle: MAX_ACCOUNTS_PER_CYCLE,
            startup_delay: STARTUP_DELAY,
        }
    }
}

impl From<&PrecomputeConfig> for PrecomputeSchedulerConfig {
    fn from(config: &PrecomputeConfig) -> Self {
        Self {
            enabled: config.interval_secs > 0,
            interval: config.interval(),
            max_accounts_per_cycle: config.max_accounts_per_cycle,
            ..Self::default()
        }
    }
}

/// Totals for one cycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub trending_refreshed: bool,
    pub accounts_refreshed: usize,
    pub accounts_failed: usize,
}

/// Start the precompute scheduler; runs until the task is dropped
pub async fn start_precompute_scheduler(
    worker: Arc<PrecomputeWorker>,
    accounts: Option<Arc<dyn ActiveAccounts>>,
    config: PrecomputeSchedulerConfig,
) {
    if !config.enabled {
        tracing::info!("Precompute scheduler disabled by configuration");
        return;
    }

    tracing::info!(
        interval_secs = config.interval.as_secs(),
        max_accounts = config.max_accounts_per_cycle,
        "Starting precompute scheduler"
    );

    sleep(config.startup_delay).await;

    loop {
        let cycle_start = Instant::now();
        let summary = run_cycle(&worker, accounts.as_deref(), &config).await;

        tracing::info!(
            trending_refreshed = summary.trending_refreshed,
            accounts_refreshed = summary.accounts_refreshed,
            accounts_failed = summary.accounts_failed,
            duration_ms = cycle_start.elapsed().as_millis(),
            "Precompute cycle completed"
        );

        sleep(config.interval).await;
    }
}

/// Run a single precompute cycle
pub async fn run_cycle(
    worker: &PrecomputeWorker,
    accounts: Option<&dyn ActiveAccounts>,
    config: &PrecomputeSchedulerConfig,
) -> CycleSummary {
    let mut summary = CycleSummary::default();

    if worker.has_source(FeedKind::Trending) {
        // Failures are already logged and counted by the worker
        summary.trending_refreshed = worker
            .run(FeedKind::Trending, Subject::Trending)
            .await
            .is_ok();
    }

    let has_account_feeds = worker.has_source(FeedKind::Home) || worker.has_source(FeedKind::ForYou);
    let Some(accounts) = accounts.filter(|_| has_account_feeds) else {
        return summary;
    };

    let account_ids = match accounts.active_accounts(config.max_accounts_per_cycle).await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to load active accounts");
            return summary;
        }
    };

    tracing::debug!(candidates = account_ids.len(), "Found accounts to precompute");

    for account_id in account_ids.into_iter().take(config.max_accounts_per_cycle) {
        match worker.populate_account(account_id).await {
            Ok(_) => summary.accounts_refreshed += 1,
            Err(e) => {
                tracing::debug!(account_id, error = %e, "Skipping account after failed precompute");
                summary.accounts_failed += 1;
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, Result};
    use crate::services::FeedSource;
    use async_trait::async_trait;
    use feed_store::{Entry, MemoryFeedIndex, MemoryRegenerationSignal, SortedFeedIndex, StoreKey};

    struct FixedAccounts(Vec<u64>);

    #[async_trait]
    impl ActiveAccounts for FixedAccounts {
        async fn active_accounts(&self, limit: usize) -> Result<Vec<u64>> {
            Ok(self.0.iter().copied().take(limit).collect())
        }
    }

    struct UnavailableAccounts;

    #[async_trait]
    impl ActiveAccounts for UnavailableAccounts {
        async fn active_accounts(&self, _limit: usize) -> Result<Vec<u64>> {
            Err(AppError::Upstream("registry down".into()))
        }
    }

    /// Scores the account id itself; account 13 fails
    struct AccountEcho(FeedKind);

    #[async_trait]
    impl FeedSource for AccountEcho {
        fn kind(&self) -> FeedKind {
            self.0
        }

        async fn compute(&self, subject: &Subject) -> Result<Vec<Entry>> {
            match subject {
                Subject::Account(13) => Err(AppError::Upstream("candidates down".into())),
                Subject::Account(id) => Ok(vec![Entry::new(*id, 1.0)]),
                Subject::Trending => Ok(vec![Entry::new(99, 1.0)]),
            }
        }
    }

    fn worker(index: Arc<MemoryFeedIndex>, kinds: &[FeedKind]) -> PrecomputeWorker {
        kinds.iter().fold(
            PrecomputeWorker::new(
                index,
                Arc::new(MemoryRegenerationSignal::new()),
                PrecomputeConfig::default(),
            ),
            |worker, kind| worker.with_source(Arc::new(AccountEcho(*kind))),
        )
    }

    #[tokio::test]
    async fn test_cycle_refreshes_trending_and_accounts() {
        let index = Arc::new(MemoryFeedIndex::new());
        let worker = worker(
            index.clone(),
            &[FeedKind::Trending, FeedKind::Home, FeedKind::ForYou],
        );
        let accounts = FixedAccounts(vec![1, 13, 2]);

        let summary = run_cycle(
            &worker,
            Some(&accounts),
            &PrecomputeSchedulerConfig::default(),
        )
        .await;

        assert_eq!(
            summary,
            CycleSummary {
                trending_refreshed: true,
                accounts_refreshed: 2,
                accounts_failed: 1,
            }
        );
        let home = StoreKey::index(FeedKind::Home, &Subject::Account(2));
        assert_eq!(index.len(&home).await.unwrap(), 1);
        let trending = StoreKey::index(FeedKind::Trending, &Subject::Trending);
        assert_eq!(index.len(&trending).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_cycle_respects_account_cap() {
        let worker = worker(Arc::new(MemoryFeedIndex::new()), &[FeedKind::ForYou]);
        let accounts = FixedAccounts((1..=10).collect());
        let config = PrecomputeSchedulerConfig {
            max_accounts_per_cycle: 3,
            ..PrecomputeSchedulerConfig::default()
        };

        let summary = run_cycle(&worker, Some(&accounts), &config).await;
        assert!(!summary.trending_refreshed);
        assert_eq!(summary.accounts_refreshed, 3);
    }

    #[tokio::test]
    async fn test_trending_only_without_account_sources() {
        let worker = worker(Arc::new(MemoryFeedIndex::new()), &[FeedKind::Trending]);
        let summary = run_cycle(
            &worker,
            Some(&FixedAccounts(vec![1, 2])),
            &PrecomputeSchedulerConfig::default(),
        )
        .await;
        assert!(summary.trending_refreshed);
        assert_eq!(summary.accounts_refreshed, 0);
    }

    #[tokio::test]
    async fn test_account_registry_failure_is_skipped() {
        let worker = worker(Arc::new(MemoryFeedIndex::new()), &[FeedKind::Home]);
        let summary = run_cycle(
            &worker,
            Some(&UnavailableAccounts),
            &PrecomputeSchedulerConfig::default(),
        )
        .await;
        assert_eq!(summary, CycleSummary::default());
    }

    #[test]
    fn test_config_from_precompute_config() {
        let precompute = PrecomputeConfig {
            interval_secs: 0,
            max_accounts_per_cycle: 7,
            ..PrecomputeConfig::default()
        };
        let config = PrecomputeSchedulerConfig::from(&precompute);
        assert!(!config.enabled);
        assert_eq!(config.max_accounts_per_cycle, 7);
    }
}
