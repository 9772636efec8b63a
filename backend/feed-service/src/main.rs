use anyhow::Context;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feed_service::clients::{
    ActiveAccounts, CandidateSource, HttpCandidateSource, HttpTrendSource, ObjectStore,
    RedisActiveAccounts, RedisObjectStore,
};
use feed_service::config::{Config, StoreBackend};
use feed_service::jobs::{start_precompute_scheduler, PrecomputeSchedulerConfig};
use feed_service::services::{
    CandidateRanker, PrecomputeWorker, RankedSource, RecencySource, TrendingMerge,
};
use feed_store::{
    MemoryFeedIndex, MemoryRegenerationSignal, RedisFeedIndex, RedisRegenerationSignal,
    RegenerationSignal, SortedFeedIndex, StoreMetrics,
};
use redis::aio::ConnectionManager;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,feed_service=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_line_number(true)
                .with_file(true)
                .with_target(true),
        )
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;

    tracing::info!("Starting feed-service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        env = %config.app.env,
        backend = ?config.store.backend,
        apply_mode = ?config.precompute.apply_mode,
        "Configuration loaded"
    );

    if let Err(e) = StoreMetrics::register(prometheus::default_registry()) {
        tracing::warn!(error = %e, "Failed to register feed store metrics");
    }

    let client = redis::Client::open(config.store.redis_url.as_str())
        .context("Invalid REDIS_URL")?;
    let conn = ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;
    tracing::info!("Redis connection established");

    // Objects and the active-account registry stay in Redis either way
    let (index, signal): (Arc<dyn SortedFeedIndex>, Arc<dyn RegenerationSignal>) =
        match config.store.backend {
            StoreBackend::Redis => (
                Arc::new(RedisFeedIndex::new(conn.clone())),
                Arc::new(RedisRegenerationSignal::new(conn.clone())),
            ),
            StoreBackend::Memory => (
                Arc::new(MemoryFeedIndex::new()),
                Arc::new(MemoryRegenerationSignal::new()),
            ),
        };
    let store: Arc<dyn ObjectStore> = Arc::new(RedisObjectStore::new(conn.clone()));

    let mut worker = PrecomputeWorker::new(index, signal, config.precompute.clone());

    if config.trends.enabled {
        let source = HttpTrendSource::new(
            config.trends.source_url.clone(),
            config.trends.http_timeout(),
        )?;
        worker = worker.with_source(Arc::new(TrendingMerge::new(
            Arc::new(source),
            store.clone(),
            config.trends.clone(),
        )));
        tracing::info!(source = %config.trends.source_url, "Trending precompute enabled");
    }

    let accounts: Option<Arc<dyn ActiveAccounts>> = match &config.candidates.url {
        Some(url) => {
            let candidates: Arc<dyn CandidateSource> = Arc::new(HttpCandidateSource::new(
                url.clone(),
                Duration::from_secs(config.candidates.timeout_secs),
            )?);
            let limit = config.precompute.candidate_limit;

            if config.feed.home_enabled {
                worker = worker.with_source(Arc::new(RecencySource::new(candidates.clone(), limit)));
            }
            if config.feed.for_you_enabled {
                worker = worker.with_source(Arc::new(RankedSource::new(
                    candidates,
                    CandidateRanker::default(),
                    limit,
                )));
            }
            Some(Arc::new(RedisActiveAccounts::new(conn.clone())))
        }
        None => {
            tracing::info!("CANDIDATES_URL not set, Home and For You precompute disabled");
            None
        }
    };

    let scheduler = tokio::spawn(start_precompute_scheduler(
        Arc::new(worker),
        accounts,
        PrecomputeSchedulerConfig::from(&config.precompute),
    ));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown signal received, stopping precompute scheduler");
    scheduler.abort();

    Ok(())
}
