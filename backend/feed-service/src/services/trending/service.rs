/// Trending Service
///
/// Serves the shared trending index by rank offset: highest score first,
/// skip `offset`, take `limit`, then hydrate.
use crate::config::{FeedConfig, TrendsConfig};
use crate::error::Result;
use crate::models::{FeedStatus, TrendingPage};
use crate::services::feed_reader::FeedReader;
use crate::services::hydrator::Hydrator;
use crate::services::pagination::offset_cursors;
use feed_store::{FeedKind, RegenerationSignal, SortedFeedIndex, Subject};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct TrendingService {
    reader: FeedReader,
    hydrator: Hydrator,
    signal: Arc<dyn RegenerationSignal>,
    enabled: bool,
    default_limit: usize,
    max_limit: usize,
}

impl TrendingService {
    pub fn new(
        index: Arc<dyn SortedFeedIndex>,
        signal: Arc<dyn RegenerationSignal>,
        hydrator: Hydrator,
        trends: &TrendsConfig,
        feed: &FeedConfig,
    ) -> Self {
        Self {
            reader: FeedReader::new(FeedKind::Trending, index),
            hydrator,
            signal,
            enabled: trends.enabled,
            default_limit: feed.default_limit,
            max_limit: feed.max_limit,
        }
    }

    pub async fn page(&self, offset: usize, limit: Option<usize>) -> Result<TrendingPage> {
        if !self.enabled {
            debug!("Trends disabled, serving empty page");
            return Ok(TrendingPage::empty());
        }

        let limit = limit
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1));

        let regenerating = match self.signal.is_regenerating(&Subject::Trending).await {
            Ok(flag) => flag,
            Err(e) => {
                warn!(error = %e, "Trending regeneration signal unavailable");
                false
            }
        };

        let ids = self
            .reader
            .read_offset(&Subject::Trending, offset, limit)
            .await?;
        let statuses = self.hydrator.hydrate(&ids).await?;

        Ok(TrendingPage {
            statuses,
            status: FeedStatus::from_regenerating(regenerating),
            cursors: offset_cursors(offset, limit, ids.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::object_store::MockObjectStore;
    use crate::models::{Status, StatusAccount};
    use chrono::Utc;
    use feed_store::{ContentId, MemoryFeedIndex, MemoryRegenerationSignal, StoreKey};

    fn status(id: ContentId) -> Status {
        Status {
            id,
            uri: format!("https://local.example/statuses/{}", id),
            url: None,
            account: StatusAccount {
                username: "bo".into(),
                domain: Some("remote.example".into()),
            },
            content: String::new(),
            created_at: Utc::now(),
            replies_count: 0,
            reblogs_count: 0,
            favourites_count: 0,
        }
    }

    async fn service(enabled: bool) -> TrendingService {
        let index = Arc::new(MemoryFeedIndex::new());
        let key = StoreKey::index(FeedKind::Trending, &Subject::Trending);
        for id in 1..=5u64 {
            index.upsert(&key, id, id as f64).await.unwrap();
        }

        let mut store = MockObjectStore::new();
        store
            .expect_bulk_fetch()
            .returning(|ids| Ok(ids.iter().map(|id| status(*id)).collect()));

        let trends = TrendsConfig {
            enabled,
            ..TrendsConfig::default()
        };
        TrendingService::new(
            index,
            Arc::new(MemoryRegenerationSignal::new()),
            Hydrator::new(Arc::new(store)),
            &trends,
            &FeedConfig::default(),
        )
    }

    fn ids(page: &TrendingPage) -> Vec<ContentId> {
        page.statuses.iter().map(|s| s.id).collect()
    }

    #[tokio::test]
    async fn test_offset_pages() {
        let service = service(true).await;

        let first = service.page(0, Some(2)).await.unwrap();
        assert_eq!(ids(&first), vec![5, 4]);
        assert_eq!(first.cursors.next_offset, Some(2));
        assert_eq!(first.cursors.prev_offset, None);

        let last = service.page(4, Some(2)).await.unwrap();
        assert_eq!(ids(&last), vec![1]);
        assert_eq!(last.cursors.next_offset, None);
        assert_eq!(last.cursors.prev_offset, Some(2));
    }

    #[tokio::test]
    async fn test_disabled_trends_are_empty() {
        let service = service(false).await;
        assert_eq!(service.page(0, None).await.unwrap(), TrendingPage::empty());
    }
}
