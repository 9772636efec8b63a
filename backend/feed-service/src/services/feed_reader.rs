//! Feed reader
//!
//! Turns `max_id` / `since_id` / `min_id` cursors into an exclusive score
//! window and queries the subject's index:
//! - no `min_id`: newest first, walking down from `max_id` towards `since_id`
//! - `min_id`: oldest first, walking up from `min_id` towards `max_id`
//!
//! A cursor that is no longer in the index (evicted, trimmed) resolves to an
//! unbounded side instead of failing the request.

use crate::error::{AppError, Result};
use crate::models::PageRequest;
use feed_store::{
    Bound, ContentId, Direction, FeedKind, RangeQuery, SortedFeedIndex, StoreKey, Subject,
};
use std::sync::Arc;
use tracing::debug;

/// Identifiers of one page in index order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedWindow {
    pub ids: Vec<ContentId>,
    pub direction: Direction,
}

impl FeedWindow {
    /// Oldest entry of the window
    pub fn oldest(&self) -> Option<ContentId> {
        match self.direction {
            Direction::Descending => self.ids.last().copied(),
            Direction::Ascending => self.ids.first().copied(),
        }
    }

    /// Newest entry of the window
    pub fn newest(&self) -> Option<ContentId> {
        match self.direction {
            Direction::Descending => self.ids.first().copied(),
            Direction::Ascending => self.ids.last().copied(),
        }
    }
}

#[derive(Clone)]
pub struct FeedReader {
    kind: FeedKind,
    index: Arc<dyn SortedFeedIndex>,
}

impl FeedReader {
    pub fn new(kind: FeedKind, index: Arc<dyn SortedFeedIndex>) -> Self {
        Self { kind, index }
    }

    pub fn kind(&self) -> FeedKind {
        self.kind
    }

    /// Score-window page; `limit` is already clamped by the caller
    pub async fn read(
        &self,
        subject: &Subject,
        page: &PageRequest,
        limit: usize,
    ) -> Result<FeedWindow> {
        if self.kind.uses_offset_pagination() {
            return Err(AppError::Internal(format!(
                "{} feed is paged by offset, not by id cursor",
                self.kind
            )));
        }
        let key = StoreKey::index(self.kind, subject);
        let upper = self.resolve_cursor(&key, page.max_id).await?;

        let query = match page.min_id {
            None => {
                let lower = self.resolve_cursor(&key, page.since_id).await?;
                RangeQuery::descending(upper, lower, limit)
            }
            Some(min_id) => {
                let lower = self.resolve_cursor(&key, Some(min_id)).await?;
                RangeQuery::ascending(lower, upper, limit)
            }
        };

        let ids = self.index.range(&key, &query).await?;
        debug!(
            kind = %self.kind,
            subject = %subject,
            limit,
            returned = ids.len(),
            "Feed window read"
        );

        Ok(FeedWindow {
            ids,
            direction: query.direction,
        })
    }

    /// Rank-offset page, highest score first
    pub async fn read_offset(
        &self,
        subject: &Subject,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<ContentId>> {
        if !self.kind.uses_offset_pagination() {
            return Err(AppError::Internal(format!(
                "{} feed is paged by id cursor, not by offset",
                self.kind
            )));
        }
        let key = StoreKey::index(self.kind, subject);
        Ok(self.index.rank_window(&key, offset, limit).await?)
    }

    async fn resolve_cursor(&self, key: &StoreKey, cursor: Option<ContentId>) -> Result<Bound> {
        let Some(id) = cursor else {
            return Ok(Bound::Unbounded);
        };
        match self.index.position(key, id).await? {
            Some(position) => Ok(Bound::Exclusive(position)),
            None => {
                debug!(key = %key, cursor = id, "Unknown cursor treated as unbounded");
                Ok(Bound::Unbounded)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feed_store::MemoryFeedIndex;

    const SUBJECT: Subject = Subject::Account(1);

    async fn reader_for(
        kind: FeedKind,
        subject: Subject,
        entries: &[(ContentId, f64)],
    ) -> FeedReader {
        let index = Arc::new(MemoryFeedIndex::new());
        let key = StoreKey::index(kind, &subject);
        for (id, score) in entries {
            index.upsert(&key, *id, *score).await.unwrap();
        }
        FeedReader::new(kind, index)
    }

    async fn reader_with(entries: &[(ContentId, f64)]) -> FeedReader {
        reader_for(FeedKind::ForYou, SUBJECT, entries).await
    }

    async fn example() -> FeedReader {
        reader_with(&[(10, 100.0), (11, 90.0), (12, 80.0)]).await
    }

    #[tokio::test]
    async fn test_first_page_is_newest_first() {
        let reader = example().await;
        let window = reader
            .read(&SUBJECT, &PageRequest::default(), 2)
            .await
            .unwrap();
        assert_eq!(window.ids, vec![10, 11]);
        assert_eq!(window.direction, Direction::Descending);
        assert_eq!(window.newest(), Some(10));
        assert_eq!(window.oldest(), Some(11));
    }

    #[tokio::test]
    async fn test_max_id_continues_below_cursor() {
        let reader = example().await;
        let window = reader
            .read(&SUBJECT, &PageRequest::default().max_id(11), 2)
            .await
            .unwrap();
        assert_eq!(window.ids, vec![12]);
    }

    #[tokio::test]
    async fn test_since_id_stops_above_cursor() {
        let reader = example().await;
        let window = reader
            .read(&SUBJECT, &PageRequest::default().since_id(12), 10)
            .await
            .unwrap();
        assert_eq!(window.ids, vec![10, 11]);
    }

    #[tokio::test]
    async fn test_min_id_returns_next_entry_first() {
        let reader = example().await;
        let window = reader
            .read(&SUBJECT, &PageRequest::default().min_id(12), 1)
            .await
            .unwrap();
        assert_eq!(window.ids, vec![11]);
        assert_eq!(window.direction, Direction::Ascending);
    }

    #[tokio::test]
    async fn test_min_id_respects_max_id() {
        let reader = reader_with(&[(1, 1.0), (2, 2.0), (3, 3.0), (4, 4.0)]).await;
        let page = PageRequest::default().min_id(1).max_id(4).since_id(3);
        let window = reader.read(&SUBJECT, &page, 10).await.unwrap();
        assert_eq!(window.ids, vec![2, 3]);
        assert_eq!(window.oldest(), Some(2));
        assert_eq!(window.newest(), Some(3));
    }

    #[tokio::test]
    async fn test_unknown_cursor_behaves_like_absent() {
        let reader = example().await;
        let with_unknown = reader
            .read(&SUBJECT, &PageRequest::default().max_id(999), 2)
            .await
            .unwrap();
        let without = reader
            .read(&SUBJECT, &PageRequest::default(), 2)
            .await
            .unwrap();
        assert_eq!(with_unknown, without);

        let unknown_min = reader
            .read(&SUBJECT, &PageRequest::default().min_id(999), 2)
            .await
            .unwrap();
        assert_eq!(unknown_min.ids, vec![12, 11]);

        let unknown_since = reader
            .read(&SUBJECT, &PageRequest::default().since_id(999), 5)
            .await
            .unwrap();
        assert_eq!(unknown_since.ids, vec![10, 11, 12]);
    }

    #[tokio::test]
    async fn test_backward_pagination_delivers_each_entry_once() {
        let entries: Vec<(ContentId, f64)> = (1..=23)
            .map(|id| (id, ((id * 7) % 5) as f64))
            .collect();
        let reader = reader_with(&entries).await;

        let mut delivered = Vec::new();
        let mut page = PageRequest::default();
        loop {
            let window = reader.read(&SUBJECT, &page, 4).await.unwrap();
            let Some(oldest) = window.oldest() else { break };
            delivered.extend(window.ids);
            page = PageRequest::default().max_id(oldest);
        }

        let mut expected = entries.clone();
        expected.sort_by(|a, b| b.1.total_cmp(&a.1).then(b.0.cmp(&a.0)));
        let expected: Vec<ContentId> = expected.into_iter().map(|(id, _)| id).collect();
        assert_eq!(delivered, expected);
    }

    #[tokio::test]
    async fn test_offset_read() {
        let entries = [(10, 100.0), (11, 90.0), (12, 80.0)];
        let reader = reader_for(FeedKind::Trending, Subject::Trending, &entries).await;
        assert_eq!(
            reader.read_offset(&Subject::Trending, 1, 5).await.unwrap(),
            vec![11, 12]
        );
        assert_eq!(
            reader.read_offset(&Subject::Trending, usize::MAX, 5).await.unwrap(),
            Vec::<ContentId>::new()
        );
    }

    #[tokio::test]
    async fn test_pagination_style_follows_feed_kind() {
        let timeline = example().await;
        let err = timeline.read_offset(&SUBJECT, 0, 5).await.unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        let trending = reader_for(FeedKind::Trending, Subject::Trending, &[(1, 1.0)]).await;
        let err = trending
            .read(&Subject::Trending, &PageRequest::default(), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));
    }
}
