//! Integration Tests: timeline pagination over the in-memory store
//!
//! Coverage:
//! - Newest-first pages and `max_id` continuation
//! - Every entry delivered exactly once when walking backwards, ties included
//! - `min_id` returns the neighbour of the cursor first
//! - Unknown cursors behave like absent ones
//! - Hydration keeps index order and drops deleted objects
//! - Disabled feeds serve empty pages

mod common;

use common::FakeObjectStore;
use feed_service::config::FeedConfig;
use feed_service::models::{FeedPage, FeedStatus, PageRequest};
use feed_service::services::{Hydrator, TimelineService};
use feed_store::{
    ContentId, FeedKind, MemoryFeedIndex, MemoryRegenerationSignal, SortedFeedIndex, StoreKey,
    Subject,
};
use std::sync::Arc;

const ACCOUNT: u64 = 1;

struct Fixture {
    index: Arc<MemoryFeedIndex>,
    store: Arc<FakeObjectStore>,
    service: TimelineService,
}

async fn fixture(entries: &[(ContentId, f64)], config: FeedConfig) -> Fixture {
    let index = Arc::new(MemoryFeedIndex::new());
    let key = StoreKey::index(FeedKind::ForYou, &Subject::Account(ACCOUNT));
    for (id, score) in entries {
        index.upsert(&key, *id, *score).await.unwrap();
    }
    let store = Arc::new(FakeObjectStore::with_statuses(
        entries.iter().map(|(id, _)| *id),
    ));
    let service = TimelineService::new(
        index.clone(),
        Arc::new(MemoryRegenerationSignal::new()),
        Hydrator::new(store.clone()),
        config,
    );
    Fixture {
        index,
        store,
        service,
    }
}

fn ids(page: &FeedPage) -> Vec<ContentId> {
    page.statuses.iter().map(|s| s.id).collect()
}

#[tokio::test]
async fn test_example_scenario() {
    let f = fixture(
        &[(10, 100.0), (11, 90.0), (12, 80.0)],
        FeedConfig::default(),
    )
    .await;

    let first = f
        .service
        .for_you(ACCOUNT, PageRequest::with_limit(2))
        .await
        .unwrap();
    assert_eq!(ids(&first), vec![10, 11]);
    assert_eq!(first.status.http_status(), 200);

    let second = f
        .service
        .for_you(ACCOUNT, PageRequest::with_limit(2).max_id(11))
        .await
        .unwrap();
    assert_eq!(ids(&second), vec![12]);
}

#[tokio::test]
async fn test_backward_walk_has_no_duplicates_or_gaps() {
    // Many ties: scores cycle through 0..4
    let entries: Vec<(ContentId, f64)> = (1..=37).map(|id| (id, (id % 4) as f64)).collect();
    let f = fixture(&entries, FeedConfig::default()).await;

    let mut delivered = Vec::new();
    let mut request = PageRequest::with_limit(5);
    loop {
        let page = f.service.for_you(ACCOUNT, request).await.unwrap();
        let Some(next) = page.cursors.next_max_id else {
            break;
        };
        delivered.extend(ids(&page));
        request = PageRequest::with_limit(5).max_id(next);
    }

    let mut expected = entries.clone();
    expected.sort_by(|a, b| b.1.total_cmp(&a.1).then(b.0.cmp(&a.0)));
    let expected: Vec<ContentId> = expected.into_iter().map(|(id, _)| id).collect();
    assert_eq!(delivered, expected);
}

#[tokio::test]
async fn test_forward_page_starts_at_neighbour() {
    let f = fixture(
        &[(10, 100.0), (11, 90.0), (12, 80.0), (13, 80.0)],
        FeedConfig::default(),
    )
    .await;

    // 13 sorts above 12 on the score tie
    let page = f
        .service
        .for_you(ACCOUNT, PageRequest::with_limit(1).min_id(12))
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![13]);

    let page = f
        .service
        .for_you(ACCOUNT, PageRequest::with_limit(10).min_id(13))
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![11, 10]);
    assert_eq!(page.cursors.prev_min_id, Some(10));
    assert_eq!(page.cursors.next_max_id, Some(11));
}

#[tokio::test]
async fn test_cursor_never_repeats() {
    let f = fixture(
        &[(1, 5.0), (2, 5.0), (3, 5.0)],
        FeedConfig::default(),
    )
    .await;

    for cursor in [1, 2, 3] {
        let below = f
            .service
            .for_you(ACCOUNT, PageRequest::default().max_id(cursor))
            .await
            .unwrap();
        let above = f
            .service
            .for_you(ACCOUNT, PageRequest::default().min_id(cursor))
            .await
            .unwrap();
        assert!(!ids(&below).contains(&cursor));
        assert!(!ids(&above).contains(&cursor));
        assert_eq!(ids(&below).len() + ids(&above).len(), 2);
    }
}

#[tokio::test]
async fn test_unknown_cursor_is_ignored() {
    let f = fixture(
        &[(10, 100.0), (11, 90.0), (12, 80.0)],
        FeedConfig::default(),
    )
    .await;

    let plain = f
        .service
        .for_you(ACCOUNT, PageRequest::with_limit(2))
        .await
        .unwrap();
    let unknown = f
        .service
        .for_you(ACCOUNT, PageRequest::with_limit(2).max_id(404))
        .await
        .unwrap();
    assert_eq!(plain, unknown);
}

#[tokio::test]
async fn test_deleted_objects_are_dropped_in_order() {
    let f = fixture(
        &[(5, 30.0), (1, 20.0), (9, 10.0)],
        FeedConfig::default(),
    )
    .await;
    f.store.delete(5);

    let page = f
        .service
        .for_you(ACCOUNT, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![1, 9]);
    // Cursors still come from the index window
    assert_eq!(page.cursors.prev_min_id, Some(5));
    assert_eq!(page.cursors.next_max_id, Some(9));
}

#[tokio::test]
async fn test_evicted_cursor_falls_back_to_unbounded() {
    let f = fixture(
        &[(10, 100.0), (11, 90.0), (12, 80.0)],
        FeedConfig::default(),
    )
    .await;
    let key = StoreKey::index(FeedKind::ForYou, &Subject::Account(ACCOUNT));
    f.index.remove(&key, 11).await.unwrap();

    let page = f
        .service
        .for_you(ACCOUNT, PageRequest::default().max_id(11))
        .await
        .unwrap();
    assert_eq!(ids(&page), vec![10, 12]);
}

#[tokio::test]
async fn test_disabled_for_you_serves_empty_page() {
    let config = FeedConfig {
        for_you_enabled: false,
        ..FeedConfig::default()
    };
    let f = fixture(&[(10, 100.0)], config).await;

    let page = f
        .service
        .for_you(ACCOUNT, PageRequest::default())
        .await
        .unwrap();
    assert_eq!(page, FeedPage::empty(FeedStatus::Complete));
}
