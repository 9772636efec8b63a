//! Shared fakes for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use feed_service::clients::{CandidateSource, ObjectStore, TrendSource};
use feed_service::error::{AppError, Result};
use feed_service::models::{
    AggregatedCandidate, RemoteAccount, RemoteStatus, Status, StatusAccount, TrendCandidate,
};
use feed_store::ContentId;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

pub fn status(id: ContentId) -> Status {
    Status {
        id,
        uri: format!("https://local.example/statuses/{}", id),
        url: None,
        account: StatusAccount {
            username: "ana".into(),
            domain: None,
        },
        content: format!("status {}", id),
        created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        replies_count: 0,
        reblogs_count: 0,
        favourites_count: 0,
    }
}

pub fn remote(reference: &str) -> TrendCandidate {
    TrendCandidate::from(RemoteStatus {
        id: reference.rsplit('/').next().unwrap_or_default().to_string(),
        uri: reference.to_string(),
        url: Some(reference.to_string()),
        created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        content: String::new(),
        account: RemoteAccount {
            username: "bo".into(),
            acct: "bo@remote.example".into(),
        },
        replies_count: 0,
        reblogs_count: 0,
        favourites_count: 0,
    })
}

/// Object store over a map; references resolve through `refs`, unknown
/// references with a remote payload get the next local id.
#[derive(Default)]
pub struct FakeObjectStore {
    objects: Mutex<HashMap<ContentId, Status>>,
    refs: Mutex<HashMap<String, ContentId>>,
    failing: HashSet<String>,
    next_id: Mutex<ContentId>,
}

impl FakeObjectStore {
    pub fn with_statuses(ids: impl IntoIterator<Item = ContentId>) -> Self {
        let store = Self {
            next_id: Mutex::new(1_000),
            ..Self::default()
        };
        for id in ids {
            store.objects.lock().unwrap().insert(id, status(id));
        }
        store
    }

    pub fn failing_on(mut self, reference: &str) -> Self {
        self.failing.insert(reference.to_string());
        self
    }

    pub fn delete(&self, id: ContentId) {
        self.objects.lock().unwrap().remove(&id);
    }
}

#[async_trait]
impl ObjectStore for FakeObjectStore {
    async fn bulk_fetch(&self, ids: &[ContentId]) -> Result<Vec<Status>> {
        let objects = self.objects.lock().unwrap();
        // Reverse so callers cannot rely on request order
        Ok(ids
            .iter()
            .rev()
            .filter_map(|id| objects.get(id).cloned())
            .collect())
    }

    async fn resolve_or_create(&self, candidate: &TrendCandidate) -> Result<Option<ContentId>> {
        if self.failing.contains(&candidate.reference) {
            return Err(AppError::Upstream("remote instance unreachable".into()));
        }
        if let Some(id) = self.refs.lock().unwrap().get(&candidate.reference) {
            return Ok(Some(*id));
        }
        let Some(remote) = &candidate.remote else {
            return Ok(None);
        };

        let id = {
            let mut next = self.next_id.lock().unwrap();
            *next += 1;
            *next
        };
        self.objects.lock().unwrap().insert(id, remote.to_local(id));
        self.refs
            .lock()
            .unwrap()
            .insert(candidate.reference.clone(), id);
        Ok(Some(id))
    }
}

pub struct FakeTrendSource {
    pub candidates: Vec<TrendCandidate>,
}

#[async_trait]
impl TrendSource for FakeTrendSource {
    async fn fetch_page(&self, limit: usize, offset: usize) -> Result<Vec<TrendCandidate>> {
        Ok(self
            .candidates
            .iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct FakeCandidates {
    pub by_account: HashMap<u64, Vec<AggregatedCandidate>>,
}

#[async_trait]
impl CandidateSource for FakeCandidates {
    async fn candidates(&self, account_id: u64, limit: usize) -> Result<Vec<AggregatedCandidate>> {
        Ok(self
            .by_account
            .get(&account_id)
            .map(|candidates| candidates.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }
}

pub fn aggregated(id: ContentId, author: &str, likes: i64) -> AggregatedCandidate {
    AggregatedCandidate {
        status_id: id,
        author_username: author.to_string(),
        author_domain: "remote.example".to_string(),
        aggregates: HashMap::from([("candidate_status_like_count".to_string(), likes)]),
    }
}
