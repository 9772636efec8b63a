use chrono::{DateTime, Utc};
use feed_store::ContentId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Local content object served in feeds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    pub id: ContentId,
    /// Canonical external reference (ActivityPub uri or public url)
    pub uri: String,
    #[serde(default)]
    pub url: Option<String>,
    pub account: StatusAccount,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub replies_count: u32,
    #[serde(default)]
    pub reblogs_count: u32,
    #[serde(default)]
    pub favourites_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusAccount {
    pub username: String,
    /// `None` for local accounts
    #[serde(default)]
    pub domain: Option<String>,
}

/// Status payload as returned by a remote instance API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteStatus {
    pub id: String,
    pub uri: String,
    #[serde(default)]
    pub url: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub content: String,
    pub account: RemoteAccount,
    #[serde(default)]
    pub replies_count: u32,
    #[serde(default)]
    pub reblogs_count: u32,
    #[serde(default)]
    pub favourites_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAccount {
    pub username: String,
    /// `user@domain` for remote accounts, bare username for local ones
    pub acct: String,
}

impl RemoteStatus {
    /// Reference used to resolve the status locally
    pub fn reference(&self) -> &str {
        self.url.as_deref().unwrap_or(&self.uri)
    }

    pub fn to_local(&self, id: ContentId) -> Status {
        let domain = self
            .account
            .acct
            .split_once('@')
            .map(|(_, domain)| domain.to_string());
        Status {
            id,
            uri: self.uri.clone(),
            url: self.url.clone(),
            account: StatusAccount {
                username: self.account.username.clone(),
                domain,
            },
            content: self.content.clone(),
            created_at: self.created_at,
            replies_count: self.replies_count,
            reblogs_count: self.reblogs_count,
            favourites_count: self.favourites_count,
        }
    }
}

/// One candidate produced by an external trend source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendCandidate {
    /// External reference to resolve (status url)
    pub reference: String,
    /// Source-provided score; position order is used when absent
    #[serde(default)]
    pub external_score: Option<f64>,
    #[serde(default)]
    pub remote: Option<RemoteStatus>,
}

impl From<RemoteStatus> for TrendCandidate {
    fn from(status: RemoteStatus) -> Self {
        Self {
            reference: status.reference().to_string(),
            external_score: None,
            remote: Some(status),
        }
    }
}

/// Candidate status with engagement aggregates for one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedCandidate {
    pub status_id: ContentId,
    pub author_username: String,
    #[serde(default)]
    pub author_domain: String,
    #[serde(default)]
    pub aggregates: HashMap<String, i64>,
}

impl AggregatedCandidate {
    /// Author identity used for down-ranking
    pub fn author_key(&self) -> String {
        format!("{}@{}", self.author_username, self.author_domain)
    }
}

/// Candidate with its computed rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    pub rank: f64,
    pub candidate: AggregatedCandidate,
}

/// Pagination parameters for a score-window timeline page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageRequest {
    pub limit: Option<usize>,
    pub max_id: Option<ContentId>,
    pub since_id: Option<ContentId>,
    pub min_id: Option<ContentId>,
}

impl PageRequest {
    pub fn new(
        limit: Option<usize>,
        max_id: Option<ContentId>,
        since_id: Option<ContentId>,
        min_id: Option<ContentId>,
    ) -> Self {
        Self {
            limit,
            max_id,
            since_id,
            min_id,
        }
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    pub fn max_id(mut self, id: ContentId) -> Self {
        self.max_id = Some(id);
        self
    }

    pub fn since_id(mut self, id: ContentId) -> Self {
        self.since_id = Some(id);
        self
    }

    pub fn min_id(mut self, id: ContentId) -> Self {
        self.min_id = Some(id);
        self
    }

    /// Requested limit clamped to `[1, max]`, `default` when absent
    pub fn effective_limit(&self, default: usize, max: usize) -> usize {
        let max = max.max(1);
        self.limit.unwrap_or(default).clamp(1, max)
    }
}

/// Whether the page reflects a finished computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    Complete,
    /// A recompute is in flight; content may be incomplete
    Regenerating,
}

impl FeedStatus {
    pub fn from_regenerating(regenerating: bool) -> Self {
        if regenerating {
            FeedStatus::Regenerating
        } else {
            FeedStatus::Complete
        }
    }

    /// 206 while regenerating, 200 otherwise
    pub fn http_status(&self) -> u16 {
        match self {
            FeedStatus::Complete => 200,
            FeedStatus::Regenerating => 206,
        }
    }
}

/// Identifiers the request layer turns into next/prev links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaginationCursors {
    /// Older page: pass as `max_id`
    pub next_max_id: Option<ContentId>,
    /// Newer page: pass as `min_id`
    pub prev_min_id: Option<ContentId>,
}

/// Offsets the request layer turns into next/prev links for trending pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OffsetCursors {
    pub next_offset: Option<usize>,
    pub prev_offset: Option<usize>,
}

/// Hydrated timeline page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPage {
    pub statuses: Vec<Status>,
    pub status: FeedStatus,
    pub cursors: PaginationCursors,
}

impl FeedPage {
    pub fn empty(status: FeedStatus) -> Self {
        Self {
            statuses: Vec::new(),
            status,
            cursors: PaginationCursors::default(),
        }
    }
}

/// Hydrated trending page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendingPage {
    pub statuses: Vec<Status>,
    pub status: FeedStatus,
    pub cursors: OffsetCursors,
}

impl TrendingPage {
    pub fn empty() -> Self {
        Self {
            statuses: Vec::new(),
            status: FeedStatus::Complete,
            cursors: OffsetCursors::default(),
        }
    }
}
