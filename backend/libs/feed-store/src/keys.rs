//! Typed store key schema
//!
//! Every key the feed services touch is built here, never with ad-hoc
//! `format!` calls at the call site.
//! Key format: v{VERSION}:{namespace}:{...}

use serde::{Deserialize, Serialize};
use std::fmt;

/// Key schema version - increment when changing key formats
pub const KEY_VERSION: u32 = 1;

/// Identifier of a content object (snowflake-style status id)
pub type ContentId = u64;

/// Feed variants served from a precomputed index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedKind {
    /// Recency-ordered home timeline
    Home,
    /// Personalized ranking
    ForYou,
    /// Shared trending bucket fed from an external source
    Trending,
}

impl FeedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedKind::Home => "home",
            FeedKind::ForYou => "for_you",
            FeedKind::Trending => "trending",
        }
    }

    /// Trending pages are addressed by rank offset; the timelines by id cursors.
    pub fn uses_offset_pagination(&self) -> bool {
        matches!(self, FeedKind::Trending)
    }
}

impl fmt::Display for FeedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The entity a feed is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subject {
    Account(u64),
    Trending,
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Subject::Account(id) => write!(f, "account:{}", id),
            Subject::Trending => f.write_str("trending"),
        }
    }
}

/// A fully built store key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey(String);

impl StoreKey {
    // ============= Feed Index Keys =============

    /// Sorted feed index
    /// Format: v1:feed:{kind}:{subject}
    pub fn index(kind: FeedKind, subject: &Subject) -> Self {
        Self(format!("v{}:feed:{}:{}", KEY_VERSION, kind, subject))
    }

    /// Staging copy used for atomic swaps of an index
    /// Format: v1:feed:{kind}:{subject}:staging
    pub fn staging(&self) -> Self {
        Self(format!("{}:staging", self.0))
    }

    // ============= Regeneration Signal =============

    /// In-flight recompute flag
    /// Format: v1:regen:{subject}
    pub fn regeneration(subject: &Subject) -> Self {
        Self(format!("v{}:regen:{}", KEY_VERSION, subject))
    }

    // ============= Status Keys =============

    /// Cached status object
    /// Format: v1:status:{id}
    pub fn status(id: ContentId) -> Self {
        Self(format!("v{}:status:{}", KEY_VERSION, id))
    }

    /// External reference (uri/url) to local status id
    /// Format: v1:status:uri:{uri}
    pub fn status_uri(uri: &str) -> Self {
        Self(format!("v{}:status:uri:{}", KEY_VERSION, uri))
    }

    /// Per-process sequence used for the low bits of new status ids
    pub fn status_sequence() -> Self {
        Self(format!("v{}:status:sequence", KEY_VERSION))
    }

    // ============= Account Keys =============

    /// Accounts ordered by last activity
    /// Format: v1:accounts:active
    pub fn active_accounts() -> Self {
        Self(format!("v{}:accounts:active", KEY_VERSION))
    }

    // ============= Utility =============

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StoreKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
