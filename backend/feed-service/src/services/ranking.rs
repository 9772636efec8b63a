//! Candidate ranking
//!
//! For You scores are a weighted sum of per-candidate engagement aggregates,
//! followed by an author down-ranking pass so one prolific author cannot
//! fill the feed. Home is pure recency.

use crate::clients::CandidateSource;
use crate::error::{AppError, Result};
use crate::models::{AggregatedCandidate, RankedCandidate};
use crate::services::precompute::{dedupe_entries, FeedSource};
use async_trait::async_trait;
use feed_store::{Entry, FeedKind, Subject};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Factor applied to every further candidate of an already-seen author
pub const AUTHOR_DOWNRANK_COEFFICIENT: f64 = 0.75;

/// Weight per aggregate feature. Features not listed weigh nothing.
pub const AGGREGATE_WEIGHTS: &[(&str, f64)] = &[
    // statuses by the author the account liked
    ("account_liked_author_status_count", 10.0),
    ("account_liked_status_count", 0.0),
    // liked statuses sharing a tag with the candidate
    ("account_liked_tag_status_count", 10.0),
    ("account_rebloged_author_status_count", 30.0),
    ("account_rebloged_status_count", 0.0),
    ("account_rebloged_tag_status_count", 20.0),
    ("author_follower_count", 0.004),
    // engagement on the author's last 20 statuses
    ("author_like_count", 0.4),
    ("author_reblog_count", 0.8),
    ("author_reply_count", 0.6),
    ("candidate_status_like_count", 1.0),
    ("candidate_status_reblog_count", 2.0),
    ("candidate_status_reply_count", 1.5),
    // 0..1000 similarity against the account's average liked/reblogged embedding
    ("average_like_embedding_similarity", 2.0),
    ("average_reblog_embedding_similarity", 3.0),
    ("account_liked_status_with_similar_embedding", 8.0),
    ("account_rebloged_status_with_similar_embedding", 15.0),
];

#[derive(Debug, Clone)]
pub struct CandidateRanker {
    weights: HashMap<String, f64>,
    author_decay: f64,
}

impl Default for CandidateRanker {
    fn default() -> Self {
        Self::new(
            AGGREGATE_WEIGHTS
                .iter()
                .map(|(feature, weight)| (feature.to_string(), *weight))
                .collect(),
            AUTHOR_DOWNRANK_COEFFICIENT,
        )
    }
}

impl CandidateRanker {
    pub fn new(weights: HashMap<String, f64>, author_decay: f64) -> Self {
        Self {
            weights,
            author_decay,
        }
    }

    /// Weighted sum of the candidate's aggregates
    pub fn score(&self, candidate: &AggregatedCandidate) -> f64 {
        candidate
            .aggregates
            .iter()
            .filter_map(|(feature, value)| {
                self.weights
                    .get(feature)
                    .map(|weight| weight * *value as f64)
            })
            .sum()
    }

    /// Score and down-rank, strongest candidate first
    pub fn rank(&self, candidates: Vec<AggregatedCandidate>) -> Vec<RankedCandidate> {
        let ranked = candidates
            .into_iter()
            .map(|candidate| RankedCandidate {
                rank: self.score(&candidate),
                candidate,
            })
            .collect();
        self.downrank_authors(ranked)
    }

    /// The first (strongest) candidate of an author keeps its rank; each
    /// later one is multiplied by a per-author factor that shrinks by
    /// `author_decay` after every use.
    pub fn downrank_authors(&self, mut ranked: Vec<RankedCandidate>) -> Vec<RankedCandidate> {
        ranked.sort_by(|a, b| {
            b.rank
                .total_cmp(&a.rank)
                .then_with(|| b.candidate.status_id.cmp(&a.candidate.status_id))
        });

        let mut factors: HashMap<String, f64> = HashMap::new();
        for candidate in ranked.iter_mut() {
            let author = candidate.candidate.author_key();
            match factors.get_mut(&author) {
                Some(factor) => {
                    candidate.rank *= *factor;
                    *factor *= self.author_decay;
                }
                None => {
                    factors.insert(author, self.author_decay);
                }
            }
        }
        ranked
    }
}

/// Index entries for ranked candidates, one per status
pub fn to_entries(ranked: &[RankedCandidate]) -> Vec<Entry> {
    dedupe_entries(
        ranked
            .iter()
            .map(|r| Entry::new(r.candidate.status_id, r.rank))
            .collect(),
    )
}

fn account_of(subject: &Subject, kind: FeedKind) -> Result<u64> {
    match subject {
        Subject::Account(id) => Ok(*id),
        other => Err(AppError::Internal(format!(
            "{} feeds are per account, got {}",
            kind, other
        ))),
    }
}

/// Home feed: candidates ordered by recency.
///
/// Snowflake ids are time-ordered, so the id is the score. Ids above 2^53
/// round when widened to `f64`, but rounding is monotonic and ties fall back
/// to the id, so index order still equals id order.
pub struct RecencySource {
    candidates: Arc<dyn CandidateSource>,
    limit: usize,
}

impl RecencySource {
    pub fn new(candidates: Arc<dyn CandidateSource>, limit: usize) -> Self {
        Self { candidates, limit }
    }
}

#[async_trait]
impl FeedSource for RecencySource {
    fn kind(&self) -> FeedKind {
        FeedKind::Home
    }

    async fn compute(&self, subject: &Subject) -> Result<Vec<Entry>> {
        let account_id = account_of(subject, FeedKind::Home)?;
        let candidates = self.candidates.candidates(account_id, self.limit).await?;
        Ok(dedupe_entries(
            candidates
                .iter()
                .map(|c| Entry::new(c.status_id, c.status_id as f64))
                .collect(),
        ))
    }
}

/// For You feed: weighted and author-down-ranked candidates
pub struct RankedSource {
    candidates: Arc<dyn CandidateSource>,
    ranker: CandidateRanker,
    limit: usize,
}

impl RankedSource {
    pub fn new(candidates: Arc<dyn CandidateSource>, ranker: CandidateRanker, limit: usize) -> Self {
        Self {
            candidates,
            ranker,
            limit,
        }
    }
}

#[async_trait]
impl FeedSource for RankedSource {
    fn kind(&self) -> FeedKind {
        FeedKind::ForYou
    }

    async fn compute(&self, subject: &Subject) -> Result<Vec<Entry>> {
        let account_id = account_of(subject, FeedKind::ForYou)?;
        let candidates = self.candidates.candidates(account_id, self.limit).await?;
        let total = candidates.len();
        let ranked = self.ranker.rank(candidates);

        debug!(account_id, candidates = total, "Ranked candidates");
        Ok(to_entries(&ranked))
    }
}
