//! Redis sorted-set feed index
//!
//! Members are stored as zero-padded 20-digit decimals so the lexicographic
//! order Redis applies to equal scores matches numeric id order. A cursor's
//! equal-score neighbours are read in the same transaction as the rest of the
//! window and filtered client-side against the composite `(score, id)` cursor.

use crate::index::{validate_score, Direction, Entry, Position, RangeQuery, SortedFeedIndex};
use crate::{Bound, ContentId, StoreError, StoreKey, StoreMetrics, StoreResult};
use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::debug;

pub(crate) fn encode_member(id: ContentId) -> String {
    format!("{:020}", id)
}

pub(crate) fn decode_member(member: &str) -> StoreResult<ContentId> {
    member
        .parse()
        .map_err(|_| StoreError::InvalidMember(member.to_string()))
}

/// Score argument for ZRANGEBYSCORE / ZREVRANGEBYSCORE
pub(crate) fn score_arg(bound: &Bound, unbounded: &'static str) -> String {
    match bound {
        Bound::Unbounded => unbounded.to_string(),
        Bound::Exclusive(position) => position.score.to_string(),
    }
}

/// Score argument excluding `score` itself
pub(crate) fn exclusive_score_arg(score: f64) -> String {
    format!("({}", score)
}

/// Inclusive ZREVRANGE indices for a rank window; `None` when `offset` lies
/// beyond anything Redis can address. Negative indices count from the tail,
/// so neither bound may wrap.
pub(crate) fn rank_bounds(offset: usize, limit: usize) -> Option<(isize, isize)> {
    if limit == 0 || offset > isize::MAX as usize {
        return None;
    }
    let stop = offset.saturating_add(limit - 1).min(isize::MAX as usize);
    Some((offset as isize, stop as isize))
}

/// Apply the composite boundaries to rows fetched with inclusive scores
pub(crate) fn collect_window(
    rows: Vec<(String, f64)>,
    query: &RangeQuery,
) -> StoreResult<Vec<ContentId>> {
    let mut ids = Vec::with_capacity(query.limit.min(rows.len()));
    for (member, score) in rows {
        let id = decode_member(&member)?;
        if query.contains(&Position::new(score, id)) {
            ids.push(id);
            if ids.len() == query.limit {
                break;
            }
        }
    }
    Ok(ids)
}

/// Feed index backed by Redis sorted sets
#[derive(Clone)]
pub struct RedisFeedIndex {
    conn: ConnectionManager,
    metrics: StoreMetrics,
}

impl RedisFeedIndex {
    pub fn new(conn: ConnectionManager) -> Self {
        Self {
            conn,
            metrics: StoreMetrics::new(),
        }
    }

    fn scored_members(entries: &[Entry]) -> StoreResult<Vec<(f64, String)>> {
        entries
            .iter()
            .map(|e| Ok((validate_score(e.score)?, encode_member(e.id))))
            .collect()
    }
}

#[async_trait]
impl SortedFeedIndex for RedisFeedIndex {
    async fn upsert(&self, key: &StoreKey, id: ContentId, score: f64) -> StoreResult<()> {
        let score = validate_score(score)?;
        let mut conn = self.conn.clone();
        conn.zadd::<_, _, _, ()>(key.as_str(), encode_member(id), score)
            .await
            .map_err(|e| self.metrics.record_error("upsert", e))?;

        self.metrics.record_write("upsert");
        Ok(())
    }

    async fn upsert_many(&self, key: &StoreKey, entries: &[Entry]) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let items = Self::scored_members(entries)?;
        let mut conn = self.conn.clone();
        conn.zadd_multiple::<_, _, _, ()>(key.as_str(), &items)
            .await
            .map_err(|e| self.metrics.record_error("upsert_many", e))?;

        debug!(key = %key, count = items.len(), "Index batch upsert");
        self.metrics.record_write("upsert_many");
        Ok(())
    }

    async fn remove(&self, key: &StoreKey, id: ContentId) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        conn.zrem::<_, _, ()>(key.as_str(), encode_member(id))
            .await
            .map_err(|e| self.metrics.record_error("remove", e))?;

        self.metrics.record_write("remove");
        Ok(())
    }

    async fn remove_many(&self, key: &StoreKey, ids: &[ContentId]) -> StoreResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let members: Vec<String> = ids.iter().map(|id| encode_member(*id)).collect();
        let mut conn = self.conn.clone();
        conn.zrem::<_, _, ()>(key.as_str(), members)
            .await
            .map_err(|e| self.metrics.record_error("remove_many", e))?;

        debug!(key = %key, count = ids.len(), "Index batch remove");
        self.metrics.record_write("remove_many");
        Ok(())
    }

    async fn rank(&self, key: &StoreKey, id: ContentId) -> StoreResult<Option<usize>> {
        let mut conn = self.conn.clone();
        let rank: Option<usize> = conn
            .zrank(key.as_str(), encode_member(id))
            .await
            .map_err(|e| self.metrics.record_error("rank", e))?;

        self.metrics.record_read("rank");
        Ok(rank)
    }

    async fn score(&self, key: &StoreKey, id: ContentId) -> StoreResult<Option<f64>> {
        let mut conn = self.conn.clone();
        let score: Option<f64> = conn
            .zscore(key.as_str(), encode_member(id))
            .await
            .map_err(|e| self.metrics.record_error("score", e))?;

        self.metrics.record_read("score");
        Ok(score)
    }

    async fn range(&self, key: &StoreKey, query: &RangeQuery) -> StoreResult<Vec<ContentId>> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        let mut conn = self.conn.clone();
        let fetch = query.limit.min(isize::MAX as usize) as isize;
        let min = score_arg(&query.lower, "-inf");
        let max = score_arg(&query.upper, "+inf");

        let rows: Vec<(String, f64)> = match query.leading_bound() {
            Bound::Unbounded => match query.direction {
                Direction::Descending => {
                    conn.zrevrangebyscore_limit_withscores(key.as_str(), max, min, 0, fetch)
                        .await
                }
                Direction::Ascending => {
                    conn.zrangebyscore_limit_withscores(key.as_str(), min, max, 0, fetch)
                        .await
                }
            }
            .map_err(|e| self.metrics.record_error("range", e))?,
            // Entries sharing the leading boundary's score may sit on either
            // side of the cursor. Read them in full alongside the strictly
            // beyond part in one MULTI/EXEC and filter below.
            Bound::Exclusive(position) => {
                let tie = position.score;
                let beyond = exclusive_score_arg(tie);
                let mut pipe = redis::pipe();
                pipe.atomic();
                match query.direction {
                    Direction::Descending => pipe
                        .zrevrangebyscore_withscores(key.as_str(), tie, tie)
                        .zrevrangebyscore_limit_withscores(key.as_str(), beyond, min, 0, fetch),
                    Direction::Ascending => pipe
                        .zrangebyscore_withscores(key.as_str(), tie, tie)
                        .zrangebyscore_limit_withscores(key.as_str(), beyond, max, 0, fetch),
                };
                let (ties, rest): (Vec<(String, f64)>, Vec<(String, f64)>) = pipe
                    .query_async(&mut conn)
                    .await
                    .map_err(|e| self.metrics.record_error("range", e))?;
                ties.into_iter().chain(rest).collect()
            }
        };

        self.metrics.record_read("range");
        collect_window(rows, query)
    }

    async fn rank_window(
        &self,
        key: &StoreKey,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<ContentId>> {
        let Some((start, stop)) = rank_bounds(offset, limit) else {
            return Ok(Vec::new());
        };
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn
            .zrevrange(key.as_str(), start, stop)
            .await
            .map_err(|e| self.metrics.record_error("rank_window", e))?;

        self.metrics.record_read("rank_window");
        members.iter().map(|m| decode_member(m)).collect()
    }

    async fn entries(&self, key: &StoreKey) -> StoreResult<Vec<Entry>> {
        let mut conn = self.conn.clone();
        let rows: Vec<(String, f64)> = conn
            .zrange_withscores(key.as_str(), 0, -1)
            .await
            .map_err(|e| self.metrics.record_error("entries", e))?;

        self.metrics.record_read("entries");
        rows.into_iter()
            .map(|(member, score)| Ok(Entry::new(decode_member(&member)?, score)))
            .collect()
    }

    async fn replace(&self, key: &StoreKey, entries: &[Entry]) -> StoreResult<()> {
        let items = Self::scored_members(entries)?;
        let staging = key.staging();

        // MULTI/EXEC: build the staging set, then RENAME it over the live key
        let mut pipe = redis::pipe();
        pipe.atomic();
        if items.is_empty() {
            pipe.del(key.as_str()).ignore();
        } else {
            pipe.del(staging.as_str())
                .ignore()
                .zadd_multiple(staging.as_str(), &items)
                .ignore()
                .rename(staging.as_str(), key.as_str())
                .ignore();
        }

        let mut conn = self.conn.clone();
        pipe.query_async::<_, ()>(&mut conn)
            .await
            .map_err(|e| self.metrics.record_error("replace", e))?;

        debug!(key = %key, count = items.len(), "Index replaced");
        self.metrics.record_write("replace");
        Ok(())
    }

    async fn len(&self, key: &StoreKey) -> StoreResult<usize> {
        let mut conn = self.conn.clone();
        let len: usize = conn
            .zcard(key.as_str())
            .await
            .map_err(|e| self.metrics.record_error("len", e))?;
        Ok(len)
    }

    async fn trim(&self, key: &StoreKey, capacity: usize) -> StoreResult<usize> {
        let len = self.len(key).await?;
        if len <= capacity {
            return Ok(0);
        }
        let excess = len - capacity;
        let mut conn = self.conn.clone();
        let removed: usize = conn
            .zremrangebyrank(key.as_str(), 0, excess as isize - 1)
            .await
            .map_err(|e| self.metrics.record_error("trim", e))?;

        debug!(key = %key, removed, capacity, "Index trimmed");
        self.metrics.record_write("trim");
        Ok(removed)
    }
}
