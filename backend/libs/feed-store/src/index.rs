//! Sorted feed index contract
//!
//! A per-key ordered set of `(score, id)` entries. Ordering is total:
//! ascending by score, ties broken by identifier value. Range queries take
//! exclusive composite boundaries so a cursor's own entry never reappears and
//! equal-score neighbours of a cursor are neither skipped nor repeated.

use crate::{ContentId, StoreError, StoreKey, StoreResult};
use async_trait::async_trait;
use std::cmp::Ordering;

/// A scored index entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Entry {
    pub id: ContentId,
    pub score: f64,
}

impl Entry {
    pub fn new(id: ContentId, score: f64) -> Self {
        Self { id, score }
    }

    pub fn position(&self) -> Position {
        Position::new(self.score, self.id)
    }
}

/// Location of an entry in the total order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub score: f64,
    pub id: ContentId,
}

impl Position {
    pub fn new(score: f64, id: ContentId) -> Self {
        Self { score, id }
    }

    /// Total order over positions. Scores are validated finite before they
    /// are stored, so `total_cmp` agrees with numeric order.
    pub fn order(&self, other: &Position) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// One side of a range window
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    Unbounded,
    Exclusive(Position),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Range-by-score window with a result limit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangeQuery {
    pub lower: Bound,
    pub upper: Bound,
    pub limit: usize,
    pub direction: Direction,
}

impl RangeQuery {
    /// Newest-first window walking down from `upper`
    pub fn descending(upper: Bound, lower: Bound, limit: usize) -> Self {
        Self {
            lower,
            upper,
            limit,
            direction: Direction::Descending,
        }
    }

    /// Oldest-first window walking up from `lower`
    pub fn ascending(lower: Bound, upper: Bound, limit: usize) -> Self {
        Self {
            lower,
            upper,
            limit,
            direction: Direction::Ascending,
        }
    }

    /// Whether a position lies strictly inside both boundaries
    pub fn contains(&self, position: &Position) -> bool {
        let above_lower = match &self.lower {
            Bound::Unbounded => true,
            Bound::Exclusive(b) => position.order(b) == Ordering::Greater,
        };
        let below_upper = match &self.upper {
            Bound::Unbounded => true,
            Bound::Exclusive(b) => position.order(b) == Ordering::Less,
        };
        above_lower && below_upper
    }

    /// The boundary the walk starts from
    pub fn leading_bound(&self) -> &Bound {
        match self.direction {
            Direction::Ascending => &self.lower,
            Direction::Descending => &self.upper,
        }
    }
}

/// Reject scores that cannot take part in a total order.
/// Negative zero is folded into zero so both compare equal.
pub fn validate_score(score: f64) -> StoreResult<f64> {
    if !score.is_finite() {
        return Err(StoreError::InvalidScore(score));
    }
    Ok(score + 0.0)
}

/// Score-ordered feed index operations
#[async_trait]
pub trait SortedFeedIndex: Send + Sync {
    /// Insert or move an entry. Idempotent for an identical `(id, score)`.
    async fn upsert(&self, key: &StoreKey, id: ContentId, score: f64) -> StoreResult<()>;

    /// Upsert a batch of entries
    async fn upsert_many(&self, key: &StoreKey, entries: &[Entry]) -> StoreResult<()>;

    /// Remove an entry; no-op when absent
    async fn remove(&self, key: &StoreKey, id: ContentId) -> StoreResult<()>;

    /// Remove a batch of entries
    async fn remove_many(&self, key: &StoreKey, ids: &[ContentId]) -> StoreResult<()>;

    /// Zero-based ascending rank
    async fn rank(&self, key: &StoreKey, id: ContentId) -> StoreResult<Option<usize>>;

    async fn score(&self, key: &StoreKey, id: ContentId) -> StoreResult<Option<f64>>;

    /// Cursor boundary for an identifier
    async fn position(&self, key: &StoreKey, id: ContentId) -> StoreResult<Option<Position>> {
        Ok(self
            .score(key, id)
            .await?
            .map(|score| Position::new(score, id)))
    }

    /// Exclusive window query, truncated to `query.limit`
    async fn range(&self, key: &StoreKey, query: &RangeQuery) -> StoreResult<Vec<ContentId>>;

    /// Highest-scored entries by rank offset (descending)
    async fn rank_window(
        &self,
        key: &StoreKey,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<ContentId>>;

    /// Full contents in ascending order
    async fn entries(&self, key: &StoreKey) -> StoreResult<Vec<Entry>>;

    /// Atomically replace the contents; readers see old or new, never a mix
    async fn replace(&self, key: &StoreKey, entries: &[Entry]) -> StoreResult<()>;

    async fn len(&self, key: &StoreKey) -> StoreResult<usize>;

    /// Drop the lowest-scored entries beyond `capacity`; returns how many
    async fn trim(&self, key: &StoreKey, capacity: usize) -> StoreResult<usize>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_ties_break_by_id() {
        let a = Position::new(10.0, 1);
        let b = Position::new(10.0, 2);
        assert_eq!(a.order(&b), Ordering::Less);
        assert_eq!(b.order(&a), Ordering::Greater);
        assert_eq!(a.order(&a), Ordering::Equal);
    }

    #[test]
    fn test_query_excludes_boundaries() {
        let cursor = Position::new(90.0, 11);
        let query = RangeQuery::descending(Bound::Exclusive(cursor), Bound::Unbounded, 10);
        assert!(!query.contains(&cursor));
        assert!(query.contains(&Position::new(80.0, 12)));
        assert!(query.contains(&Position::new(90.0, 10)));
        assert!(!query.contains(&Position::new(90.0, 12)));
        assert!(!query.contains(&Position::new(100.0, 1)));
    }

    #[test]
    fn test_leading_bound() {
        let hi = Bound::Exclusive(Position::new(5.0, 5));
        let query = RangeQuery::descending(hi, Bound::Unbounded, 1);
        assert_eq!(query.leading_bound(), &hi);

        let query = RangeQuery::ascending(Bound::Unbounded, hi, 1);
        assert_eq!(query.leading_bound(), &Bound::Unbounded);
    }

    #[test]
    fn test_validate_score() {
        assert!(validate_score(f64::NAN).is_err());
        assert!(validate_score(f64::INFINITY).is_err());
        assert!(validate_score(f64::NEG_INFINITY).is_err());
        let zero = validate_score(-0.0).unwrap();
        assert_eq!(zero.total_cmp(&0.0), Ordering::Equal);
        assert_eq!(validate_score(1.5).unwrap(), 1.5);
    }
}
