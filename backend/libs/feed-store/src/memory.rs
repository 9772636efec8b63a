//! In-process feed index and regeneration signal
//!
//! Used for local development, single-node deployments and tests. Each key
//! owns a sorted vector of positions plus an id -> score map behind its own
//! read/write lock, so keys never contend with each other and a reader never
//! observes a half-applied entry.

use crate::index::{validate_score, Direction, Entry, Position, RangeQuery, SortedFeedIndex};
use crate::signal::RegenerationSignal;
use crate::{Bound, ContentId, StoreKey, StoreResult, Subject};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct SortedEntries {
    ordered: Vec<Position>,
    scores: HashMap<ContentId, f64>,
}

impl SortedEntries {
    fn from_entries(entries: &[Entry]) -> StoreResult<Self> {
        let mut sorted = Self::default();
        for entry in entries {
            sorted.upsert(entry.id, validate_score(entry.score)?);
        }
        Ok(sorted)
    }

    fn locate(&self, position: &Position) -> Result<usize, usize> {
        self.ordered.binary_search_by(|entry| entry.order(position))
    }

    fn upsert(&mut self, id: ContentId, score: f64) {
        if let Some(&current) = self.scores.get(&id) {
            if current.total_cmp(&score) == Ordering::Equal {
                return;
            }
            if let Ok(idx) = self.locate(&Position::new(current, id)) {
                self.ordered.remove(idx);
            }
        }
        let position = Position::new(score, id);
        let idx = self.locate(&position).unwrap_or_else(|idx| idx);
        self.ordered.insert(idx, position);
        self.scores.insert(id, score);
    }

    fn remove(&mut self, id: ContentId) {
        if let Some(score) = self.scores.remove(&id) {
            if let Ok(idx) = self.locate(&Position::new(score, id)) {
                self.ordered.remove(idx);
            }
        }
    }

    fn rank(&self, id: ContentId) -> Option<usize> {
        let score = *self.scores.get(&id)?;
        self.locate(&Position::new(score, id)).ok()
    }

    fn range(&self, query: &RangeQuery) -> Vec<ContentId> {
        let start = match &query.lower {
            Bound::Unbounded => 0,
            Bound::Exclusive(b) => self
                .ordered
                .partition_point(|p| p.order(b) != Ordering::Greater),
        };
        let end = match &query.upper {
            Bound::Unbounded => self.ordered.len(),
            Bound::Exclusive(b) => self.ordered.partition_point(|p| p.order(b) == Ordering::Less),
        };
        if start >= end {
            return Vec::new();
        }

        let window = &self.ordered[start..end];
        match query.direction {
            Direction::Ascending => window.iter().take(query.limit).map(|p| p.id).collect(),
            Direction::Descending => window
                .iter()
                .rev()
                .take(query.limit)
                .map(|p| p.id)
                .collect(),
        }
    }

    fn trim(&mut self, capacity: usize) -> usize {
        if self.ordered.len() <= capacity {
            return 0;
        }
        let excess = self.ordered.len() - capacity;
        for position in self.ordered.drain(..excess) {
            self.scores.remove(&position.id);
        }
        excess
    }
}

/// Feed index held in process memory
#[derive(Default)]
pub struct MemoryFeedIndex {
    subjects: DashMap<StoreKey, Arc<RwLock<SortedEntries>>>,
}

impl MemoryFeedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn existing(&self, key: &StoreKey) -> Option<Arc<RwLock<SortedEntries>>> {
        self.subjects.get(key).map(|slot| Arc::clone(slot.value()))
    }

    /// Created lazily on first write
    fn writable(&self, key: &StoreKey) -> Arc<RwLock<SortedEntries>> {
        Arc::clone(self.subjects.entry(key.clone()).or_default().value())
    }
}

#[async_trait]
impl SortedFeedIndex for MemoryFeedIndex {
    async fn upsert(&self, key: &StoreKey, id: ContentId, score: f64) -> StoreResult<()> {
        let score = validate_score(score)?;
        self.writable(key).write().upsert(id, score);
        Ok(())
    }

    async fn upsert_many(&self, key: &StoreKey, entries: &[Entry]) -> StoreResult<()> {
        if entries.is_empty() {
            return Ok(());
        }
        let validated = entries
            .iter()
            .map(|e| validate_score(e.score).map(|score| Entry::new(e.id, score)))
            .collect::<StoreResult<Vec<_>>>()?;

        let slot = self.writable(key);
        let mut sorted = slot.write();
        for entry in validated {
            sorted.upsert(entry.id, entry.score);
        }
        Ok(())
    }

    async fn remove(&self, key: &StoreKey, id: ContentId) -> StoreResult<()> {
        if let Some(slot) = self.existing(key) {
            slot.write().remove(id);
        }
        Ok(())
    }

    async fn remove_many(&self, key: &StoreKey, ids: &[ContentId]) -> StoreResult<()> {
        if let Some(slot) = self.existing(key) {
            let mut sorted = slot.write();
            for id in ids {
                sorted.remove(*id);
            }
        }
        Ok(())
    }

    async fn rank(&self, key: &StoreKey, id: ContentId) -> StoreResult<Option<usize>> {
        Ok(self.existing(key).and_then(|slot| slot.read().rank(id)))
    }

    async fn score(&self, key: &StoreKey, id: ContentId) -> StoreResult<Option<f64>> {
        Ok(self
            .existing(key)
            .and_then(|slot| slot.read().scores.get(&id).copied()))
    }

    async fn range(&self, key: &StoreKey, query: &RangeQuery) -> StoreResult<Vec<ContentId>> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }
        Ok(self
            .existing(key)
            .map(|slot| slot.read().range(query))
            .unwrap_or_default())
    }

    async fn rank_window(
        &self,
        key: &StoreKey,
        offset: usize,
        limit: usize,
    ) -> StoreResult<Vec<ContentId>> {
        Ok(self
            .existing(key)
            .map(|slot| {
                slot.read()
                    .ordered
                    .iter()
                    .rev()
                    .skip(offset)
                    .take(limit)
                    .map(|p| p.id)
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn entries(&self, key: &StoreKey) -> StoreResult<Vec<Entry>> {
        Ok(self
            .existing(key)
            .map(|slot| {
                slot.read()
                    .ordered
                    .iter()
                    .map(|p| Entry::new(p.id, p.score))
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn replace(&self, key: &StoreKey, entries: &[Entry]) -> StoreResult<()> {
        if entries.is_empty() {
            self.subjects.remove(key);
            return Ok(());
        }
        let rebuilt = SortedEntries::from_entries(entries)?;
        let slot = self.writable(key);
        *slot.write() = rebuilt;
        Ok(())
    }

    async fn len(&self, key: &StoreKey) -> StoreResult<usize> {
        Ok(self
            .existing(key)
            .map(|slot| slot.read().ordered.len())
            .unwrap_or(0))
    }

    async fn trim(&self, key: &StoreKey, capacity: usize) -> StoreResult<usize> {
        Ok(self
            .existing(key)
            .map(|slot| slot.write().trim(capacity))
            .unwrap_or(0))
    }
}

/// Regeneration flags with per-subject deadlines
#[derive(Default)]
pub struct MemoryRegenerationSignal {
    deadlines: DashMap<StoreKey, Instant>,
}

impl MemoryRegenerationSignal {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegenerationSignal for MemoryRegenerationSignal {
    async fn mark(&self, subject: &Subject, ttl: Duration) -> StoreResult<()> {
        self.deadlines
            .insert(StoreKey::regeneration(subject), Instant::now() + ttl);
        Ok(())
    }

    async fn clear(&self, subject: &Subject) -> StoreResult<()> {
        self.deadlines.remove(&StoreKey::regeneration(subject));
        Ok(())
    }

    async fn is_regenerating(&self, subject: &Subject) -> StoreResult<bool> {
        let key = StoreKey::regeneration(subject);
        let now = Instant::now();
        // Expired flags are dropped on read
        let expired = match self.deadlines.get(&key) {
            Some(deadline) if *deadline > now => return Ok(true),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.deadlines.remove_if(&key, |_, deadline| *deadline <= now);
        }
        Ok(false)
    }
}
