//! Precompute worker
//!
//! Rebuilds one subject's feed index from its registered source:
//!
//! 1. Mark the subject as regenerating (self-expiring after the configured TTL)
//! 2. Compute `(id, score)` entries, bounded by the source timeout
//! 3. Apply them without ever emptying the live index
//! 4. Clear the mark on every path, including a dropped future
//!
//! Failures stay here. The serving path only ever sees the index and the mark.

use crate::config::{ApplyMode, PrecomputeConfig};
use crate::error::{PrecomputeError, Result};
use crate::metrics;
use async_trait::async_trait;
use feed_store::{
    ContentId, Entry, FeedKind, RegenerationSignal, SortedFeedIndex, StoreKey, StoreResult,
    Subject,
};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Producer of a subject's complete feed contents
#[async_trait]
pub trait FeedSource: Send + Sync {
    fn kind(&self) -> FeedKind;

    async fn compute(&self, subject: &Subject) -> Result<Vec<Entry>>;
}

/// Outcome of one applied regeneration
#[derive(Debug, Clone, PartialEq)]
pub struct PrecomputeReport {
    pub kind: FeedKind,
    pub subject: Subject,
    /// Entries written (new or re-scored)
    pub applied: usize,
    /// Entries dropped as stale or over capacity
    pub removed: usize,
    pub duration: Duration,
}

/// Holds the regeneration mark for one subject.
///
/// `release` clears it in place. If the owning future is dropped first, the
/// clear is handed to the runtime instead.
struct SignalGuard {
    signal: Arc<dyn RegenerationSignal>,
    subject: Subject,
    armed: bool,
}

impl SignalGuard {
    async fn acquire(
        signal: Arc<dyn RegenerationSignal>,
        subject: Subject,
        ttl: Duration,
    ) -> StoreResult<Self> {
        signal.mark(&subject, ttl).await?;
        Ok(Self {
            signal,
            subject,
            armed: true,
        })
    }

    async fn release(mut self) {
        self.armed = false;
        if let Err(e) = self.signal.clear(&self.subject).await {
            // The TTL still bounds how long the mark can linger
            warn!(subject = %self.subject, error = %e, "Failed to clear regeneration signal");
        }
    }
}

impl Drop for SignalGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let signal = self.signal.clone();
        let subject = self.subject;
        handle.spawn(async move {
            if let Err(e) = signal.clear(&subject).await {
                warn!(subject = %subject, error = %e, "Failed to clear abandoned regeneration signal");
            }
        });
    }
}

#[derive(Clone)]
pub struct PrecomputeWorker {
    index: Arc<dyn SortedFeedIndex>,
    signal: Arc<dyn RegenerationSignal>,
    sources: HashMap<FeedKind, Arc<dyn FeedSource>>,
    config: PrecomputeConfig,
}

impl PrecomputeWorker {
    pub fn new(
        index: Arc<dyn SortedFeedIndex>,
        signal: Arc<dyn RegenerationSignal>,
        config: PrecomputeConfig,
    ) -> Self {
        Self {
            index,
            signal,
            sources: HashMap::new(),
            config,
        }
    }

    /// Register the source for its feed kind, replacing any previous one
    pub fn with_source(mut self, source: Arc<dyn FeedSource>) -> Self {
        self.sources.insert(source.kind(), source);
        self
    }

    pub fn has_source(&self, kind: FeedKind) -> bool {
        self.sources.contains_key(&kind)
    }

    /// Regenerate one feed for one subject under its own regeneration mark
    pub async fn run(
        &self,
        kind: FeedKind,
        subject: Subject,
    ) -> std::result::Result<PrecomputeReport, PrecomputeError> {
        let guard = self.acquire(subject).await?;
        let result = self.regenerate(kind, &subject).await;
        guard.release().await;
        result
    }

    /// Regenerate the Home and then the For You feed of an account.
    ///
    /// One mark covers both. A Home failure skips For You; kinds without a
    /// registered source are skipped.
    pub async fn populate_account(
        &self,
        account_id: u64,
    ) -> std::result::Result<Vec<PrecomputeReport>, PrecomputeError> {
        let subject = Subject::Account(account_id);
        let guard = self.acquire(subject).await?;

        let mut reports = Vec::with_capacity(2);
        let mut outcome = Ok(());
        for kind in [FeedKind::Home, FeedKind::ForYou] {
            if !self.has_source(kind) {
                continue;
            }
            match self.regenerate(kind, &subject).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        guard.release().await;
        outcome.map(|_| reports)
    }

    async fn acquire(&self, subject: Subject) -> std::result::Result<SignalGuard, PrecomputeError> {
        let ttl = self.config.regeneration_ttl();
        Ok(SignalGuard::acquire(self.signal.clone(), subject, ttl).await?)
    }

    async fn regenerate(
        &self,
        kind: FeedKind,
        subject: &Subject,
    ) -> std::result::Result<PrecomputeReport, PrecomputeError> {
        let started = Instant::now();
        let result = self.compute_and_apply(kind, subject, started).await;
        let elapsed = started.elapsed();
        metrics::record_precompute_duration(kind.as_str(), elapsed);

        match &result {
            Ok(report) => {
                metrics::record_precompute_run(kind.as_str(), "success");
                info!(
                    kind = %kind,
                    subject = %subject,
                    applied = report.applied,
                    removed = report.removed,
                    duration_ms = elapsed.as_millis(),
                    "Feed regenerated"
                );
            }
            Err(e) => {
                let outcome = match e {
                    PrecomputeError::Timeout(_) => "timeout",
                    _ => "error",
                };
                metrics::record_precompute_run(kind.as_str(), outcome);
                warn!(
                    kind = %kind,
                    subject = %subject,
                    error = %e,
                    duration_ms = elapsed.as_millis(),
                    "Feed regeneration failed, keeping previous index"
                );
            }
        }
        result
    }

    async fn compute_and_apply(
        &self,
        kind: FeedKind,
        subject: &Subject,
        started: Instant,
    ) -> std::result::Result<PrecomputeReport, PrecomputeError> {
        let source = self
            .sources
            .get(&kind)
            .ok_or(PrecomputeError::NoSource(kind))?;

        let timeout = self.config.source_timeout();
        let computed = match tokio::time::timeout(timeout, source.compute(subject)).await {
            Ok(result) => result?,
            Err(_) => return Err(PrecomputeError::Timeout(timeout)),
        };

        let entries = top_entries(dedupe_entries(computed), self.config.capacity);
        let key = StoreKey::index(kind, subject);
        debug!(key = %key, count = entries.len(), "Applying computed entries");

        let (applied, removed) = match self.config.apply_mode {
            ApplyMode::Incremental => self.apply_incremental(&key, &entries).await?,
            ApplyMode::Swap => self.apply_swap(&key, &entries).await?,
        };

        Ok(PrecomputeReport {
            kind,
            subject: *subject,
            applied,
            removed,
            duration: started.elapsed(),
        })
    }

    /// Upsert changed entries first, then drop stale ones, then trim.
    /// Readers see a mix of old and new entries but never an empty index.
    async fn apply_incremental(&self, key: &StoreKey, entries: &[Entry]) -> StoreResult<(usize, usize)> {
        let existing: HashMap<ContentId, f64> = self
            .index
            .entries(key)
            .await?
            .into_iter()
            .map(|entry| (entry.id, entry.score))
            .collect();

        let changed: Vec<Entry> = entries
            .iter()
            .filter(|entry| existing.get(&entry.id) != Some(&entry.score))
            .copied()
            .collect();
        let produced: HashSet<ContentId> = entries.iter().map(|entry| entry.id).collect();
        let stale: Vec<ContentId> = existing
            .keys()
            .filter(|id| !produced.contains(id))
            .copied()
            .collect();

        if !changed.is_empty() {
            self.index.upsert_many(key, &changed).await?;
        }
        if !stale.is_empty() {
            self.index.remove_many(key, &stale).await?;
        }
        let trimmed = self.index.trim(key, self.config.capacity).await?;

        Ok((changed.len(), stale.len() + trimmed))
    }

    async fn apply_swap(&self, key: &StoreKey, entries: &[Entry]) -> StoreResult<(usize, usize)> {
        let produced: HashSet<ContentId> = entries.iter().map(|entry| entry.id).collect();
        let removed = self
            .index
            .entries(key)
            .await?
            .iter()
            .filter(|entry| !produced.contains(&entry.id))
            .count();

        self.index.replace(key, entries).await?;
        Ok((entries.len(), removed))
    }
}

/// One entry per id, highest score wins. Non-finite scores are dropped.
pub fn dedupe_entries(entries: Vec<Entry>) -> Vec<Entry> {
    let mut best: HashMap<ContentId, f64> = HashMap::with_capacity(entries.len());
    let mut order = Vec::with_capacity(entries.len());

    for entry in entries {
        if !entry.score.is_finite() {
            warn!(id = entry.id, score = entry.score, "Dropping entry with non-finite score");
            continue;
        }
        match best.get_mut(&entry.id) {
            Some(score) => {
                if entry.score > *score {
                    *score = entry.score;
                }
            }
            None => {
                best.insert(entry.id, entry.score);
                order.push(entry.id);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|id| best.get(&id).map(|score| Entry::new(id, *score)))
        .collect()
}

/// Highest `capacity` entries in the index's own order
fn top_entries(mut entries: Vec<Entry>, capacity: usize) -> Vec<Entry> {
    if entries.len() <= capacity {
        return entries;
    }
    entries.sort_by(descending);
    entries.truncate(capacity);
    entries
}

fn descending(a: &Entry, b: &Entry) -> Ordering {
    b.position().order(&a.position())
}
