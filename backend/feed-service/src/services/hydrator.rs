//! Hydrator
//!
//! One unordered bulk fetch, then the objects are put back into the order of
//! the identifiers that were asked for. Identifiers whose object no longer
//! resolves are dropped silently.

use crate::clients::ObjectStore;
use crate::error::Result;
use crate::metrics;
use crate::models::Status;
use feed_store::ContentId;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

#[derive(Clone)]
pub struct Hydrator {
    store: Arc<dyn ObjectStore>,
}

impl Hydrator {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    pub async fn hydrate(&self, ids: &[ContentId]) -> Result<Vec<Status>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::with_capacity(ids.len());
        let unique: Vec<ContentId> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();

        let fetched = self.store.bulk_fetch(&unique).await?;
        let mut by_id: HashMap<ContentId, Status> =
            fetched.into_iter().map(|status| (status.id, status)).collect();

        let ordered: Vec<Status> = unique.iter().filter_map(|id| by_id.remove(id)).collect();

        let missing = unique.len() - ordered.len();
        if missing > 0 {
            debug!(requested = unique.len(), missing, "Dropped unresolvable statuses");
            metrics::record_hydration_misses(missing as u64);
        }
        Ok(ordered)
    }
}
