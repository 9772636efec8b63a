//! Timeline serving path
//!
//! Reads a precomputed Home or For You index, hydrates the page and reports
//! whether a recompute is in flight. Never waits on the precompute worker.

use crate::config::FeedConfig;
use crate::error::Result;
use crate::models::{FeedPage, FeedStatus, PageRequest};
use crate::services::feed_reader::FeedReader;
use crate::services::hydrator::Hydrator;
use crate::services::pagination::window_cursors;
use feed_store::{FeedKind, RegenerationSignal, SortedFeedIndex, Subject};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct TimelineService {
    home: FeedReader,
    for_you: FeedReader,
    hydrator: Hydrator,
    signal: Arc<dyn RegenerationSignal>,
    config: FeedConfig,
}

impl TimelineService {
    pub fn new(
        index: Arc<dyn SortedFeedIndex>,
        signal: Arc<dyn RegenerationSignal>,
        hydrator: Hydrator,
        config: FeedConfig,
    ) -> Self {
        Self {
            home: FeedReader::new(FeedKind::Home, index.clone()),
            for_you: FeedReader::new(FeedKind::ForYou, index),
            hydrator,
            signal,
            config,
        }
    }

    pub async fn for_you(&self, account_id: u64, request: PageRequest) -> Result<FeedPage> {
        if !self.config.for_you_enabled {
            return Ok(FeedPage::empty(FeedStatus::Complete));
        }
        self.page(&self.for_you, account_id, request).await
    }

    pub async fn home(&self, account_id: u64, request: PageRequest) -> Result<FeedPage> {
        if !self.config.home_enabled {
            return Ok(FeedPage::empty(FeedStatus::Complete));
        }
        self.page(&self.home, account_id, request).await
    }

    async fn page(
        &self,
        reader: &FeedReader,
        account_id: u64,
        request: PageRequest,
    ) -> Result<FeedPage> {
        let subject = Subject::Account(account_id);
        let limit = request.effective_limit(self.config.default_limit, self.config.max_limit);

        // The flag only picks the status; it is read before the window so a
        // recompute that finishes mid-request still reports as in flight.
        let regenerating = match self.signal.is_regenerating(&subject).await {
            Ok(flag) => flag,
            Err(e) => {
                warn!(subject = %subject, error = %e, "Regeneration signal unavailable");
                false
            }
        };

        let window = reader.read(&subject, &request, limit).await?;
        let statuses = self.hydrator.hydrate(&window.ids).await?;

        debug!(
            kind = %reader.kind(),
            subject = %subject,
            indexed = window.ids.len(),
            hydrated = statuses.len(),
            regenerating,
            "Served timeline page"
        );

        Ok(FeedPage {
            statuses,
            status: FeedStatus::from_regenerating(regenerating),
            cursors: window_cursors(&window),
        })
    }
}
