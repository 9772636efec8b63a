//! Service layer for feed-service
//!
//! Serving path:
//! - feed_reader: cursor resolution and score windows over the index
//! - hydrator: bulk fetch and order restoration
//! - pagination: next/prev cursors for both feed shapes
//! - timeline: Home and For You pages
//! - trending: trending merge and offset pages
//!
//! Background:
//! - precompute: regeneration lifecycle and apply strategies
//! - ranking: candidate scoring and author down-ranking

pub mod feed_reader;
pub mod hydrator;
pub mod pagination;
pub mod precompute;
pub mod ranking;
pub mod timeline;
pub mod trending;

pub use feed_reader::{FeedReader, FeedWindow};
pub use hydrator::Hydrator;
pub use pagination::{offset_cursors, window_cursors};
pub use precompute::{FeedSource, PrecomputeReport, PrecomputeWorker};
pub use ranking::{CandidateRanker, RankedSource, RecencySource};
pub use timeline::TimelineService;
pub use trending::{TrendingMerge, TrendingService};
