//! Nova feed store
//!
//! Precomputed, score-ordered feed indexes with:
//! - Typed key schema with versioning
//! - Exclusive `(score, id)` cursor windows in both directions
//! - Atomic whole-index swaps and capacity trimming
//! - Per-subject regeneration signal with TTL
//! - Redis and in-process backends behind the same traits
//! - Metrics integration

mod error;
mod keys;
mod metrics;

pub mod index;
pub mod memory;
pub mod redis_index;
pub mod signal;

pub use error::{StoreError, StoreResult};
pub use index::{Bound, Direction, Entry, Position, RangeQuery, SortedFeedIndex};
pub use keys::{ContentId, FeedKind, StoreKey, Subject, KEY_VERSION};
pub use memory::{MemoryFeedIndex, MemoryRegenerationSignal};
pub use metrics::StoreMetrics;
pub use redis_index::RedisFeedIndex;
pub use signal::{RedisRegenerationSignal, RegenerationSignal};
