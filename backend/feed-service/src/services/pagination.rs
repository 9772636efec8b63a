//! Pagination cursor builder
//!
//! Timeline pages hand back identifiers (`max_id` for the older page,
//! `min_id` for the newer one); trending pages hand back rank offsets.

use crate::models::{OffsetCursors, PaginationCursors};
use crate::services::feed_reader::FeedWindow;

/// Cursors for a score-window page.
///
/// Derived from the index window rather than the hydrated objects so an
/// entry that failed to hydrate does not shift the boundary.
pub fn window_cursors(window: &FeedWindow) -> PaginationCursors {
    PaginationCursors {
        next_max_id: window.oldest(),
        prev_min_id: window.newest(),
    }
}

/// Offsets for a rank-window page.
///
/// `next` exists only when the page came back full; `prev` only once the
/// caller is more than one page deep.
pub fn offset_cursors(offset: usize, limit: usize, returned: usize) -> OffsetCursors {
    OffsetCursors {
        next_offset: if limit > 0 && returned == limit {
            offset.checked_add(limit)
        } else {
            None
        },
        prev_offset: (offset > limit).then(|| offset - limit),
    }
}
