//! Fetch window selection for gap-fill synchronization.
//!
//! Given a requested target page and the track's recorded high-water mark,
//! [`compute_window`] picks the contiguous page range the next fill round
//! should fetch:
//!
//! 1. Mark at or past the target: the request hit an internal hole, so a
//!    small patch window is drawn around the target itself.
//! 2. Target close to the start of the listing: fetch everything from the
//!    mark up to the target, plus a small overshoot so the pages right
//!    after it are warm.
//! 3. Target deep in the listing: advance in batches toward the target,
//!    building a continuous run instead of jumping ahead.
//!
//! Every window is clamped to the provider hard page limit and to a
//! maximum width, so a single round never fetches an unbounded range.

/// Maximum number of pages a single window may span.
pub const MAX_WINDOW_PAGES: u32 = 100;

/// Pages fetched on either side of the target when patching a hole.
const PATCH_RADIUS: u32 = 5;

/// Highest target still considered close to the start of a listing.
const CLOSE_TARGET_MAX: u32 = 100;

/// Extra pages fetched past a close target.
const CLOSE_OVERSHOOT: u32 = 2;

/// Batch size when advancing toward a far target.
pub(crate) const FAR_BATCH_PAGES: u32 = 50;

/// An inclusive page range to fetch. Empty when `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchWindow {
    pub start: u32,
    pub end: u32,
}

impl FetchWindow {
    /// Number of pages the window spans.
    pub fn width(&self) -> u32 {
        if self.start > self.end { 0 } else { self.end - self.start + 1 }
    }
}

/// Select the page window for the next fill round.
///
/// `high_water_mark` is the highest page recorded as synced on this track
/// (0 when nothing is), and `hard_limit` is the highest page the provider
/// serves at all.
pub fn compute_window(target: u32, high_water_mark: u32, hard_limit: u32) -> FetchWindow {
    let (start, mut end) = if high_water_mark >= target {
        (
            target.saturating_sub(PATCH_RADIUS).max(1),
            target.saturating_add(PATCH_RADIUS).min(high_water_mark),
        )
    } else if target <= CLOSE_TARGET_MAX {
        (high_water_mark + 1, target + CLOSE_OVERSHOOT)
    } else {
        (high_water_mark + 1, (high_water_mark + FAR_BATCH_PAGES).min(target))
    };

    end = end.min(hard_limit);
    if end >= start && end - start + 1 > MAX_WINDOW_PAGES {
        end = start + MAX_WINDOW_PAGES - 1;
    }

    FetchWindow { start, end }
}
