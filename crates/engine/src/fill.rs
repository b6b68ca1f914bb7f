//! On-demand gap-fill synchronization.
//!
//! Fills the local mirror with whatever pages lie between a track's
//! recorded high-water mark and a requested target page. Work proceeds
//! window by window, committing each page (items plus ledger entry) as it
//! lands, so an interrupted fill resumes from the committed state instead
//! of starting over.

use std::sync::Arc;
use std::time::Duration;

use crate::error::SyncError;
use crate::window::{self, FetchWindow, compute_window};
use reelsync_client::{CatalogProvider, DiscoverFilters};
use reelsync_core::{AppConfig, Category, MirrorDb, PageSync};

/// Tuning for the gap-fill loop.
#[derive(Debug, Clone)]
pub struct FillOptions {
    /// Highest page number the upstream provider serves.
    pub page_hard_limit: u32,
    /// Fixed courtesy delay between consecutive page fetches.
    pub inter_page_delay: Duration,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self { page_hard_limit: 500, inter_page_delay: Duration::from_millis(250) }
    }
}

impl From<&AppConfig> for FillOptions {
    fn from(config: &AppConfig) -> Self {
        Self { page_hard_limit: config.page_hard_limit, inter_page_delay: config.inter_page_delay() }
    }
}

/// What a call to [`GapFill::ensure_page`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Pages fetched from upstream during this call.
    pub pages_fetched: u32,
    /// Items actually stored; items already mirrored are skipped, not counted.
    pub items_stored: u64,
    /// Fill rounds run; 0 when the page was already locally available.
    pub rounds: u32,
    /// Whether upstream returned an empty page, ending the fill early.
    pub reached_end: bool,
}

enum WindowOutcome {
    Completed,
    EndOfData,
}

/// Gap-fill synchronizer: pulls missing listing pages into the mirror.
pub struct GapFill {
    db: MirrorDb,
    provider: Arc<dyn CatalogProvider>,
    options: FillOptions,
}

impl GapFill {
    pub fn new(db: MirrorDb, provider: Arc<dyn CatalogProvider>, options: FillOptions) -> Self {
        Self { db, provider, options }
    }

    pub fn options(&self) -> &FillOptions {
        &self.options
    }

    /// Make page `target` of a track locally available.
    ///
    /// Checks run in order: the target must be within the provider hard
    /// limit; a ledger entry backed by stored rows means nothing to do; a
    /// ledger entry without stored rows is dropped and refilled. After
    /// that, fetch windows advance the track's high-water mark until the
    /// target is covered or upstream runs out of data.
    ///
    /// Every page commits independently, so a failure partway through
    /// leaves all previously committed pages in place.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::PageLimitExceeded`] for targets past the hard
    /// limit, and propagates upstream or store failures from mid-fill.
    pub async fn ensure_page(
        &self, category: Category, target: u32, filters: &DiscoverFilters, language: &str,
    ) -> Result<FillReport, SyncError> {
        if target > self.options.page_hard_limit {
            return Err(SyncError::PageLimitExceeded { page: target, limit: self.options.page_hard_limit });
        }

        let signature = filters.signature();
        let sig = signature.as_deref();

        if self.db.is_page_synced(category, target, sig).await? {
            if self.db.count_items_on_page(category, target, sig).await? > 0 {
                return Ok(FillReport::default());
            }
            // Ledger claims a synced page the store holds no rows for.
            tracing::warn!("{category} page {target} recorded as synced but has no stored rows, invalidating");
            self.db.invalidate_page(category, target, sig).await?;
        }

        let mut report = FillReport::default();
        let start_mark = self.db.high_water_mark(category, sig).await?;
        let max_rounds = max_fill_rounds(start_mark, target);

        loop {
            if report.rounds >= max_rounds {
                tracing::warn!(
                    "gap fill for {category} page {target} stopped after {} rounds without reaching the target",
                    report.rounds
                );
                break;
            }
            report.rounds += 1;

            let mark = self.db.high_water_mark(category, sig).await?;
            let window = compute_window(target, mark, self.options.page_hard_limit);
            tracing::debug!(
                "filling {category} pages {}-{} toward {target} (high-water mark {mark})",
                window.start,
                window.end
            );

            match self.fill_window(category, window, filters, sig, language, &mut report).await? {
                WindowOutcome::EndOfData => {
                    report.reached_end = true;
                    break;
                }
                WindowOutcome::Completed => {
                    if window.end >= target {
                        break;
                    }
                }
            }
        }

        Ok(report)
    }

    /// Fetch and commit every not-yet-synced page in the window, in order.
    async fn fill_window(
        &self, category: Category, window: FetchWindow, filters: &DiscoverFilters, signature: Option<&str>,
        language: &str, report: &mut FillReport,
    ) -> Result<WindowOutcome, SyncError> {
        let already = self.db.synced_pages(category, signature).await?;

        for page in window.start..=window.end {
            if already.contains(&page) {
                continue;
            }

            let fetched = self.provider.list_page(category, page, filters, language).await?;
            if fetched.items.is_empty() {
                tracing::debug!("{category} page {page} is empty, treating as end of data");
                return Ok(WindowOutcome::EndOfData);
            }

            let mut stored = 0u32;
            for item in &fetched.items {
                if self.db.insert_item_if_absent(item, page, signature).await? {
                    stored += 1;
                }
            }

            self.db
                .record_page_synced(&PageSync {
                    category,
                    page,
                    filter_signature: signature.map(str::to_string),
                    item_count: stored,
                    total_pages: Some(fetched.total_pages),
                    language: Some(language.to_string()),
                    metadata: Some(serde_json::json!({ "total_results": fetched.total_results }).to_string()),
                })
                .await?;

            report.pages_fetched += 1;
            report.items_stored += u64::from(stored);
            tracing::debug!("synced {category} page {page}: stored {stored} of {} items", fetched.items.len());

            if page < window.end && !self.options.inter_page_delay.is_zero() {
                tokio::time::sleep(self.options.inter_page_delay).await;
            }
        }

        Ok(WindowOutcome::Completed)
    }
}

/// Upper bound on fill rounds for one `ensure_page` call.
///
/// Every completed round moves the high-water mark forward by at least one
/// batch, so distance over batch size plus slack always suffices; the
/// guard only trips when rounds stop making progress.
fn max_fill_rounds(high_water_mark: u32, target: u32) -> u32 {
    target.saturating_sub(high_water_mark) / window::FAR_BATCH_PAGES + 2
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeProvider, mem_db};

    fn quick_options() -> FillOptions {
        FillOptions { page_hard_limit: 500, inter_page_delay: Duration::ZERO }
    }

    async fn mark_synced(db: &MirrorDb, category: Category, page: u32, item_count: u32) {
        db.record_page_synced(&PageSync {
            category,
            page,
            filter_signature: None,
            item_count,
            total_pages: Some(500),
            language: Some("en-US".to_string()),
            metadata: None,
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_target_past_hard_limit_rejected_without_fetching() {
        let db = mem_db().await;
        let provider = Arc::new(FakeProvider::with_pages(500, 3));
        let fill = GapFill::new(db.clone(), provider.clone(), quick_options());

        let err = fill.ensure_page(Category::Movie, 600, &DiscoverFilters::default(), "en-US").await.unwrap_err();

        assert!(matches!(err, SyncError::PageLimitExceeded { page: 600, limit: 500 }));
        assert!(!err.is_retryable());
        assert_eq!(provider.list_calls(), 0);
        assert_eq!(db.ledger_len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_far_target_fills_gap_in_one_window() {
        let db = mem_db().await;
        let provider = Arc::new(FakeProvider::with_pages(500, 3));
        let fill = GapFill::new(db.clone(), provider.clone(), quick_options());
        mark_synced(&db, Category::Movie, 100, 3).await;

        let report = fill.ensure_page(Category::Movie, 150, &DiscoverFilters::default(), "en-US").await.unwrap();

        assert_eq!(report.rounds, 1);
        assert_eq!(report.pages_fetched, 50);
        assert_eq!(report.items_stored, 150);
        assert!(!report.reached_end);
        assert_eq!(provider.list_calls(), 50);
        assert_eq!(db.high_water_mark(Category::Movie, None).await.unwrap(), 150);
        assert!(db.is_page_synced(Category::Movie, 101, None).await.unwrap());
        assert!(db.is_page_synced(Category::Movie, 150, None).await.unwrap());
        assert_eq!(db.count_items_on_page(Category::Movie, 150, None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_close_target_fills_with_overshoot() {
        let db = mem_db().await;
        let provider = Arc::new(FakeProvider::with_pages(500, 3));
        let fill = GapFill::new(db.clone(), provider.clone(), quick_options());

        let report = fill.ensure_page(Category::Series, 5, &DiscoverFilters::default(), "en-US").await.unwrap();

        assert_eq!(report.rounds, 1);
        assert_eq!(report.pages_fetched, 7);
        assert_eq!(provider.list_calls(), 7);
        assert_eq!(db.high_water_mark(Category::Series, None).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_deep_target_advances_in_multiple_rounds() {
        let db = mem_db().await;
        let provider = Arc::new(FakeProvider::with_pages(500, 2));
        let fill = GapFill::new(db.clone(), provider.clone(), quick_options());

        let report = fill.ensure_page(Category::Movie, 150, &DiscoverFilters::default(), "en-US").await.unwrap();

        assert_eq!(report.rounds, 3);
        assert_eq!(report.pages_fetched, 150);
        assert_eq!(provider.list_calls(), 150);
        assert_eq!(db.high_water_mark(Category::Movie, None).await.unwrap(), 150);
    }

    #[tokio::test]
    async fn test_present_page_is_served_without_upstream() {
        let db = mem_db().await;
        let provider = Arc::new(FakeProvider::with_pages(500, 3));
        let fill = GapFill::new(db.clone(), provider.clone(), quick_options());

        fill.ensure_page(Category::Movie, 1, &DiscoverFilters::default(), "en-US").await.unwrap();
        let calls_after_first = provider.list_calls();

        let report = fill.ensure_page(Category::Movie, 1, &DiscoverFilters::default(), "en-US").await.unwrap();

        assert_eq!(report, FillReport::default());
        assert_eq!(provider.list_calls(), calls_after_first);
    }

    #[tokio::test]
    async fn test_refetching_a_page_stores_nothing_new() {
        let db = mem_db().await;
        let provider = Arc::new(FakeProvider::with_pages(500, 3));
        let fill = GapFill::new(db.clone(), provider.clone(), quick_options());

        fill.ensure_page(Category::Movie, 2, &DiscoverFilters::default(), "en-US").await.unwrap();
        let len_before = db.catalog_len().await.unwrap();

        // Drop only the ledger entry; the rows stay. The refill patches the
        // hole without duplicating or moving anything.
        db.invalidate_page(Category::Movie, 2, None).await.unwrap();
        let report = fill.ensure_page(Category::Movie, 2, &DiscoverFilters::default(), "en-US").await.unwrap();

        assert_eq!(report.rounds, 1);
        assert_eq!(report.pages_fetched, 1);
        assert_eq!(report.items_stored, 0);
        assert_eq!(db.catalog_len().await.unwrap(), len_before);
        assert!(db.is_page_synced(Category::Movie, 2, None).await.unwrap());
        assert_eq!(db.page_sync(Category::Movie, 2, None).await.unwrap().unwrap().item_count, 0);
        assert_eq!(db.count_items_on_page(Category::Movie, 2, None).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_phantom_ledger_entry_self_heals() {
        let db = mem_db().await;
        let provider = Arc::new(FakeProvider::with_pages(500, 3));
        let fill = GapFill::new(db.clone(), provider.clone(), quick_options());

        // Ledger entry with no stored rows behind it.
        mark_synced(&db, Category::Movie, 7, 3).await;

        let report = fill.ensure_page(Category::Movie, 7, &DiscoverFilters::default(), "en-US").await.unwrap();

        assert_eq!(report.rounds, 1);
        assert_eq!(provider.list_calls(), 9);
        assert!(db.is_page_synced(Category::Movie, 7, None).await.unwrap());
        assert_eq!(db.count_items_on_page(Category::Movie, 7, None).await.unwrap(), 3);

        // Healed for good: the next request is a local hit.
        let repeat = fill.ensure_page(Category::Movie, 7, &DiscoverFilters::default(), "en-US").await.unwrap();
        assert_eq!(repeat, FillReport::default());
        assert_eq!(provider.list_calls(), 9);
    }

    #[tokio::test]
    async fn test_empty_page_ends_fill_early() {
        let db = mem_db().await;
        let provider = Arc::new(FakeProvider::with_pages(3, 2));
        let fill = GapFill::new(db.clone(), provider.clone(), quick_options());

        let report = fill.ensure_page(Category::Movie, 10, &DiscoverFilters::default(), "en-US").await.unwrap();

        assert!(report.reached_end);
        assert_eq!(report.pages_fetched, 3);
        assert_eq!(report.items_stored, 6);
        assert_eq!(provider.list_calls(), 4);
        assert_eq!(db.high_water_mark(Category::Movie, None).await.unwrap(), 3);
        assert!(!db.is_page_synced(Category::Movie, 4, None).await.unwrap());
    }

    #[tokio::test]
    async fn test_failed_fill_keeps_committed_pages_and_resumes() {
        let db = mem_db().await;
        let provider = Arc::new(FakeProvider::with_pages(500, 3));
        let fill = GapFill::new(db.clone(), provider.clone(), quick_options());
        provider.fail_on_page(Some(3));

        let err = fill.ensure_page(Category::Movie, 5, &DiscoverFilters::default(), "en-US").await.unwrap_err();

        assert!(matches!(err, SyncError::Upstream(_)));
        assert!(err.is_retryable());
        assert_eq!(provider.list_calls(), 3);
        assert_eq!(db.high_water_mark(Category::Movie, None).await.unwrap(), 2);

        provider.fail_on_page(None);
        let report = fill.ensure_page(Category::Movie, 5, &DiscoverFilters::default(), "en-US").await.unwrap();

        assert_eq!(report.pages_fetched, 5);
        assert_eq!(provider.list_calls(), 8);
        assert_eq!(db.high_water_mark(Category::Movie, None).await.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_item_served_on_earlier_page_is_not_moved() {
        let db = mem_db().await;
        let provider = Arc::new(FakeProvider::with_pages(500, 3));
        let fill = GapFill::new(db.clone(), provider.clone(), quick_options());

        // Upstream shifted an item from page 1 onto page 2 between fetches.
        provider.override_page(
            2,
            vec![
                FakeProvider::item(Category::Movie, 1, 0),
                FakeProvider::item(Category::Movie, 2, 0),
                FakeProvider::item(Category::Movie, 2, 1),
            ],
        );

        fill.ensure_page(Category::Movie, 2, &DiscoverFilters::default(), "en-US").await.unwrap();

        assert_eq!(db.count_items_on_page(Category::Movie, 1, None).await.unwrap(), 3);
        assert_eq!(db.count_items_on_page(Category::Movie, 2, None).await.unwrap(), 2);
        assert_eq!(db.page_sync(Category::Movie, 2, None).await.unwrap().unwrap().item_count, 2);

        let page_one_ids: Vec<i64> =
            db.page_items(Category::Movie, 1, None).await.unwrap().iter().map(|i| i.tmdb_id).collect();
        assert!(page_one_ids.contains(&FakeProvider::item_id(1, 0)));
    }

    #[tokio::test]
    async fn test_fill_never_fetches_past_hard_limit() {
        let db = mem_db().await;
        let provider = Arc::new(FakeProvider::with_pages(500, 3));
        let options = FillOptions { page_hard_limit: 10, inter_page_delay: Duration::ZERO };
        let fill = GapFill::new(db.clone(), provider.clone(), options);

        let report = fill.ensure_page(Category::Movie, 9, &DiscoverFilters::default(), "en-US").await.unwrap();

        // The overshoot window is clamped at the limit instead of reaching 11.
        assert_eq!(report.pages_fetched, 10);
        assert_eq!(provider.list_calls(), 10);
        assert_eq!(db.high_water_mark(Category::Movie, None).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn test_filtered_track_fills_independently() {
        let db = mem_db().await;
        let provider = Arc::new(FakeProvider::with_pages(500, 3));
        let fill = GapFill::new(db.clone(), provider.clone(), quick_options());
        let filters = DiscoverFilters { genre: Some("28".to_string()), ..Default::default() };
        let sig = filters.signature();

        fill.ensure_page(Category::Movie, 1, &filters, "en-US").await.unwrap();

        assert!(db.is_page_synced(Category::Movie, 1, sig.as_deref()).await.unwrap());
        assert!(!db.is_page_synced(Category::Movie, 1, None).await.unwrap());
        assert_eq!(db.high_water_mark(Category::Movie, None).await.unwrap(), 0);
    }

    #[test]
    fn test_max_fill_rounds_bounds() {
        assert_eq!(max_fill_rounds(0, 150), 5);
        assert_eq!(max_fill_rounds(100, 150), 3);
        assert_eq!(max_fill_rounds(0, 50), 3);
        assert_eq!(max_fill_rounds(5, 5), 2);
        assert_eq!(max_fill_rounds(10, 3), 2);
    }
}
