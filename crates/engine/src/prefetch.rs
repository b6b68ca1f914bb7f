//! Opportunistic readahead.
//!
//! After a page is served, the next one is usually requested moments
//! later. Filling it in a detached task turns that follow-up into a local
//! hit. Readahead is strictly best-effort: every failure is logged at
//! debug level and swallowed, and nothing here blocks or fails the
//! request that triggered it.

use std::sync::Arc;

use crate::fill::GapFill;
use reelsync_client::DiscoverFilters;
use reelsync_core::{Category, MirrorDb};

/// Spawn a background fill of the page after `served_page` on the same
/// track. Returns the task handle; callers on the serving path drop it.
pub fn spawn_readahead(
    db: MirrorDb, fill: Arc<GapFill>, category: Category, served_page: u32, filters: DiscoverFilters,
    language: String,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let next = served_page.saturating_add(1);
        if next > fill.options().page_hard_limit {
            return;
        }

        let signature = filters.signature();
        match db.count_items_on_page(category, next, signature.as_deref()).await {
            Ok(0) => {}
            Ok(_) => return,
            Err(err) => {
                tracing::debug!("readahead for {category} page {next} skipped, row count failed: {err}");
                return;
            }
        }

        match fill.ensure_page(category, next, &filters, &language).await {
            Ok(report) => {
                tracing::debug!("readahead synced {category} page {next}: {} pages fetched", report.pages_fetched);
            }
            Err(err) => tracing::debug!("readahead for {category} page {next} failed: {err}"),
        }
    })
}
