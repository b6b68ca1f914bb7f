//! Consumer-facing page service.
//!
//! `CatalogService::get_page` is the single call the rest of the
//! application uses to read listings. It serves straight from the mirror
//! when the rows are there, runs an on-demand gap fill when they are not,
//! and hands every served page to the readahead advisor.

use std::sync::Arc;

use serde::Serialize;

use crate::error::SyncError;
use crate::fill::{FillOptions, GapFill};
use crate::prefetch;
use reelsync_client::{CatalogProvider, DiscoverFilters};
use reelsync_core::{AppConfig, CatalogItem, Category, MirrorDb};

/// Pagination block of a [`PageResponse`].
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PageInfo {
    pub page: u32,
    /// Last upstream-reported total for this track, if any page of it has
    /// ever been synced.
    pub total_pages: Option<u32>,
}

/// One served listing page.
#[derive(Debug, Clone, Serialize)]
pub struct PageResponse {
    pub items: Vec<CatalogItem>,
    pub pagination: PageInfo,
    /// True when this request had to pull the page from upstream first.
    pub was_on_demand_synced: bool,
}

/// Read front end over the mirror with transparent gap filling.
#[derive(Clone)]
pub struct CatalogService {
    db: MirrorDb,
    fill: Arc<GapFill>,
    default_language: String,
    prefetch_enabled: bool,
}

impl CatalogService {
    pub fn new(db: MirrorDb, provider: Arc<dyn CatalogProvider>, config: &AppConfig) -> Self {
        let fill = Arc::new(GapFill::new(db.clone(), provider, FillOptions::from(config)));
        Self { db, fill, default_language: config.language.clone(), prefetch_enabled: config.prefetch_enabled }
    }

    /// Serve page `page` of a track, syncing it from upstream on a local miss.
    ///
    /// The language sent upstream is the explicit `language` argument when
    /// given, else the `filters` language facet, else the configured
    /// default. An empty `items` with `was_on_demand_synced = true` means
    /// the track genuinely ends before this page.
    ///
    /// # Errors
    ///
    /// Propagates [`SyncError`] from the gap fill; pages already mirrored
    /// are served without touching upstream and cannot fail this way.
    pub async fn get_page(
        &self, category: Category, page: u32, filters: &DiscoverFilters, language: Option<&str>,
    ) -> Result<PageResponse, SyncError> {
        let language = language
            .map(str::to_string)
            .or_else(|| filters.language.clone())
            .unwrap_or_else(|| self.default_language.clone());
        let signature = filters.signature();
        let sig = signature.as_deref();

        let mut items = self.db.page_items(category, page, sig).await?;
        let mut was_on_demand_synced = false;

        if items.is_empty() {
            let report = self.fill.ensure_page(category, page, filters, &language).await?;
            tracing::debug!(
                "on-demand sync for {category} page {page}: {} pages fetched, {} items stored",
                report.pages_fetched,
                report.items_stored
            );
            items = self.db.page_items(category, page, sig).await?;
            was_on_demand_synced = true;
        }

        let total_pages = self.db.last_known_total_pages(category, sig).await?;

        if self.prefetch_enabled {
            prefetch::spawn_readahead(
                self.db.clone(),
                Arc::clone(&self.fill),
                category,
                page,
                filters.clone(),
                language,
            );
        }

        Ok(PageResponse { items, pagination: PageInfo { page, total_pages }, was_on_demand_synced })
    }
}
