//! Test doubles shared by the engine test modules.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use reelsync_client::{CatalogPage, CatalogProvider, CombinedCredits, Credit, DiscoverFilters, TmdbError};
use reelsync_core::{CatalogItem, Category, MediaType, MirrorDb};

pub(crate) async fn mem_db() -> MirrorDb {
    MirrorDb::open_in_memory().await.expect("in-memory database")
}

/// Scripted catalog provider.
///
/// Serves `total_pages` pages of `items_per_page` synthetic items each;
/// pages past the end come back empty, mirroring how the live API behaves
/// at the edge of a listing. Individual pages can be overridden and a
/// one-page failure can be injected.
pub(crate) struct FakeProvider {
    total_pages: u32,
    items_per_page: u32,
    overrides: Mutex<HashMap<u32, Vec<CatalogItem>>>,
    fail_on_page: Mutex<Option<u32>>,
    list_calls: AtomicUsize,
    derived_calls: AtomicUsize,
}

impl FakeProvider {
    pub(crate) fn with_pages(total_pages: u32, items_per_page: u32) -> Self {
        Self {
            total_pages,
            items_per_page,
            overrides: Mutex::new(HashMap::new()),
            fail_on_page: Mutex::new(None),
            list_calls: AtomicUsize::new(0),
            derived_calls: AtomicUsize::new(0),
        }
    }

    /// Make one listing page fail with an HTTP 502 until cleared.
    pub(crate) fn fail_on_page(&self, page: Option<u32>) {
        *self.fail_on_page.lock().unwrap() = page;
    }

    /// Replace the scripted items for one page.
    pub(crate) fn override_page(&self, page: u32, items: Vec<CatalogItem>) {
        self.overrides.lock().unwrap().insert(page, items);
    }

    pub(crate) fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn derived_calls(&self) -> usize {
        self.derived_calls.load(Ordering::SeqCst)
    }

    /// Upstream id scheme, stable per (page, index) so refetches are
    /// idempotent.
    pub(crate) fn item_id(page: u32, index: u32) -> i64 {
        i64::from(page) * 1_000 + i64::from(index)
    }

    pub(crate) fn item(category: Category, page: u32, index: u32) -> CatalogItem {
        CatalogItem {
            category,
            tmdb_id: Self::item_id(page, index),
            title: format!("Title {page}-{index}"),
            original_language: Some("en".to_string()),
            overview: None,
            poster_path: Some(format!("/poster-{page}-{index}.jpg")),
            release_date: Some("2024-01-01".to_string()),
            popularity: f64::from(1_000 - index),
            vote_average: 7.0,
        }
    }
}

#[async_trait]
impl CatalogProvider for FakeProvider {
    async fn list_page(
        &self, category: Category, page: u32, _filters: &DiscoverFilters, _language: &str,
    ) -> Result<CatalogPage, TmdbError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);

        if *self.fail_on_page.lock().unwrap() == Some(page) {
            return Err(TmdbError::HttpError { status: 502 });
        }

        let items = if let Some(scripted) = self.overrides.lock().unwrap().get(&page) {
            scripted.clone()
        } else if page > self.total_pages {
            Vec::new()
        } else {
            (0..self.items_per_page).map(|index| Self::item(category, page, index)).collect()
        };

        Ok(CatalogPage {
            page,
            total_pages: self.total_pages,
            total_results: u64::from(self.total_pages) * u64::from(self.items_per_page),
            items,
        })
    }

    async fn recommendations(
        &self, media_type: MediaType, id: i64, _language: &str,
    ) -> Result<Vec<CatalogItem>, TmdbError> {
        self.derived_calls.fetch_add(1, Ordering::SeqCst);

        let category = match media_type {
            MediaType::Movie => Category::Movie,
            MediaType::Series => Category::Series,
            MediaType::Person => {
                return Err(TmdbError::InvalidFilters(
                    "recommendations exist for movies and series only".to_string(),
                ));
            }
        };

        Ok((0..3)
            .map(|index| {
                let mut item = Self::item(category, 0, index);
                item.tmdb_id = id * 10 + i64::from(index);
                item.title = format!("Related {id}-{index}");
                item
            })
            .collect())
    }

    async fn combined_credits(&self, person_id: i64, _language: &str) -> Result<CombinedCredits, TmdbError> {
        self.derived_calls.fetch_add(1, Ordering::SeqCst);

        let cast = vec![Credit {
            tmdb_id: person_id * 10 + 1,
            title: "Leading Role".to_string(),
            media_type: MediaType::Movie,
            character: Some("Lead".to_string()),
            job: None,
            popularity: 40.0,
            poster_path: None,
            release_date: Some("2020-05-01".to_string()),
            vote_average: 7.5,
        }];
        let crew = vec![Credit {
            tmdb_id: person_id * 10 + 2,
            title: "Behind the Camera".to_string(),
            media_type: MediaType::Series,
            character: None,
            job: Some("Director".to_string()),
            popularity: 20.0,
            poster_path: None,
            release_date: None,
            vote_average: 8.0,
        }];

        Ok(CombinedCredits { person_id, cast, crew })
    }
}
