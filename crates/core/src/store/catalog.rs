//! Catalog mirror operations.
//!
//! The narrow primary-store interface the gap-fill path is built on:
//! idempotent inserts keyed by upstream id, page presence counts, and the
//! consumer read path. Bulk fills skip items that already exist instead of
//! rewriting them, so an item keeps its original page placement even when
//! upstream later serves it on a different page.

use super::connection::MirrorDb;
use crate::Error;
use crate::types::Category;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;

/// A catalog item as mirrored from upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub category: Category,
    /// Upstream id; unique per category.
    pub tmdb_id: i64,
    pub title: String,
    pub original_language: Option<String>,
    pub overview: Option<String>,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub popularity: f64,
    pub vote_average: f64,
}

impl MirrorDb {
    /// Insert an item unless a row with the same upstream id already exists
    /// in this category. Returns whether a row was stored.
    pub async fn insert_item_if_absent(
        &self, item: &CatalogItem, page: u32, signature: Option<&str>,
    ) -> Result<bool, Error> {
        let item = item.clone();
        let signature = signature.unwrap_or("").to_string();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let inserted = conn.execute(
                    "INSERT INTO catalog_items (
                        category, tmdb_id, title, original_language, overview, poster_path,
                        release_date, popularity, vote_average, page, filter_signature,
                        created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
                    ON CONFLICT(category, tmdb_id) DO NOTHING",
                    params![
                        item.category.as_str(),
                        item.tmdb_id,
                        item.title,
                        item.original_language,
                        item.overview,
                        item.poster_path,
                        item.release_date,
                        item.popularity,
                        item.vote_average,
                        page,
                        signature,
                        now,
                    ],
                )?;
                Ok(inserted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of rows stored for a page, blocked rows included.
    ///
    /// This measures storage presence, not visibility: the gap-fill path
    /// uses it to decide whether a ledger entry is backed by real rows.
    pub async fn count_items_on_page(
        &self, category: Category, page: u32, signature: Option<&str>,
    ) -> Result<u64, Error> {
        let category = category.as_str();
        let signature = signature.unwrap_or("").to_string();

        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM catalog_items
                     WHERE category = ?1 AND page = ?2 AND filter_signature = ?3",
                    params![category, page, signature],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Items on a page as served to consumers: blocked rows excluded,
    /// ordered by popularity with upstream id as tiebreak.
    pub async fn page_items(
        &self, category: Category, page: u32, signature: Option<&str>,
    ) -> Result<Vec<CatalogItem>, Error> {
        let category_str = category.as_str();
        let signature = signature.unwrap_or("").to_string();

        self.conn
            .call(move |conn| -> Result<Vec<CatalogItem>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT tmdb_id, title, original_language, overview, poster_path,
                            release_date, popularity, vote_average
                     FROM catalog_items
                     WHERE category = ?1 AND page = ?2 AND filter_signature = ?3 AND is_blocked = 0
                     ORDER BY popularity DESC, tmdb_id ASC",
                )?;
                let items = stmt
                    .query_map(params![category_str, page, signature], |row| {
                        Ok(CatalogItem {
                            category,
                            tmdb_id: row.get(0)?,
                            title: row.get(1)?,
                            original_language: row.get(2)?,
                            overview: row.get(3)?,
                            poster_path: row.get(4)?,
                            release_date: row.get(5)?,
                            popularity: row.get(6)?,
                            vote_average: row.get(7)?,
                        })
                    })?
                    .collect::<Result<Vec<CatalogItem>, _>>()?;
                Ok(items)
            })
            .await
            .map_err(Error::from)
    }

    /// Total number of mirrored items across all categories.
    pub async fn catalog_len(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM catalog_items", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
