//! Sync ledger operations.
//!
//! The ledger records which (category, page, filter track) combinations have
//! been fetched from upstream. Entries are keyed uniquely so re-syncing a
//! page updates the existing row in place, and the recorded high-water mark
//! per track is what the gap-fill loop measures its progress against.

use std::collections::BTreeSet;

use super::connection::MirrorDb;
use crate::Error;
use crate::types::Category;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Write-side record for marking a page as synced.
///
/// Timestamps are managed by the store: `synced_at` is set on first insert
/// and preserved across re-syncs, `last_updated_at` is refreshed every time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSync {
    pub category: Category,
    pub page: u32,
    /// Filter track this page belongs to; `None` is the unfiltered track.
    pub filter_signature: Option<String>,
    /// Items actually stored from this page (pre-existing items excluded).
    pub item_count: u32,
    /// Total page count upstream reported alongside this page, if any.
    pub total_pages: Option<u32>,
    pub language: Option<String>,
    /// Free-form JSON for provider metadata worth keeping (result totals etc.).
    pub metadata: Option<String>,
}

/// A ledger row as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncedPage {
    pub category: Category,
    pub page: u32,
    pub filter_signature: Option<String>,
    pub item_count: u32,
    pub total_pages: Option<u32>,
    pub language: Option<String>,
    pub metadata: Option<String>,
    pub synced_at: String,
    pub last_updated_at: String,
}

impl MirrorDb {
    /// Record a page as synced, updating the existing entry on re-sync.
    pub async fn record_page_synced(&self, sync: &PageSync) -> Result<(), Error> {
        let sync = sync.clone();
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO synced_pages (
                        category, page, filter_signature, item_count, total_pages,
                        language, metadata, synced_at, last_updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
                    ON CONFLICT(category, page, filter_signature) DO UPDATE SET
                        item_count = excluded.item_count,
                        total_pages = excluded.total_pages,
                        language = excluded.language,
                        metadata = excluded.metadata,
                        last_updated_at = excluded.last_updated_at",
                    params![
                        sync.category.as_str(),
                        sync.page,
                        sync.filter_signature.as_deref().unwrap_or(""),
                        sync.item_count,
                        sync.total_pages,
                        sync.language,
                        sync.metadata,
                        now,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Whether a ledger entry exists for this page on this track.
    pub async fn is_page_synced(&self, category: Category, page: u32, signature: Option<&str>) -> Result<bool, Error> {
        let category = category.as_str();
        let signature = signature.unwrap_or("").to_string();

        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let exists: bool = conn.query_row(
                    "SELECT EXISTS(
                        SELECT 1 FROM synced_pages
                        WHERE category = ?1 AND page = ?2 AND filter_signature = ?3
                    )",
                    params![category, page, signature],
                    |row| row.get(0),
                )?;
                Ok(exists)
            })
            .await
            .map_err(Error::from)
    }

    /// All synced page numbers for a track, in ascending order.
    pub async fn synced_pages(&self, category: Category, signature: Option<&str>) -> Result<BTreeSet<u32>, Error> {
        let category = category.as_str();
        let signature = signature.unwrap_or("").to_string();

        self.conn
            .call(move |conn| -> Result<BTreeSet<u32>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT page FROM synced_pages WHERE category = ?1 AND filter_signature = ?2",
                )?;
                let pages = stmt
                    .query_map(params![category, signature], |row| row.get::<_, u32>(0))?
                    .collect::<Result<BTreeSet<u32>, _>>()?;
                Ok(pages)
            })
            .await
            .map_err(Error::from)
    }

    /// Highest synced page number for a track, or 0 when nothing is synced.
    pub async fn high_water_mark(&self, category: Category, signature: Option<&str>) -> Result<u32, Error> {
        let category = category.as_str();
        let signature = signature.unwrap_or("").to_string();

        self.conn
            .call(move |conn| -> Result<u32, Error> {
                let mark: u32 = conn.query_row(
                    "SELECT COALESCE(MAX(page), 0) FROM synced_pages
                     WHERE category = ?1 AND filter_signature = ?2",
                    params![category, signature],
                    |row| row.get(0),
                )?;
                Ok(mark)
            })
            .await
            .map_err(Error::from)
    }

    /// Drop the ledger entry for a page. Returns whether an entry existed.
    ///
    /// Only the ledger row is removed; stored catalog items are untouched.
    pub async fn invalidate_page(&self, category: Category, page: u32, signature: Option<&str>) -> Result<bool, Error> {
        let category = category.as_str();
        let signature = signature.unwrap_or("").to_string();

        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute(
                    "DELETE FROM synced_pages WHERE category = ?1 AND page = ?2 AND filter_signature = ?3",
                    params![category, page, signature],
                )?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Fetch the ledger entry for a page, if one exists.
    pub async fn page_sync(
        &self, category: Category, page: u32, signature: Option<&str>,
    ) -> Result<Option<SyncedPage>, Error> {
        let category_str = category.as_str();
        let signature = signature.unwrap_or("").to_string();

        self.conn
            .call(move |conn| -> Result<Option<SyncedPage>, Error> {
                let result = conn.query_row(
                    "SELECT filter_signature, item_count, total_pages, language, metadata,
                            synced_at, last_updated_at
                     FROM synced_pages
                     WHERE category = ?1 AND page = ?2 AND filter_signature = ?3",
                    params![category_str, page, signature],
                    |row| {
                        let stored_signature: String = row.get(0)?;
                        Ok(SyncedPage {
                            category,
                            page,
                            filter_signature: (!stored_signature.is_empty()).then_some(stored_signature),
                            item_count: row.get(1)?,
                            total_pages: row.get(2)?,
                            language: row.get(3)?,
                            metadata: row.get(4)?,
                            synced_at: row.get(5)?,
                            last_updated_at: row.get(6)?,
                        })
                    },
                );

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Most recently reported total page count for a track, if upstream
    /// ever sent one.
    pub async fn last_known_total_pages(
        &self, category: Category, signature: Option<&str>,
    ) -> Result<Option<u32>, Error> {
        let category = category.as_str();
        let signature = signature.unwrap_or("").to_string();

        self.conn
            .call(move |conn| -> Result<Option<u32>, Error> {
                let result = conn.query_row(
                    "SELECT total_pages FROM synced_pages
                     WHERE category = ?1 AND filter_signature = ?2 AND total_pages IS NOT NULL
                     ORDER BY last_updated_at DESC, page DESC LIMIT 1",
                    params![category, signature],
                    |row| row.get::<_, u32>(0),
                );

                match result {
                    Ok(total) => Ok(Some(total)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Total number of ledger entries across all tracks.
    pub async fn ledger_len(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM synced_pages", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
