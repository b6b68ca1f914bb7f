//! Bounded derived-result cache operations.
//!
//! Stores expensive per-title lookups (recommendations, combined credits)
//! as opaque JSON payloads with usage statistics and a write-time relevance
//! score. Reads bump usage from a detached task so the serving path never
//! waits on a write; the ordered eviction primitives here are what the
//! lifecycle routines are built on.

use super::connection::MirrorDb;
use crate::Error;
use crate::types::{DerivedKind, MediaType};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// Key identifying what a derived cache entry is a cache of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DerivedKey {
    pub media_type: MediaType,
    pub media_id: i64,
    pub kind: DerivedKind,
}

impl std::fmt::Display for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{}", self.media_type, self.media_id, self.kind)
    }
}

/// A cached derived result with its usage statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedEntry {
    pub key: DerivedKey,
    /// Opaque JSON payload as fetched from upstream.
    pub payload: String,
    /// Item count recomputed from the payload on every write.
    pub item_count: u32,
    /// Write-time relevance score used as the final eviction tiebreak.
    pub score: f64,
    pub usage_count: i64,
    pub last_accessed_at: Option<String>,
    pub created_at: String,
    pub last_synced_at: String,
}

/// Row counts for the derived cache, for operator visibility.
#[derive(Debug, Clone, Serialize)]
pub struct DerivedCacheStats {
    pub entries: u64,
    pub never_used: u64,
    pub total_hits: u64,
}

impl MirrorDb {
    /// Look up a cached derived result.
    ///
    /// On a hit the usage bump runs in a detached task, so the returned
    /// entry carries the statistics as they were before this access.
    pub async fn get_derived(&self, key: &DerivedKey) -> Result<Option<DerivedEntry>, Error> {
        let k = *key;

        let entry = self
            .conn
            .call(move |conn| -> Result<Option<DerivedEntry>, Error> {
                let result = conn.query_row(
                    "SELECT payload, item_count, score, usage_count, last_accessed_at,
                            created_at, last_synced_at
                     FROM derived_cache
                     WHERE media_type = ?1 AND media_id = ?2 AND kind = ?3",
                    params![k.media_type.as_str(), k.media_id, k.kind.as_str()],
                    |row| {
                        Ok(DerivedEntry {
                            key: k,
                            payload: row.get(0)?,
                            item_count: row.get(1)?,
                            score: row.get(2)?,
                            usage_count: row.get(3)?,
                            last_accessed_at: row.get(4)?,
                            created_at: row.get(5)?,
                            last_synced_at: row.get(6)?,
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
            .map_err(Error::from)?;

        if entry.is_some() {
            let db = self.clone();
            let key = *key;
            tokio::spawn(async move {
                if let Err(e) = db.bump_derived_usage(&key).await {
                    tracing::debug!("usage bump for {key} failed: {e}");
                }
            });
        }

        Ok(entry)
    }

    /// Increment the hit counter and stamp the access time for an entry.
    pub async fn bump_derived_usage(&self, key: &DerivedKey) -> Result<(), Error> {
        let key = *key;
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "UPDATE derived_cache
                     SET usage_count = usage_count + 1, last_accessed_at = ?4
                     WHERE media_type = ?1 AND media_id = ?2 AND kind = ?3",
                    params![key.media_type.as_str(), key.media_id, key.kind.as_str(), now],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Store a derived result, fully replacing any existing entry.
    ///
    /// Delete-then-insert keeps writes free of partial merges: the item
    /// count is recomputed from the payload and the usage statistics start
    /// over for the new entry.
    pub async fn put_derived(&self, key: &DerivedKey, payload: &str, score: f64) -> Result<(), Error> {
        let key = *key;
        let payload = payload.to_string();
        let item_count = payload_item_count(&payload);
        let now = chrono::Utc::now().to_rfc3339();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM derived_cache WHERE media_type = ?1 AND media_id = ?2 AND kind = ?3",
                    params![key.media_type.as_str(), key.media_id, key.kind.as_str()],
                )?;
                tx.execute(
                    "INSERT INTO derived_cache (
                        media_type, media_id, kind, payload, item_count, score,
                        usage_count, last_accessed_at, created_at, last_synced_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, NULL, ?7, ?7)",
                    params![key.media_type.as_str(), key.media_id, key.kind.as_str(), payload, item_count, score, now],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries that were never used and are older than the cutoff.
    /// Returns the number of rows removed.
    pub async fn purge_unused_derived(&self, max_age_days: u32) -> Result<u64, Error> {
        let cutoff = (chrono::Utc::now() - chrono::Duration::days(i64::from(max_age_days))).to_rfc3339();

        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let deleted = conn.execute(
                    "DELETE FROM derived_cache WHERE usage_count = 0 AND created_at < ?1",
                    params![cutoff],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Trim the cache down to `target` entries, least valuable first.
    ///
    /// Eviction order is lowest usage count, then least recently accessed
    /// with never-accessed entries first (NULL sorts lowest), then lowest
    /// score. Returns the number of rows removed; 0 when already within
    /// the target.
    pub async fn trim_derived_to(&self, target: u64) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM derived_cache", [], |row| row.get(0))?;
                let excess = (count as u64).saturating_sub(target);
                if excess == 0 {
                    return Ok(0);
                }

                let deleted = conn.execute(
                    "DELETE FROM derived_cache WHERE id IN (
                        SELECT id FROM derived_cache
                        ORDER BY usage_count ASC, last_accessed_at ASC, score ASC
                        LIMIT ?1
                    )",
                    params![excess as i64],
                )?;
                Ok(deleted as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries in the derived cache.
    pub async fn derived_len(&self) -> Result<u64, Error> {
        self.conn
            .call(|conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row("SELECT COUNT(*) FROM derived_cache", [], |row| row.get(0))?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Aggregate usage statistics over the whole cache.
    pub async fn derived_stats(&self) -> Result<DerivedCacheStats, Error> {
        self.conn
            .call(|conn| -> Result<DerivedCacheStats, Error> {
                let stats = conn.query_row(
                    "SELECT COUNT(*),
                            COUNT(*) FILTER (WHERE usage_count = 0),
                            COALESCE(SUM(usage_count), 0)
                     FROM derived_cache",
                    [],
                    |row| {
                        Ok(DerivedCacheStats {
                            entries: row.get::<_, i64>(0)? as u64,
                            never_used: row.get::<_, i64>(1)? as u64,
                            total_hits: row.get::<_, i64>(2)? as u64,
                        })
                    },
                )?;
                Ok(stats)
            })
            .await
            .map_err(Error::from)
    }
}

/// Number of items a payload carries: the array length for list payloads,
/// the summed lengths of top-level array fields for object payloads.
fn payload_item_count(payload: &str) -> u32 {
    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(serde_json::Value::Array(items)) => items.len() as u32,
        Ok(serde_json::Value::Object(map)) => {
            map.values().filter_map(|v| v.as_array().map(|a| a.len() as u32)).sum()
        }
        _ => 0,
    }
}
