//! Derived-cache lifecycle routines.
//!
//! The cache grows with request traffic and nothing on the hot path
//! shrinks it. These routines run from the operator CLI or a monitor
//! hook, never inline with a read or write.

use serde::Serialize;

use crate::error::SyncError;
use reelsync_core::MirrorDb;

/// What a major cleanup did to the cache row count.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct CleanupReport {
    pub before: u64,
    pub deleted: u64,
    pub after: u64,
}

/// Operator-facing cache maintenance.
pub struct CacheLifecycle {
    db: MirrorDb,
}

impl CacheLifecycle {
    pub fn new(db: MirrorDb) -> Self {
        Self { db }
    }

    /// Delete entries that were never read and are older than
    /// `max_age_days`. Cheap and safe to run anytime.
    ///
    /// # Errors
    ///
    /// Propagates store failures as [`SyncError::Store`].
    pub async fn light_cleanup(&self, max_age_days: u32) -> Result<u64, SyncError> {
        let deleted = self.db.purge_unused_derived(max_age_days).await?;
        if deleted > 0 {
            tracing::info!("light cleanup removed {deleted} never-used cache entries older than {max_age_days}d");
        }
        Ok(deleted)
    }

    /// Trim the cache to at most `target` rows by evicting the
    /// lowest-value entries. A cache already at or under the target is
    /// left untouched and reported as such.
    ///
    /// # Errors
    ///
    /// Propagates store failures as [`SyncError::Store`].
    pub async fn major_cleanup(&self, target: u64) -> Result<CleanupReport, SyncError> {
        let before = self.db.derived_len().await?;
        let deleted = self.db.trim_derived_to(target).await?;
        let report = CleanupReport { before, deleted, after: before - deleted };
        if deleted > 0 {
            tracing::info!("major cleanup evicted {deleted} cache entries ({before} -> {} rows)", report.after);
        }
        Ok(report)
    }

    /// Monitor hook: run a major cleanup only once the cache has drifted
    /// to at least twice the target, so routine traffic near the bound
    /// does not trigger constant trimming.
    ///
    /// # Errors
    ///
    /// Propagates store failures as [`SyncError::Store`].
    pub async fn enforce_bound(&self, target: u64) -> Result<Option<CleanupReport>, SyncError> {
        let count = self.db.derived_len().await?;
        if count < target.saturating_mul(2) {
            return Ok(None);
        }
        tracing::info!("cache at {count} rows, at least double the {target} target, trimming");
        self.major_cleanup(target).await.map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::mem_db;
    use reelsync_core::{DerivedKey, DerivedKind, MediaType};

    fn key(media_id: i64) -> DerivedKey {
        DerivedKey { media_type: MediaType::Movie, media_id, kind: DerivedKind::Recommendations }
    }

    async fn put_entries(db: &MirrorDb, count: i64) {
        for media_id in 0..count {
            db.put_derived(&key(media_id), "[]", media_id as f64).await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_light_cleanup_spares_used_and_fresh_entries() {
        let db = mem_db().await;
        let lifecycle = CacheLifecycle::new(db.clone());
        put_entries(&db, 2).await;
        db.bump_derived_usage(&key(0)).await.unwrap();

        // Both entries are minutes old at most.
        assert_eq!(lifecycle.light_cleanup(30).await.unwrap(), 0);

        // Cutoff of now: only the never-used entry goes.
        assert_eq!(lifecycle.light_cleanup(0).await.unwrap(), 1);
        assert!(db.get_derived(&key(0)).await.unwrap().is_some());
        assert!(db.get_derived(&key(1)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_major_cleanup_keeps_the_most_used_rows() {
        let db = mem_db().await;
        let lifecycle = CacheLifecycle::new(db.clone());
        put_entries(&db, 6).await;
        for media_id in 0..6 {
            for _ in 0..media_id {
                db.bump_derived_usage(&key(media_id)).await.unwrap();
            }
        }

        let report = lifecycle.major_cleanup(2).await.unwrap();

        assert_eq!(report, CleanupReport { before: 6, deleted: 4, after: 2 });
        assert_eq!(db.derived_len().await.unwrap(), 2);
        assert!(db.get_derived(&key(4)).await.unwrap().is_some());
        assert!(db.get_derived(&key(5)).await.unwrap().is_some());
        assert!(db.get_derived(&key(0)).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_major_cleanup_noop_under_target() {
        let db = mem_db().await;
        let lifecycle = CacheLifecycle::new(db.clone());
        put_entries(&db, 2).await;

        let report = lifecycle.major_cleanup(5).await.unwrap();

        assert_eq!(report, CleanupReport { before: 2, deleted: 0, after: 2 });
        assert_eq!(db.derived_len().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_enforce_bound_waits_for_double_target() {
        let db = mem_db().await;
        let lifecycle = CacheLifecycle::new(db.clone());
        put_entries(&db, 3).await;

        assert_eq!(lifecycle.enforce_bound(2).await.unwrap(), None);
        assert_eq!(db.derived_len().await.unwrap(), 3);

        db.put_derived(&key(100), "[]", 0.5).await.unwrap();
        let report = lifecycle.enforce_bound(2).await.unwrap().unwrap();

        assert_eq!(report.after, 2);
        assert_eq!(db.derived_len().await.unwrap(), 2);
    }
}
