//! Schema migrations for the mirror database.
//!
//! Applied migrations are tracked in a `_migrations` version table; each
//! entry below is a SQL batch bundled into the binary at compile time.

use crate::Error;
use tokio_rusqlite::{Connection, params};

/// Ordered migration list. Versions are strictly increasing; a database is
/// up to date when its recorded version matches the last entry.
const MIGRATIONS: &[(i64, &str)] = &[
    (1, include_str!("../../migrations/001_catalog_items.sql")),
    (2, include_str!("../../migrations/002_synced_pages.sql")),
    (3, include_str!("../../migrations/003_derived_cache.sql")),
];

/// Bring the schema up to date, applying any migrations past the recorded
/// version in order.
///
/// # Errors
///
/// Returns [`Error::MigrationFailed`] naming the version whose SQL batch
/// failed; earlier batches stay applied.
pub async fn run(conn: &Connection) -> Result<(), Error> {
    conn.call(|conn| -> Result<(), Error> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS _migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            )",
            [],
        )
        .map_err(Error::from)?;

        let current: i64 = conn
            .query_row("SELECT COALESCE(MAX(version), 0) FROM _migrations", [], |row| row.get(0))
            .map_err(Error::from)?;

        for (version, sql) in MIGRATIONS {
            if *version <= current {
                continue;
            }
            conn.execute_batch(sql).map_err(|e| Error::MigrationFailed(format!("{version}: {e}")))?;
            conn.execute(
                "INSERT INTO _migrations (version, applied_at) VALUES (?1, ?2)",
                params![version, chrono::Utc::now().to_rfc3339()],
            )
            .map_err(Error::from)?;
            tracing::debug!("applied schema migration {version}");
        }

        Ok(())
    })
    .await
    .map_err(Error::from)
}
