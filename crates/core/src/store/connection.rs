//! Mirror database handle and connection setup.
//!
//! One SQLite database holds all three tables of this subsystem: the
//! catalog mirror, the sync ledger, and the derived cache. WAL mode keeps
//! page reads serving while a background gap fill is writing.

use super::migrations;
use crate::Error;
use std::path::Path;
use tokio_rusqlite::Connection;

/// Pragmas applied to every connection before use.
const CONNECTION_PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;
     PRAGMA foreign_keys=ON;";

/// Handle to the mirror database.
///
/// Wraps a tokio-rusqlite Connection that runs database operations on a
/// background thread; clones share the same connection.
#[derive(Clone, Debug)]
pub struct MirrorDb {
    pub(crate) conn: Connection,
}

impl MirrorDb {
    /// Open the database at `path`, creating the file if needed.
    ///
    /// Applies connection pragmas and brings the schema up to date before
    /// returning, so a successful open is ready for use.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    /// Open a throwaway in-memory database with the full schema applied.
    pub async fn open_in_memory() -> Result<Self, Error> {
        let conn = Connection::open_in_memory().await.map_err(|e| Error::Database(e.into()))?;
        Self::prepare(conn).await
    }

    async fn prepare(conn: Connection) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(CONNECTION_PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn })
    }
}
