//! SQLite-backed stores for the catalog mirror.
//!
//! One database file holds three tables with distinct lifecycles:
//!
//! - `catalog_items`: the primary mirror of upstream listings. Grows as
//!   pages are synced; never evicted here.
//! - `synced_pages`: the sync ledger recording which pages of which track
//!   have been fetched, and the high-water mark derived from it.
//! - `derived_cache`: bounded usage-ranked storage for expensive per-title
//!   lookups, evicted by the lifecycle routines.
//!
//! All operations go through [`MirrorDb`], which runs SQLite work on a
//! background thread via tokio-rusqlite.

pub mod catalog;
pub mod connection;
pub mod derived;
pub mod ledger;
pub mod migrations;
pub mod signature;

pub use crate::error::Error;
pub use catalog::CatalogItem;
pub use connection::MirrorDb;
pub use derived::{DerivedCacheStats, DerivedEntry, DerivedKey};
pub use ledger::{PageSync, SyncedPage};
pub use signature::facet_signature;
