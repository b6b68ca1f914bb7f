//! Synchronization engine for the catalog mirror.
//!
//! The mirror holds only the listing pages someone has actually asked
//! for. [`CatalogService`] is the read front end: local rows are served
//! as-is, and a miss triggers [`GapFill`], which pulls the missing pages
//! from the upstream provider in bounded windows and records each one in
//! the sync ledger. Around that core sit the readahead advisor
//! ([`prefetch`]), the cache-backed derived-data fetchers
//! ([`DerivedFetcher`]), and the derived-cache lifecycle routines
//! ([`CacheLifecycle`]).

pub mod derived;
pub mod error;
pub mod fill;
pub mod lifecycle;
pub mod prefetch;
pub mod service;
pub mod window;

#[cfg(test)]
pub(crate) mod testutil;

pub use derived::DerivedFetcher;
pub use error::SyncError;
pub use fill::{FillOptions, FillReport, GapFill};
pub use lifecycle::{CacheLifecycle, CleanupReport};
pub use service::{CatalogService, PageInfo, PageResponse};
pub use window::{FetchWindow, MAX_WINDOW_PAGES, compute_window};
