//! Upstream client code for reelsync.
//!
//! This crate provides the TMDB catalog API client and the provider trait
//! the sync engine is written against.

pub mod tmdb;

pub use tmdb::{
    CatalogPage, CatalogProvider, CombinedCredits, Credit, DiscoverFilters, TMDB_PAGE_LIMIT, TmdbClient, TmdbConfig,
    TmdbError,
};
