//! Core types and shared functionality for reelsync.
//!
//! This crate provides:
//! - Mirror, ledger, and derived-cache stores with SQLite backend
//! - Unified error types
//! - Configuration structures
//! - Shared vocabulary types for categories and derived results

pub mod config;
pub mod error;
pub mod store;
pub mod types;

pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use store::{CatalogItem, DerivedCacheStats, DerivedEntry, DerivedKey, MirrorDb, PageSync, SyncedPage};
pub use types::{Category, DerivedKind, MediaType};
