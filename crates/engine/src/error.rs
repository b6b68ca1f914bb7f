//! Error types for the sync engine.

use reelsync_client::TmdbError;
use thiserror::Error;

/// Errors surfaced by gap-fill synchronization and the serving path.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Requested page lies beyond the provider's hard page cap.
    ///
    /// Raised before any upstream call is made; retrying the same request
    /// can never succeed.
    #[error("page {page} exceeds the provider hard limit of {limit}")]
    PageLimitExceeded { page: u32, limit: u32 },

    /// An upstream fetch failed mid-fill.
    ///
    /// Pages committed before the failure stay committed, so a retry
    /// resumes from where the fill stopped.
    #[error("upstream fetch failed: {0}")]
    Upstream(#[from] TmdbError),

    /// A mirror store operation failed.
    #[error("store error: {0}")]
    Store(#[from] reelsync_core::Error),
}

impl SyncError {
    /// Whether retrying the same request could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Upstream(_))
    }
}
