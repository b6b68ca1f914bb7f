//! TMDB API error types.

use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur when interacting with the TMDB API.
#[derive(Debug, Error)]
pub enum TmdbError {
    /// API key is missing from configuration.
    #[error("missing API key: TMDB_API_KEY environment variable not set")]
    MissingApiKey,

    /// Requested page is outside the range the provider serves.
    #[error("invalid page {page}: must be between 1 and {limit}")]
    InvalidPage { page: u32, limit: u32 },

    /// Filter facets failed validation.
    #[error("invalid filters: {0}")]
    InvalidFilters(String),

    /// Authentication failed (401/403).
    #[error("authentication failed: invalid API key")]
    AuthError,

    /// Requested resource does not exist upstream (404).
    #[error("not found")]
    NotFound,

    /// Rate limited by the API (429).
    #[error("rate limited: too many requests")]
    RateLimited,

    /// Other HTTP error from the API.
    #[error("HTTP error: status {status}")]
    HttpError { status: u16 },

    /// Request timed out.
    #[error("request timeout")]
    Timeout,

    /// Network error during request.
    #[error("network error: {0}")]
    Network(Arc<reqwest::Error>),

    /// Failed to parse API response.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for TmdbError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() { TmdbError::Timeout } else { TmdbError::Network(Arc::new(err)) }
    }
}
