//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `request_timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `inter_page_delay_ms` exceeds 10 seconds
    /// - `page_hard_limit` is 0 or exceeds 1000
    /// - `cache_target_size` is 0
    /// - `language` or `tmdb_base_url` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout_ms < 100 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms".into(),
                reason: "must be at least 100ms".into(),
            });
        }
        if self.request_timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "request_timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.inter_page_delay_ms > 10_000 {
            return Err(ConfigError::Invalid {
                field: "inter_page_delay_ms".into(),
                reason: "must not exceed 10 seconds (10000ms)".into(),
            });
        }

        if self.page_hard_limit == 0 {
            return Err(ConfigError::Invalid {
                field: "page_hard_limit".into(),
                reason: "must be greater than 0".into(),
            });
        }
        if self.page_hard_limit > 1_000 {
            return Err(ConfigError::Invalid {
                field: "page_hard_limit".into(),
                reason: "must not exceed 1000".into(),
            });
        }

        if self.cache_target_size == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_target_size".into(),
                reason: "must be greater than 0".into(),
            });
        }

        if self.language.is_empty() {
            return Err(ConfigError::Invalid { field: "language".into(), reason: "must not be empty".into() });
        }

        if self.tmdb_base_url.is_empty() {
            return Err(ConfigError::Invalid { field: "tmdb_base_url".into(), reason: "must not be empty".into() });
        }

        Ok(())
    }
}
