//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (REELSYNC_*)
//! 2. TOML config file (if REELSYNC_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (REELSYNC_*)
/// 2. TOML config file (if REELSYNC_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// TMDB API read access token.
    ///
    /// Set via REELSYNC_TMDB_API_KEY environment variable.
    /// Required only when a request actually reaches upstream.
    #[serde(default)]
    pub tmdb_api_key: Option<String>,

    /// Path to the SQLite mirror database.
    ///
    /// Set via REELSYNC_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Base URL for the TMDB v3 API.
    ///
    /// Set via REELSYNC_TMDB_BASE_URL environment variable.
    #[serde(default = "default_tmdb_base_url")]
    pub tmdb_base_url: String,

    /// Default content language for upstream requests.
    ///
    /// Set via REELSYNC_LANGUAGE environment variable.
    #[serde(default = "default_language")]
    pub language: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via REELSYNC_REQUEST_TIMEOUT_MS environment variable.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Courtesy delay between consecutive page fetches in milliseconds.
    ///
    /// Set via REELSYNC_INTER_PAGE_DELAY_MS environment variable.
    #[serde(default = "default_inter_page_delay_ms")]
    pub inter_page_delay_ms: u64,

    /// Highest page number the upstream provider serves.
    ///
    /// Set via REELSYNC_PAGE_HARD_LIMIT environment variable.
    #[serde(default = "default_page_hard_limit")]
    pub page_hard_limit: u32,

    /// Target row count the derived cache is trimmed down to.
    ///
    /// Set via REELSYNC_CACHE_TARGET_SIZE environment variable.
    #[serde(default = "default_cache_target_size")]
    pub cache_target_size: u64,

    /// Age in days after which never-used cache entries are purged.
    ///
    /// Set via REELSYNC_CACHE_MAX_IDLE_DAYS environment variable.
    #[serde(default = "default_cache_max_idle_days")]
    pub cache_max_idle_days: u32,

    /// Whether serving a page kicks off background readahead of the next.
    ///
    /// Set via REELSYNC_PREFETCH_ENABLED environment variable.
    #[serde(default = "default_true")]
    pub prefetch_enabled: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./reelsync.sqlite")
}

fn default_tmdb_base_url() -> String {
    "https://api.themoviedb.org/3".into()
}

fn default_language() -> String {
    "en-US".into()
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_inter_page_delay_ms() -> u64 {
    250
}

fn default_page_hard_limit() -> u32 {
    500
}

fn default_cache_target_size() -> u64 {
    5_000
}

fn default_cache_max_idle_days() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tmdb_api_key: None,
            db_path: default_db_path(),
            tmdb_base_url: default_tmdb_base_url(),
            language: default_language(),
            request_timeout_ms: default_request_timeout_ms(),
            inter_page_delay_ms: default_inter_page_delay_ms(),
            page_hard_limit: default_page_hard_limit(),
            cache_target_size: default_cache_target_size(),
            cache_max_idle_days: default_cache_max_idle_days(),
            prefetch_enabled: true,
        }
    }
}

impl AppConfig {
    /// Request timeout as Duration for use with reqwest/tokio.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Inter-page delay as Duration for use with tokio.
    pub fn inter_page_delay(&self) -> Duration {
        Duration::from_millis(self.inter_page_delay_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `REELSYNC_`
    /// 2. TOML file from `REELSYNC_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("REELSYNC_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("REELSYNC_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Check if the TMDB API key is available (for deferred validation).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` if the TMDB API key is not set.
    pub fn require_tmdb_api_key(&self) -> Result<&str, ConfigError> {
        self.tmdb_api_key.as_deref().ok_or_else(|| ConfigError::Missing {
            field: "tmdb_api_key".into(),
            hint: "Set REELSYNC_TMDB_API_KEY environment variable".into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.db_path, PathBuf::from("./reelsync.sqlite"));
        assert_eq!(config.tmdb_base_url, "https://api.themoviedb.org/3");
        assert_eq!(config.language, "en-US");
        assert_eq!(config.request_timeout_ms, 10_000);
        assert_eq!(config.inter_page_delay_ms, 250);
        assert_eq!(config.page_hard_limit, 500);
        assert_eq!(config.cache_target_size, 5_000);
        assert_eq!(config.cache_max_idle_days, 30);
        assert!(config.prefetch_enabled);
        assert!(config.tmdb_api_key.is_none());
    }

    #[test]
    fn test_duration_helpers() {
        let config = AppConfig::default();
        assert_eq!(config.request_timeout(), Duration::from_millis(10_000));
        assert_eq!(config.inter_page_delay(), Duration::from_millis(250));
    }

    #[test]
    fn test_load_layers_env_over_file_over_defaults() {
        let original_file = std::env::var("REELSYNC_CONFIG_FILE").ok();
        let original_language = std::env::var("REELSYNC_LANGUAGE").ok();
        let original_target = std::env::var("REELSYNC_CACHE_TARGET_SIZE").ok();

        let dir = std::env::temp_dir().join(format!("reelsync-config-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let config_path = dir.join("reelsync.toml");
        std::fs::write(&config_path, "language = \"fr-FR\"\npage_hard_limit = 300\n").unwrap();

        unsafe {
            std::env::set_var("REELSYNC_CONFIG_FILE", &config_path);
            std::env::set_var("REELSYNC_LANGUAGE", "de-DE");
            std::env::set_var("REELSYNC_CACHE_TARGET_SIZE", "1234");
        }

        let config = AppConfig::load().unwrap();

        // Both the file and the environment set language; the environment wins.
        assert_eq!(config.language, "de-DE");
        // Only the file sets page_hard_limit; it beats the built-in default.
        assert_eq!(config.page_hard_limit, 300);
        // Environment strings parse into non-string fields.
        assert_eq!(config.cache_target_size, 1234);
        // Keys no layer touches keep their defaults.
        assert_eq!(config.request_timeout_ms, 10_000);

        unsafe {
            match original_file {
                Some(value) => std::env::set_var("REELSYNC_CONFIG_FILE", value),
                None => std::env::remove_var("REELSYNC_CONFIG_FILE"),
            }
            match original_language {
                Some(value) => std::env::set_var("REELSYNC_LANGUAGE", value),
                None => std::env::remove_var("REELSYNC_LANGUAGE"),
            }
            match original_target {
                Some(value) => std::env::set_var("REELSYNC_CACHE_TARGET_SIZE", value),
                None => std::env::remove_var("REELSYNC_CACHE_TARGET_SIZE"),
            }
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_require_tmdb_api_key_missing() {
        let config = AppConfig::default();
        let result = config.require_tmdb_api_key();
        assert!(matches!(result, Err(ConfigError::Missing { .. })));
    }

    #[test]
    fn test_require_tmdb_api_key_present() {
        let config = AppConfig { tmdb_api_key: Some("test-key".into()), ..Default::default() };
        let result = config.require_tmdb_api_key();
        assert_eq!(result.unwrap(), "test-key");
    }
}
