//! TMDB catalog API client.
//!
//! Provides a client for the TMDB v3 API with rate limiting, request
//! validation, and response normalization.
//!
//! ### Specification
//!
//! - **Endpoints**: `/discover/movie`, `/discover/tv`, `/trending/all/week`
//!   for listings; `/movie/{id}/recommendations`, `/tv/{id}/recommendations`
//!   and `/person/{id}/combined_credits` for derived lookups.
//! - **Authentication**: `Authorization: Bearer` read access token.
//! - **Rate Limiting**: fixed minimum interval between requests; no
//!   adaptive backoff.
//! - **Pagination**: every listing is capped at page 500 by the provider.

pub mod error;
pub mod request;
pub mod response;

pub use error::TmdbError;
pub use request::{DiscoverFilters, TMDB_PAGE_LIMIT, validate_page};
pub use response::{CatalogPage, CombinedCredits, Credit};

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;

use reelsync_core::{CatalogItem, Category, MediaType};

/// Default base URL for the TMDB v3 API.
const DEFAULT_BASE_URL: &str = "https://api.themoviedb.org/3";

/// Default request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default content language.
const DEFAULT_LANGUAGE: &str = "en-US";

/// Minimum interval between requests (TMDB allows roughly 40 per 10s).
const MIN_REQUEST_INTERVAL: Duration = Duration::from_millis(250);

/// TMDB API client configuration.
#[derive(Debug, Clone)]
pub struct TmdbConfig {
    /// API read access token from TMDB_API_KEY env var.
    pub api_key: String,
    /// Base URL (default: https://api.themoviedb.org/3).
    pub base_url: String,
    /// Request timeout (default: 10s).
    pub timeout: Duration,
    /// Default content language (default: en-US).
    pub language: String,
}

impl Default for TmdbConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl TmdbConfig {
    /// Load configuration from environment variables.
    ///
    /// Reads TMDB_API_KEY from environment. Returns error if not set.
    pub fn from_env() -> Result<Self, TmdbError> {
        let api_key = std::env::var("TMDB_API_KEY").map_err(|_| TmdbError::MissingApiKey)?;

        Ok(Self { api_key, ..Default::default() })
    }
}

/// Rate limiter to enforce request intervals.
#[derive(Debug)]
struct RateLimiter {
    last_request: Mutex<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(Instant::now().checked_sub(min_interval).unwrap_or_else(Instant::now)),
            min_interval,
        }
    }

    /// Acquire permission to make a request, waiting if necessary.
    async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        let elapsed = last.elapsed();
        if elapsed < self.min_interval {
            tokio::time::sleep(self.min_interval - elapsed).await;
        }
        *last = Instant::now();
    }
}

/// Upstream catalog provider seam.
///
/// The sync engine is written against this trait so it can be driven by a
/// scripted provider in tests instead of the live API.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch one page of a category listing.
    async fn list_page(
        &self, category: Category, page: u32, filters: &DiscoverFilters, language: &str,
    ) -> Result<CatalogPage, TmdbError>;

    /// Fetch recommendations for a movie or series.
    async fn recommendations(
        &self, media_type: MediaType, id: i64, language: &str,
    ) -> Result<Vec<CatalogItem>, TmdbError>;

    /// Fetch a person's combined movie and series credits.
    async fn combined_credits(&self, person_id: i64, language: &str) -> Result<CombinedCredits, TmdbError>;
}

/// TMDB catalog API client.
#[derive(Debug, Clone)]
pub struct TmdbClient {
    http: reqwest::Client,
    config: TmdbConfig,
    rate_limiter: Arc<RateLimiter>,
}

impl TmdbClient {
    /// Create a new TMDB client with the given configuration.
    pub fn new(config: TmdbConfig) -> Result<Self, TmdbError> {
        if config.api_key.is_empty() {
            return Err(TmdbError::MissingApiKey);
        }

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TmdbError::Network(Arc::new(e)))?;

        Ok(Self { http, config, rate_limiter: Arc::new(RateLimiter::new(MIN_REQUEST_INTERVAL)) })
    }

    /// Create a new TMDB client from environment variables.
    pub fn from_env() -> Result<Self, TmdbError> {
        Self::new(TmdbConfig::from_env()?)
    }

    /// Listing endpoint for a category.
    fn list_path(category: Category) -> &'static str {
        match category {
            Category::Movie => "/discover/movie",
            Category::Series => "/discover/tv",
            Category::Trending => "/trending/all/week",
        }
    }

    /// Year facet parameter name; movie and TV discover disagree.
    fn year_param(category: Category) -> &'static str {
        match category {
            Category::Series => "first_air_date_year",
            _ => "primary_release_year",
        }
    }

    /// Execute a GET request and decode the JSON body.
    ///
    /// Handles rate limiting, authentication, and status mapping; callers
    /// only deal with typed responses.
    async fn get_json<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, TmdbError> {
        self.rate_limiter.acquire().await;

        let url = format!("{}{}", self.config.base_url, path);

        let http_response = self
            .http
            .get(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.config.api_key))
            .header(header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(TmdbError::from)?;

        let status = http_response.status();
        tracing::debug!("GET {path} -> {status}");

        if status == 401 || status == 403 {
            return Err(TmdbError::AuthError);
        }

        if status == 404 {
            return Err(TmdbError::NotFound);
        }

        if status == 429 {
            return Err(TmdbError::RateLimited);
        }

        if status.is_client_error() || status.is_server_error() {
            return Err(TmdbError::HttpError { status: status.as_u16() });
        }

        let bytes = http_response.bytes().await.map_err(TmdbError::from)?;
        serde_json::from_slice(&bytes).map_err(|e| TmdbError::Parse(e.to_string()))
    }
}

#[async_trait]
impl CatalogProvider for TmdbClient {
    async fn list_page(
        &self, category: Category, page: u32, filters: &DiscoverFilters, language: &str,
    ) -> Result<CatalogPage, TmdbError> {
        request::validate_page(page)?;
        filters.validate()?;
        if category == Category::Trending && (filters.genre.is_some() || filters.year.is_some()) {
            return Err(TmdbError::InvalidFilters("trending listings do not accept genre or year facets".to_string()));
        }

        let mut query: Vec<(&str, String)> = vec![("language", language.to_string()), ("page", page.to_string())];
        if let Some(genre) = &filters.genre {
            query.push(("with_genres", genre.clone()));
        }
        if let Some(year) = filters.year {
            query.push((Self::year_param(category), year.to_string()));
        }

        let start = Instant::now();
        tracing::debug!("listing {category} page {page}");

        let raw: response::RawListResponse = self.get_json(Self::list_path(category), &query).await?;
        let listing = raw.normalize(category);

        tracing::debug!("listed {category} page {page} in {:?}, {} items", start.elapsed(), listing.items.len());

        Ok(listing)
    }

    async fn recommendations(
        &self, media_type: MediaType, id: i64, language: &str,
    ) -> Result<Vec<CatalogItem>, TmdbError> {
        let (path, category) = match media_type {
            MediaType::Movie => (format!("/movie/{id}/recommendations"), Category::Movie),
            MediaType::Series => (format!("/tv/{id}/recommendations"), Category::Series),
            MediaType::Person => {
                return Err(TmdbError::InvalidFilters(
                    "recommendations exist for movies and series only".to_string(),
                ));
            }
        };

        let query = vec![("language", language.to_string())];
        let raw: response::RawListResponse = self.get_json(&path, &query).await?;

        Ok(raw.normalize(category).items)
    }

    async fn combined_credits(&self, person_id: i64, language: &str) -> Result<CombinedCredits, TmdbError> {
        let path = format!("/person/{person_id}/combined_credits");
        let query = vec![("language", language.to_string())];
        let raw: response::RawCombinedCredits = self.get_json(&path, &query).await?;

        Ok(raw.into())
    }
}
