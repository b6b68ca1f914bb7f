//! Catalog listing filters and request validation.

use serde::{Deserialize, Serialize};

use super::error::TmdbError;

/// Hard maximum page number TMDB serves for any paginated listing.
pub const TMDB_PAGE_LIMIT: u32 = 500;

/// Accepted range for the release-year facet.
const MIN_FACET_YEAR: i32 = 1888;
const MAX_FACET_YEAR: i32 = 2100;

/// Non-default query facets for a catalog listing.
///
/// Each distinct combination of facets partitions a category's pagination
/// space into its own track, synced and gap-filled independently of the
/// unfiltered listing. The `language` facet participates in the track
/// identity but not in query building; callers resolve the effective
/// request language themselves.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoverFilters {
    /// TMDB genre id, or a comma-separated list of ids.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genre: Option<String>,

    /// Release year (first air year for series).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,

    /// Non-default content language (e.g. "de-DE").
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl DiscoverFilters {
    /// Whether no facet is set (the unfiltered track).
    pub fn is_empty(&self) -> bool {
        self.genre.is_none() && self.year.is_none() && self.language.is_none()
    }

    /// Stable signature identifying this filter track.
    ///
    /// Returns `None` for the unfiltered track. Two filter sets produce the
    /// same signature exactly when their facets match.
    pub fn signature(&self) -> Option<String> {
        let mut facets: Vec<(&str, String)> = Vec::new();
        if let Some(genre) = &self.genre {
            facets.push(("genre", genre.clone()));
        }
        if let Some(year) = self.year {
            facets.push(("year", year.to_string()));
        }
        if let Some(language) = &self.language {
            facets.push(("language", language.clone()));
        }

        reelsync_core::store::facet_signature(&facets)
    }

    /// Validate facet values before they reach the wire.
    ///
    /// # Errors
    ///
    /// Returns `TmdbError::InvalidFilters` if:
    /// - `genre` is empty or contains anything but digits and commas
    /// - `year` is outside the plausible release-year range
    /// - `language` is empty
    pub fn validate(&self) -> Result<(), TmdbError> {
        if let Some(genre) = &self.genre {
            if genre.is_empty() {
                return Err(TmdbError::InvalidFilters("genre cannot be empty".to_string()));
            }
            if !genre.chars().all(|c| c.is_ascii_digit() || c == ',') {
                return Err(TmdbError::InvalidFilters(format!("genre must be numeric TMDB ids: {genre}")));
            }
        }

        if let Some(year) = self.year
            && !(MIN_FACET_YEAR..=MAX_FACET_YEAR).contains(&year)
        {
            return Err(TmdbError::InvalidFilters(format!("implausible year: {year}")));
        }

        if let Some(language) = &self.language
            && language.is_empty()
        {
            return Err(TmdbError::InvalidFilters("language cannot be empty".to_string()));
        }

        Ok(())
    }
}

/// Validate a requested page number against the TMDB hard cap.
///
/// # Errors
///
/// Returns `TmdbError::InvalidPage` for page 0 or pages past the cap.
pub fn validate_page(page: u32) -> Result<(), TmdbError> {
    if page < 1 || page > TMDB_PAGE_LIMIT {
        return Err(TmdbError::InvalidPage { page, limit: TMDB_PAGE_LIMIT });
    }
    Ok(())
}
