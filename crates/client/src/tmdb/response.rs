//! TMDB API response types and normalization.
//!
//! Raw types mirror the wire format, which is not uniform: movie listings
//! carry `title`/`release_date`, TV listings carry `name`/`first_air_date`,
//! and trending listings mix both plus `person` entries. Normalization
//! flattens all of them into [`CatalogItem`] rows.

use serde::{Deserialize, Serialize};

use reelsync_core::{CatalogItem, Category, MediaType};

/// Raw paginated listing envelope from TMDB.
#[derive(Debug, Deserialize)]
pub struct RawListResponse {
    pub page: u32,
    #[serde(default)]
    pub results: Vec<RawListItem>,
    pub total_pages: u32,
    pub total_results: u64,
}

/// Raw listing entry.
#[derive(Debug, Deserialize)]
pub struct RawListItem {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub original_language: Option<String>,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub vote_average: f64,
    /// Present in trending and recommendation listings.
    #[serde(default)]
    pub media_type: Option<String>,
}

/// A normalized page of catalog items.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogPage {
    pub page: u32,
    pub total_pages: u32,
    pub total_results: u64,
    pub items: Vec<CatalogItem>,
}

impl RawListResponse {
    /// Normalize a raw listing into catalog items tagged with `category`.
    ///
    /// Trending listings mix media types; `person` entries are dropped
    /// since the catalog mirrors works, not people. Entries without any
    /// usable display title are dropped as well.
    pub fn normalize(self, category: Category) -> CatalogPage {
        let items = self
            .results
            .into_iter()
            .filter(|raw| raw.media_type.as_deref() != Some("person"))
            .filter_map(|raw| raw.normalize(category))
            .collect();

        CatalogPage { page: self.page, total_pages: self.total_pages, total_results: self.total_results, items }
    }
}

impl RawListItem {
    fn normalize(self, category: Category) -> Option<CatalogItem> {
        let title = self.title.or(self.name)?;
        Some(CatalogItem {
            category,
            tmdb_id: self.id,
            title,
            original_language: self.original_language,
            overview: self.overview,
            poster_path: self.poster_path,
            release_date: self.release_date.or(self.first_air_date),
            popularity: self.popularity,
            vote_average: self.vote_average,
        })
    }
}

/// Raw combined-credits envelope from TMDB.
#[derive(Debug, Deserialize)]
pub struct RawCombinedCredits {
    pub id: i64,
    #[serde(default)]
    pub cast: Vec<RawCredit>,
    #[serde(default)]
    pub crew: Vec<RawCredit>,
}

/// Raw credit entry; mixes movie and TV shapes like trending does.
#[derive(Debug, Deserialize)]
pub struct RawCredit {
    pub id: i64,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default)]
    pub character: Option<String>,
    #[serde(default)]
    pub job: Option<String>,
    #[serde(default)]
    pub popularity: f64,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub first_air_date: Option<String>,
    #[serde(default)]
    pub vote_average: f64,
}

/// A person's combined movie and series credits.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedCredits {
    pub person_id: i64,
    pub cast: Vec<Credit>,
    pub crew: Vec<Credit>,
}

/// One credited work.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credit {
    pub tmdb_id: i64,
    pub title: String,
    pub media_type: MediaType,
    pub character: Option<String>,
    pub job: Option<String>,
    pub popularity: f64,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: f64,
}

impl From<RawCombinedCredits> for CombinedCredits {
    fn from(raw: RawCombinedCredits) -> Self {
        CombinedCredits {
            person_id: raw.id,
            cast: raw.cast.into_iter().filter_map(RawCredit::normalize).collect(),
            crew: raw.crew.into_iter().filter_map(RawCredit::normalize).collect(),
        }
    }
}

impl RawCredit {
    /// Credits for anything but a movie or series are dropped.
    fn normalize(self) -> Option<Credit> {
        let media_type = match self.media_type.as_deref() {
            Some("movie") => MediaType::Movie,
            Some("tv") => MediaType::Series,
            _ => return None,
        };

        Some(Credit {
            tmdb_id: self.id,
            title: self.title.or(self.name)?,
            media_type,
            character: self.character,
            job: self.job,
            popularity: self.popularity,
            poster_path: self.poster_path,
            release_date: self.release_date.or(self.first_air_date),
            vote_average: self.vote_average,
        })
    }
}
