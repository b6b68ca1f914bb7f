//! Shared vocabulary types for catalog tracks and the derived-result cache.

use serde::{Deserialize, Serialize};

/// Catalog listing a page belongs to.
///
/// Each category is an independently paginated listing upstream, so sync
/// state is tracked per category (and per filter signature within it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Movie,
    Series,
    Trending,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Movie, Category::Series, Category::Trending];

    /// Stable string form used in database rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Movie => "movie",
            Category::Series => "series",
            Category::Trending => "trending",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media kind a derived result is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaType {
    Movie,
    Series,
    Person,
}

impl MediaType {
    /// Stable string form used in database rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaType::Movie => "movie",
            MediaType::Series => "series",
            MediaType::Person => "person",
        }
    }
}

impl std::fmt::Display for MediaType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of per-title derived result held in the bounded cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DerivedKind {
    Recommendations,
    CombinedCredits,
}

impl DerivedKind {
    /// Stable string form used in database rows.
    pub fn as_str(&self) -> &'static str {
        match self {
            DerivedKind::Recommendations => "recommendations",
            DerivedKind::CombinedCredits => "combined_credits",
        }
    }
}

impl std::fmt::Display for DerivedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
