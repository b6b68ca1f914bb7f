//! Derived-result fetchers over the bounded cache.
//!
//! Recommendations and combined credits are expensive upstream lookups
//! with long shelf lives. Both fetchers read through the derived cache: a
//! hit serves the stored payload with no upstream call, a miss fetches
//! fresh data, returns it immediately, and writes it back from a detached
//! task so the missing caller never pays the cache-write latency. Cache
//! failures of any kind degrade to an upstream fetch instead of failing
//! the lookup.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::SyncError;
use reelsync_client::{CatalogProvider, CombinedCredits};
use reelsync_core::{CatalogItem, DerivedKey, DerivedKind, MediaType, MirrorDb};

/// Cache-backed access to per-title and per-person derived data.
pub struct DerivedFetcher {
    db: MirrorDb,
    provider: Arc<dyn CatalogProvider>,
}

impl DerivedFetcher {
    pub fn new(db: MirrorDb, provider: Arc<dyn CatalogProvider>) -> Self {
        Self { db, provider }
    }

    /// Titles related to a movie or series.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Upstream`] when the cache misses and the
    /// provider call fails, including for person ids, which have no
    /// recommendations upstream.
    pub async fn recommendations(
        &self, media_type: MediaType, id: i64, language: &str,
    ) -> Result<Vec<CatalogItem>, SyncError> {
        let key = DerivedKey { media_type, media_id: id, kind: DerivedKind::Recommendations };
        if let Some(items) = self.cached::<Vec<CatalogItem>>(&key).await {
            tracing::debug!("serving {key} from the derived cache");
            return Ok(items);
        }

        let items = self.provider.recommendations(media_type, id, language).await?;
        let score = mean_popularity(items.iter().map(|item| item.popularity));
        self.store_in_background(key, &items, score);
        Ok(items)
    }

    /// A person's acting and crew credits across movies and series.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Upstream`] when the cache misses and the
    /// provider call fails.
    pub async fn combined_credits(&self, person_id: i64, language: &str) -> Result<CombinedCredits, SyncError> {
        let key = DerivedKey { media_type: MediaType::Person, media_id: person_id, kind: DerivedKind::CombinedCredits };
        if let Some(credits) = self.cached::<CombinedCredits>(&key).await {
            tracing::debug!("serving {key} from the derived cache");
            return Ok(credits);
        }

        let credits = self.provider.combined_credits(person_id, language).await?;
        let score = mean_popularity(credits.cast.iter().chain(&credits.crew).map(|credit| credit.popularity));
        self.store_in_background(key, &credits, score);
        Ok(credits)
    }

    /// Cached payload for `key`, or `None` for a miss. Store and parse
    /// failures also come back as `None` so the caller falls through to
    /// upstream; a parse failure means the next write replaces the bad row.
    async fn cached<T: DeserializeOwned>(&self, key: &DerivedKey) -> Option<T> {
        let entry = match self.db.get_derived(key).await {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(err) => {
                tracing::warn!("derived cache lookup for {key} failed, falling back to upstream: {err}");
                return None;
            }
        };

        match serde_json::from_str(&entry.payload) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!("stored payload for {key} does not parse, refetching: {err}");
                None
            }
        }
    }

    /// Write `value` back to the cache from a detached task, logging and
    /// swallowing every failure.
    fn store_in_background<T: Serialize>(&self, key: DerivedKey, value: &T, score: f64) {
        let payload = match serde_json::to_string(value) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::warn!("skipping cache write for {key}, payload did not serialize: {err}");
                return;
            }
        };

        let db = self.db.clone();
        tokio::spawn(async move {
            match db.put_derived(&key, &payload, score).await {
                Ok(()) => tracing::debug!("cached derived result {key} ({} bytes)", payload.len()),
                Err(err) => tracing::warn!("cache write for {key} failed: {err}"),
            }
        });
    }
}

/// Mean of the given popularity values, 0.0 when there are none. Stored as
/// the entry's write-time relevance score, the final eviction tiebreak.
fn mean_popularity(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0_f64, 0_u32), |(sum, count), value| (sum + value, count + 1));
    if count == 0 { 0.0 } else { sum / f64::from(count) }
}
