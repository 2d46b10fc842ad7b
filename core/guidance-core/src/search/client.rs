//! Radius-ladder search over a `PlaceSearchProvider`.
//!
//! For each radius, every active query runs concurrently under its own timeout
//! and all of them are joined before the results are merged. The first radius
//! that yields anything wins; wider radii are never consulted after that.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures::future::join_all;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::cache::{CacheKey, SearchCache};
use super::PlaceSearchProvider;
use crate::config::SearchConfig;
use crate::error::SearchError;
use crate::types::{Coordinate, SearchMode, Spot, SpotCategory};

#[derive(Debug, Clone)]
struct SearchQuery {
    text: String,
    category: SpotCategory,
}

#[derive(Default)]
struct RadiusOutcome {
    spots: Vec<Spot>,
    had_non_timeout_error: bool,
}

pub struct PlaceSearchClient {
    provider: Arc<dyn PlaceSearchProvider>,
    config: SearchConfig,
    cache: Mutex<SearchCache>,
}

impl PlaceSearchClient {
    pub fn new(provider: Arc<dyn PlaceSearchProvider>, config: SearchConfig) -> Self {
        let cache = SearchCache::new(config.cache_ttl());
        Self {
            provider,
            config,
            cache: Mutex::new(cache),
        }
    }

    /// Nearest spots first. An empty list means nothing was found, not a failure.
    ///
    /// On failure the last successful result for the same mode and preference
    /// is returned instead, provided it is still within the cache TTL.
    pub async fn search_nearest_spots(
        &self,
        location: &Coordinate,
        mode: SearchMode,
        preference: SpotCategory,
    ) -> Result<Vec<Spot>, SearchError> {
        let key = CacheKey { mode, preference };
        let queries = self.queries_for(mode);

        match self.search_first_available(location, &queries).await {
            Ok(spots) => {
                self.lock_cache()
                    .store(Instant::now(), *location, spots.clone(), key);
                Ok(spots)
            }
            Err(err) => {
                if let Some(spots) = self.lock_cache().fallback(Instant::now(), key, location) {
                    warn!(error = %err, "Search failed; using cached result");
                    return Ok(spots);
                }
                Err(err)
            }
        }
    }

    async fn search_first_available(
        &self,
        location: &Coordinate,
        queries: &[SearchQuery],
    ) -> Result<Vec<Spot>, SearchError> {
        for &radius in &self.config.radii_meters {
            let spots = self.search_within_radius(location, radius, queries).await?;
            if !spots.is_empty() {
                debug!(radius_m = radius, count = spots.len(), "Search radius produced results");
                return Ok(spots);
            }
            debug!(radius_m = radius, "Search radius empty; widening");
        }
        Ok(Vec::new())
    }

    async fn search_within_radius(
        &self,
        location: &Coordinate,
        radius: f64,
        queries: &[SearchQuery],
    ) -> Result<Vec<Spot>, SearchError> {
        let lookups = queries
            .iter()
            .map(|query| self.run_query(query, *location, radius));
        let results = join_all(lookups).await;

        let mut outcome = RadiusOutcome::default();
        for result in results {
            match result {
                Ok(spots) => outcome.spots.extend(spots),
                Err(SearchError::TimedOut | SearchError::Cancelled) => {}
                Err(SearchError::Failed) => outcome.had_non_timeout_error = true,
            }
        }

        let ranked = rank_spots(outcome.spots, location, radius);
        if ranked.is_empty() && outcome.had_non_timeout_error {
            warn!(radius_m = radius, "No results and at least one query failed");
            return Err(SearchError::Failed);
        }
        Ok(ranked)
    }

    /// One provider call raced against the query timeout. The loser is dropped.
    async fn run_query(
        &self,
        query: &SearchQuery,
        center: Coordinate,
        radius: f64,
    ) -> Result<Vec<Spot>, SearchError> {
        let timeout = self.config.query_timeout();
        let lookup = self.provider.search(&query.text, center, radius);

        match tokio::time::timeout(timeout, lookup).await {
            Ok(Ok(places)) => Ok(places
                .into_iter()
                .map(|place| Spot {
                    name: place.name,
                    coordinate: place.coordinate,
                    category: query.category,
                })
                .collect()),
            Ok(Err(err)) => {
                debug!(query = %query.text, error = %err, "Place query failed");
                Err(err.into())
            }
            Err(_) => {
                debug!(
                    query = %query.text,
                    timeout_ms = timeout.as_millis() as u64,
                    "Place query timed out"
                );
                Err(SearchError::TimedOut)
            }
        }
    }

    fn queries_for(&self, mode: SearchMode) -> Vec<SearchQuery> {
        let tagged = |texts: &[String], category: SpotCategory| {
            texts
                .iter()
                .map(move |text| SearchQuery {
                    text: text.clone(),
                    category,
                })
                .collect::<Vec<_>>()
        };

        let mut queries = tagged(&self.config.smoking_spot_queries, SpotCategory::SmokingSpot);
        if mode == SearchMode::IncludeCafe {
            queries.extend(tagged(&self.config.cafe_queries, SpotCategory::Cafe));
        }
        queries
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, SearchCache> {
        // Recover from poisoning - worst case we serve or overwrite one stale entry
        self.cache
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Dedupe by spot identity (smoking spots beat cafés), drop anything beyond
/// `radius`, then sort by distance with the name as tie-break.
pub(crate) fn rank_spots(spots: Vec<Spot>, location: &Coordinate, radius: f64) -> Vec<Spot> {
    let mut unique: HashMap<String, Spot> = HashMap::new();
    for spot in spots {
        match unique.get(&spot.id()) {
            Some(existing) if existing.category.priority() <= spot.category.priority() => {}
            _ => {
                unique.insert(spot.id(), spot);
            }
        }
    }

    let mut ranked: Vec<(f64, Spot)> = unique
        .into_values()
        .map(|spot| (spot.distance_from(location), spot))
        .filter(|(distance, _)| *distance <= radius)
        .collect();

    ranked.sort_by(|(a_dist, a), (b_dist, b)| {
        a_dist
            .total_cmp(b_dist)
            .then_with(|| a.name.as_deref().unwrap_or("").cmp(b.name.as_deref().unwrap_or("")))
    });

    ranked.into_iter().map(|(_, spot)| spot).collect()
}
