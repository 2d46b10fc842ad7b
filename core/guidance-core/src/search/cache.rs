//! Last successful search result, kept as a fallback for when a later
//! search fails outright.

use std::time::Duration;

use tokio::time::Instant;

use crate::types::{Coordinate, SearchMode, Spot, SpotCategory};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CacheKey {
    pub(crate) mode: SearchMode,
    pub(crate) preference: SpotCategory,
}

struct CacheEntry {
    created_at: Instant,
    center: Coordinate,
    spots: Vec<Spot>,
    key: CacheKey,
}

/// Last successful result, kept only as a fallback for the next failure.
pub(crate) struct SearchCache {
    entry: Option<CacheEntry>,
    ttl: Duration,
}

impl SearchCache {
    pub(crate) fn new(ttl: Duration) -> Self {
        Self { entry: None, ttl }
    }

    pub(crate) fn store(&mut self, now: Instant, center: Coordinate, spots: Vec<Spot>, key: CacheKey) {
        self.entry = Some(CacheEntry {
            created_at: now,
            center,
            spots,
            key,
        });
    }

    /// Cached spots if the entry matches `key` and is no older than the TTL.
    pub(crate) fn fallback(&self, now: Instant, key: CacheKey, location: &Coordinate) -> Option<Vec<Spot>> {
        let entry = self.entry.as_ref()?;
        if entry.key != key {
            return None;
        }

        let age = now.saturating_duration_since(entry.created_at);
        if age > self.ttl {
            return None;
        }

        tracing::debug!(
            age_secs = age.as_secs(),
            center_offset_m = entry.center.distance_to(location).round(),
            count = entry.spots.len(),
            "Serving cached search result"
        );
        Some(entry.spots.clone())
    }
}
