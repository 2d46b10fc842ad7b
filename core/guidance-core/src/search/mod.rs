//! Place search: provider seam plus the radius-ladder client that fans queries out.

mod cache;
mod client;

pub use client::PlaceSearchClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ProviderError;
use crate::types::Coordinate;

/// A raw point of interest as returned by a provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, uniffi::Record)]
pub struct PlaceResult {
    pub name: Option<String>,
    pub coordinate: Coordinate,
}

/// Trait for external point-of-interest search backends.
///
/// Implementors should:
/// - Treat `query` as free text and return points of interest inside the circle
/// - Return `ProviderError::Request` for real failures; timeouts are enforced by the caller
/// - Stop any underlying network work when the returned future is dropped
#[async_trait]
pub trait PlaceSearchProvider: Send + Sync {
    async fn search(
        &self,
        query: &str,
        center: Coordinate,
        radius_meters: f64,
    ) -> Result<Vec<PlaceResult>, ProviderError>;
}
