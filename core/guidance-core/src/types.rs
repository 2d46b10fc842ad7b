//! Value types shared by the search client, the engine and FFI clients.
//!
//! **FFI Support:** All types are annotated with UniFFI macros for Swift/Kotlin bindings.

use serde::{Deserialize, Serialize};

use crate::geo;

// ═══════════════════════════════════════════════════════════════════════════════
// Geography
// ═══════════════════════════════════════════════════════════════════════════════

/// A point on the globe in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, uniffi::Record)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &Coordinate) -> f64 {
        geo::distance_meters(self, other)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Spots
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum SpotCategory {
    SmokingSpot,
    Cafe,
}

impl SpotCategory {
    /// Lower wins when two queries surface the same place.
    pub(crate) fn priority(self) -> u8 {
        match self {
            Self::SmokingSpot => 0,
            Self::Cafe => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::SmokingSpot => "smoking_spot",
            Self::Cafe => "cafe",
        }
    }
}

/// Which categories a search covers. Only ever moves from `SmokingOnly` to `IncludeCafe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    SmokingOnly,
    IncludeCafe,
}

impl SearchMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SmokingOnly => "smoking_only",
            Self::IncludeCafe => "include_cafe",
        }
    }
}

/// A search result the user can be guided to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, uniffi::Record)]
pub struct Spot {
    pub name: Option<String>,
    pub coordinate: Coordinate,
    pub category: SpotCategory,
}

impl Spot {
    /// Deduplication key: name plus coordinates rounded to roughly one meter.
    pub fn id(&self) -> String {
        let lat = (self.coordinate.latitude * 100_000.0).round() as i64;
        let lon = (self.coordinate.longitude * 100_000.0).round() as i64;
        format!("{}|{}|{}", self.name.as_deref().unwrap_or(""), lat, lon)
    }

    pub fn distance_from(&self, location: &Coordinate) -> f64 {
        self.coordinate.distance_to(location)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Location Inputs
// ═══════════════════════════════════════════════════════════════════════════════

/// Location permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum AuthorizationStatus {
    NotDetermined,
    Restricted,
    Denied,
    AuthorizedWhenInUse,
    AuthorizedAlways,
}

impl AuthorizationStatus {
    pub fn is_authorized(self) -> bool {
        matches!(self, Self::AuthorizedWhenInUse | Self::AuthorizedAlways)
    }
}

/// A position fix. Negative `horizontal_accuracy` or `course` means invalid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, uniffi::Record)]
pub struct LocationFix {
    pub coordinate: Coordinate,
    pub horizontal_accuracy: f64,
    #[serde(default)]
    pub course: Option<f64>,
}

/// A compass fix. Negative `true_heading` means only magnetic is known;
/// negative `heading_accuracy` means the fix is unusable.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, uniffi::Record)]
pub struct HeadingFix {
    pub true_heading: f64,
    pub magnetic_heading: f64,
    pub heading_accuracy: f64,
}

// ═══════════════════════════════════════════════════════════════════════════════
// Guidance State
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "snake_case")]
pub enum GuidanceState {
    PermissionNotDetermined,
    PermissionDenied,
    Locating,
    Searching,
    Navigating,
    LowAccuracy,
    NotFound,
    Error,
}

impl GuidanceState {
    /// States where the arrow is on screen and needs the fast tick.
    pub fn is_guiding(self) -> bool {
        matches!(self, Self::Navigating | Self::LowAccuracy)
    }
}
