//! Scenario files: canned search fixtures plus a timeline of location events.
//!
//! ```json
//! {
//!   "name": "station walk",
//!   "fixtures": [
//!     { "query": "喫煙所", "latency_ms": 300,
//!       "places": [{ "name": "East Exit", "coordinate": { "latitude": 35.68, "longitude": 139.77 } }] }
//!   ],
//!   "steps": [
//!     { "at_ms": 0, "event": "authorization", "status": "authorized_when_in_use" },
//!     { "at_ms": 500, "event": "location", "latitude": 35.681, "longitude": 139.767, "accuracy": 12 }
//!   ]
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use guidance_core::{
    AuthorizationStatus, Coordinate, HeadingFix, LocationFix, PlaceResult, PlaceSearchProvider,
    ProviderError,
};
use serde::{Deserialize, Serialize};

use crate::error::{ReplayError, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub fixtures: Vec<Fixture>,
    pub steps: Vec<Step>,
    /// How long to keep recording after the last step.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,
}

fn default_settle_ms() -> u64 {
    3_000
}

/// Canned answer for one query text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub query: String,
    #[serde(default)]
    pub places: Vec<FixturePlace>,
    #[serde(default)]
    pub latency_ms: u64,
    #[serde(default)]
    pub fail: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixturePlace {
    #[serde(default)]
    pub name: Option<String>,
    pub coordinate: Coordinate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub at_ms: u64,
    #[serde(flatten)]
    pub event: Event,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    Authorization {
        status: AuthorizationStatus,
    },
    /// The platform revoked permission mid-session.
    Revoke,
    RequestAuthorization,
    Location {
        latitude: f64,
        longitude: f64,
        accuracy: f64,
        #[serde(default)]
        course: Option<f64>,
    },
    Heading {
        degrees: f64,
        accuracy: f64,
    },
    ClearHeading,
    EnableCafe,
    Retry,
}

impl Event {
    pub fn location_fix(&self) -> Option<LocationFix> {
        match *self {
            Event::Location {
                latitude,
                longitude,
                accuracy,
                course,
            } => Some(LocationFix {
                coordinate: Coordinate::new(latitude, longitude),
                horizontal_accuracy: accuracy,
                course,
            }),
            _ => None,
        }
    }

    pub fn heading_fix(&self) -> Option<HeadingFix> {
        match *self {
            Event::Heading { degrees, accuracy } => Some(HeadingFix {
                true_heading: degrees,
                magnetic_heading: degrees,
                heading_accuracy: accuracy,
            }),
            _ => None,
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).map_err(|source| ReplayError::Io {
            context: format!("reading {}", path.display()),
            source,
        })?;
        let scenario = Self::parse(&content).map_err(|err| match err {
            ReplayError::ScenarioMalformed { details, .. } => ReplayError::ScenarioMalformed {
                path: path.to_path_buf(),
                details,
            },
            other => other,
        })?;
        Ok(scenario)
    }

    pub fn parse(content: &str) -> Result<Self> {
        let scenario: Scenario =
            serde_json::from_str(content).map_err(|err| ReplayError::ScenarioMalformed {
                path: Default::default(),
                details: err.to_string(),
            })?;
        scenario.validate()?;
        Ok(scenario)
    }

    fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(ReplayError::ScenarioInvalid(
                "scenario has no steps".to_string(),
            ));
        }
        if self.steps.windows(2).any(|pair| pair[0].at_ms > pair[1].at_ms) {
            return Err(ReplayError::ScenarioInvalid(
                "steps must be ordered by at_ms".to_string(),
            ));
        }
        Ok(())
    }

    /// Time of the last step plus the settle window.
    pub fn duration(&self) -> Duration {
        let last = self.steps.last().map(|step| step.at_ms).unwrap_or(0);
        Duration::from_millis(last.saturating_add(self.settle_ms))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Fixture provider
// ─────────────────────────────────────────────────────────────────────────────

/// Serves fixtures by exact query text, filtered to the requested circle.
/// Unknown queries return nothing.
pub struct FixtureProvider {
    fixtures: HashMap<String, Fixture>,
}

impl FixtureProvider {
    pub fn new(fixtures: &[Fixture]) -> Self {
        Self {
            fixtures: fixtures
                .iter()
                .map(|fixture| (fixture.query.clone(), fixture.clone()))
                .collect(),
        }
    }
}

#[async_trait]
impl PlaceSearchProvider for FixtureProvider {
    async fn search(
        &self,
        query: &str,
        center: Coordinate,
        radius_meters: f64,
    ) -> std::result::Result<Vec<PlaceResult>, ProviderError> {
        let Some(fixture) = self.fixtures.get(query) else {
            return Ok(Vec::new());
        };

        if fixture.latency_ms > 0 {
            tokio::time::sleep(Duration::from_millis(fixture.latency_ms)).await;
        }
        if fixture.fail {
            return Err(ProviderError::Request(format!(
                "fixture for {:?} is set to fail",
                query
            )));
        }

        Ok(fixture
            .places
            .iter()
            .filter(|place| place.coordinate.distance_to(&center) <= radius_meters)
            .map(|place| PlaceResult {
                name: place.name.clone(),
                coordinate: place.coordinate,
            })
            .collect())
    }
}
