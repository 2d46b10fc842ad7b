//! # guidance-core
//!
//! Core library for SmokeArrow: finds the nearest smoking spot (or, on request,
//! a smoking-permitted café) and keeps a live, smoothed bearing and distance to it.
//!
//! ## Design Principles
//!
//! - **Single owner**: The engine owns its target and search bookkeeping; the
//!   search client owns its cache. Nothing outside writes to either.
//! - **Never terminates**: Provider failures degrade to a displayable state
//!   (`Error`, `NotFound`) and the tick loop keeps running.
//! - **Snapshot out**: Clients read one `GuidanceSnapshot`, rebuilt from canonical
//!   fields on every tick, never a set of loosely-related published fields.
//! - **FFI-ready**: `GuidanceSession` wraps the engine and its runtime for the
//!   Swift app, which pushes CoreLocation updates into a `LocationFeed`,
//!   answers searches through `PlaceSearchBackend` and reads snapshots.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use guidance_core::{GuidanceConfig, GuidanceEngine, LocationFeed, PlaceSearchClient};
//!
//! let config = GuidanceConfig::default();
//! let feed = Arc::new(LocationFeed::new());
//! let search = PlaceSearchClient::new(provider, config.search.clone());
//! let engine = GuidanceEngine::new(feed.clone(), search, config);
//! engine.start();
//! let snapshot = engine.snapshot();
//! ```

// UniFFI scaffolding for Swift/Kotlin bindings
uniffi::setup_scaffolding!();

pub mod config;
pub mod distance;
pub mod engine;
pub mod error;
pub mod ffi;
pub mod geo;
pub mod location;
pub mod search;
pub mod types;

pub use config::{
    load_config, AccuracyConfig, EngineConfig, GuidanceConfig, SearchConfig, SearchPolicyConfig,
};
pub use distance::{DistancePresentation, DistanceZone};
pub use engine::{GuidanceEngine, GuidanceSnapshot, SearchTrigger};
pub use error::{GuidanceError, GuidanceFfiError, ProviderError, Result, SearchError};
pub use ffi::{GuidanceSession, PlaceSearchBackend};
pub use location::{LocationFeed, LocationProvider, LocationReadings};
pub use search::{PlaceResult, PlaceSearchClient, PlaceSearchProvider};
pub use types::*;
