//! Host-facing surface.
//!
//! The host app owns CoreLocation and the map search, so it hands the session
//! a `LocationFeed` it keeps writing into and a `PlaceSearchBackend` it
//! implements. The session brings its own Tokio runtime; hosts never see one.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::runtime::Runtime;
use tracing::debug;

use crate::config::{load_config, GuidanceConfig};
use crate::engine::{GuidanceEngine, GuidanceSnapshot};
use crate::error::{GuidanceFfiError, ProviderError};
use crate::location::LocationFeed;
use crate::search::{PlaceResult, PlaceSearchClient, PlaceSearchProvider};
use crate::types::Coordinate;

/// Place search implemented by the host (MKLocalSearch on iOS).
///
/// Called from a blocking worker thread, one call per query. Blocking until
/// the answer arrives is expected; the engine enforces its own timeout.
#[uniffi::export(with_foreign)]
pub trait PlaceSearchBackend: Send + Sync {
    fn search(
        &self,
        query: String,
        center: Coordinate,
        radius_meters: f64,
    ) -> Result<Vec<PlaceResult>, GuidanceFfiError>;
}

/// Runs a synchronous backend off the async workers.
struct BackendProvider {
    backend: Arc<dyn PlaceSearchBackend>,
}

#[async_trait]
impl PlaceSearchProvider for BackendProvider {
    async fn search(
        &self,
        query: &str,
        center: Coordinate,
        radius_meters: f64,
    ) -> Result<Vec<PlaceResult>, ProviderError> {
        let backend = Arc::clone(&self.backend);
        let query = query.to_string();
        let joined =
            tokio::task::spawn_blocking(move || backend.search(query, center, radius_meters)).await;

        match joined {
            Ok(result) => result.map_err(ProviderError::from),
            Err(err) if err.is_cancelled() => Err(ProviderError::Cancelled),
            Err(err) => Err(ProviderError::Request(format!("backend panicked: {}", err))),
        }
    }
}

/// A guidance engine plus the runtime it runs on.
#[derive(uniffi::Object)]
pub struct GuidanceSession {
    // Declared first so it shuts down before the runtime goes away.
    engine: GuidanceEngine,
    runtime: Runtime,
}

impl GuidanceSession {
    pub fn with_config(
        feed: Arc<LocationFeed>,
        backend: Arc<dyn PlaceSearchBackend>,
        config: GuidanceConfig,
    ) -> Result<Self, GuidanceFfiError> {
        config.validate()?;
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("guidance-worker")
            .enable_time()
            .build()
            .map_err(|err| GuidanceFfiError::from(format!("starting runtime: {}", err)))?;

        let provider = Arc::new(BackendProvider { backend });
        let search = PlaceSearchClient::new(provider, config.search.clone());
        let engine = {
            let _guard = runtime.enter();
            GuidanceEngine::new(feed, search, config)
        };
        debug!("Guidance session created");

        Ok(Self { engine, runtime })
    }

    /// Receiver for snapshot changes, for Rust hosts.
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<GuidanceSnapshot> {
        self.engine.subscribe()
    }
}

#[uniffi::export]
impl GuidanceSession {
    /// Creates a session, reading the config from `config_path` or the default
    /// location (~/.smokearrow/guidance.toml). A missing file means defaults.
    #[uniffi::constructor]
    pub fn new(
        feed: Arc<LocationFeed>,
        backend: Arc<dyn PlaceSearchBackend>,
        config_path: Option<String>,
    ) -> Result<Self, GuidanceFfiError> {
        let config = load_config(config_path.map(PathBuf::from))?;
        Self::with_config(feed, backend, config)
    }

    pub fn start(&self) {
        let _guard = self.runtime.enter();
        self.engine.start();
    }

    pub fn stop(&self) {
        let _guard = self.runtime.enter();
        self.engine.stop();
    }

    /// Re-evaluate right away instead of waiting for the next tick, e.g.
    /// after pushing a new fix.
    pub fn refresh(&self) {
        let _guard = self.runtime.enter();
        self.engine.refresh();
    }

    pub fn snapshot(&self) -> GuidanceSnapshot {
        self.engine.snapshot()
    }

    pub fn request_authorization(&self) {
        self.engine.request_authorization();
    }

    pub fn retry_search_now(&self) {
        let _guard = self.runtime.enter();
        self.engine.retry_search_now();
    }

    pub fn enable_cafe_search(&self) {
        let _guard = self.runtime.enter();
        self.engine.enable_cafe_search();
    }
}
