//! Guidance engine: turns location readings and search results into a
//! published `GuidanceSnapshot`.
//!
//! A single tick task re-evaluates the state machine on a fast or slow
//! interval. Searches run as their own task, at most one at a time; a newer
//! search aborts the older one and generation numbers make any late result
//! harmless.

mod machine;
mod policy;
mod snapshot;
mod state;

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info};

use self::machine::{EngineCore, Readings, SearchTicket};
use crate::config::GuidanceConfig;
use crate::error::SearchError;
use crate::location::LocationProvider;
use crate::search::PlaceSearchClient;
use crate::types::{AuthorizationStatus, Spot};

pub use policy::SearchTrigger;
pub use snapshot::{display_name, status_message, GuidanceSnapshot};

struct TickTask {
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

struct EngineInner {
    location: Arc<dyn LocationProvider>,
    search: Arc<PlaceSearchClient>,
    runtime: Handle,
    core: Mutex<EngineCore>,
    search_task: Mutex<Option<JoinHandle<()>>>,
    snapshot_tx: watch::Sender<GuidanceSnapshot>,
}

/// Owns the tick loop and the in-flight search.
///
/// Dropping the engine stops both tasks but leaves the location provider
/// running; call [`GuidanceEngine::stop`] for a full shutdown.
pub struct GuidanceEngine {
    inner: Arc<EngineInner>,
    tick_task: Mutex<Option<TickTask>>,
}

impl GuidanceEngine {
    /// # Panics
    ///
    /// Panics when called outside a Tokio runtime.
    pub fn new(
        location: Arc<dyn LocationProvider>,
        search: PlaceSearchClient,
        config: GuidanceConfig,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(GuidanceSnapshot::default());
        Self {
            inner: Arc::new(EngineInner {
                location,
                search: Arc::new(search),
                runtime: Handle::current(),
                core: Mutex::new(EngineCore::new(config)),
                search_task: Mutex::new(None),
                snapshot_tx,
            }),
            tick_task: Mutex::new(None),
        }
    }

    /// Start location updates and the tick loop. Restarts the loop if it
    /// was already running.
    pub fn start(&self) {
        self.inner.location.start();
        self.inner.refresh();

        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = self
            .inner
            .runtime
            .spawn(run_tick_loop(Arc::clone(&self.inner), shutdown_rx));

        let previous = self
            .lock_tick_task()
            .replace(TickTask { shutdown, handle });
        if let Some(previous) = previous {
            previous.signal();
        }
        info!("Guidance engine started");
    }

    /// Stop the tick loop, abandon any search and stop location updates.
    pub fn stop(&self) {
        self.shutdown_tasks();
        self.inner.location.stop();
        info!("Guidance engine stopped");
    }

    /// Run one tick immediately.
    pub fn refresh(&self) {
        self.inner.refresh();
    }

    pub fn snapshot(&self) -> GuidanceSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Receiver that is notified whenever the snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<GuidanceSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Ask the provider for permission, but only while it is undecided.
    pub fn request_authorization(&self) {
        if self.inner.location.authorization() == AuthorizationStatus::NotDetermined {
            self.inner.location.request_authorization();
        }
    }

    /// Search now, ignoring the trigger policy. No-op without permission or a fix.
    pub fn retry_search_now(&self) {
        self.inner
            .with_core_action(|core, readings, now| core.manual_search(readings, now));
    }

    /// Broaden the search to smoking-friendly cafés. One-way.
    pub fn enable_cafe_search(&self) {
        self.inner
            .with_core_action(|core, readings, now| core.enable_cafe_search(readings, now));
    }

    fn shutdown_tasks(&self) {
        if let Some(task) = self.lock_tick_task().take() {
            task.signal();
        }
        self.inner.cancel_search();
    }

    fn lock_tick_task(&self) -> MutexGuard<'_, Option<TickTask>> {
        self.tick_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for GuidanceEngine {
    fn drop(&mut self) {
        self.shutdown_tasks();
    }
}

impl TickTask {
    fn signal(self) {
        // The loop may already be gone; nothing to wake in that case.
        let _ = self.shutdown.send(true);
        drop(self.handle);
    }
}

impl EngineInner {
    fn refresh(self: &Arc<Self>) {
        let readings = self.location.readings();
        let mut core = self.lock_core();
        if let Some(ticket) = core.tick(&readings, Instant::now()) {
            self.spawn_search(ticket);
        }
        self.publish(&core);
    }

    /// Run a user action against the core, start the search it asks for and
    /// publish the result.
    fn with_core_action<F>(self: &Arc<Self>, action: F)
    where
        F: FnOnce(&mut EngineCore, &Readings, Instant) -> Option<SearchTicket>,
    {
        let readings = self.location.readings();
        let now = Instant::now();
        let mut core = self.lock_core();
        if let Some(ticket) = action(&mut core, &readings, now) {
            self.spawn_search(ticket);
        }
        core.settle(&readings, now);
        self.publish(&core);
    }

    /// Callers hold the core lock, so completions cannot interleave with
    /// replacing the stored handle.
    fn spawn_search(self: &Arc<Self>, ticket: SearchTicket) {
        let inner = Arc::clone(self);
        let handle = self.runtime.spawn(async move {
            let result = inner
                .search
                .search_nearest_spots(&ticket.location, ticket.mode, ticket.preference)
                .await;
            inner.finish_search(ticket, result);
        });

        if let Some(previous) = self.lock_search_task().replace(handle) {
            previous.abort();
        }
    }

    fn finish_search(&self, ticket: SearchTicket, result: Result<Vec<Spot>, SearchError>) {
        let readings = self.location.readings();
        let user_location = readings
            .location
            .map(|fix| fix.coordinate)
            .unwrap_or(ticket.location);

        let mut core = self.lock_core();
        if !core.complete_search(ticket.generation, result, &user_location) {
            return;
        }
        core.settle(&readings, Instant::now());
        self.publish(&core);
    }

    fn cancel_search(&self) {
        let mut core = self.lock_core();
        core.cancel_search();
        if let Some(task) = self.lock_search_task().take() {
            task.abort();
        }
        self.publish(&core);
    }

    fn publish(&self, core: &EngineCore) {
        let next = core.snapshot();
        let changed = self.snapshot_tx.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
        if changed {
            debug!(state = ?core.state(), "Snapshot published");
        }
    }

    fn tick_interval(&self) -> tokio::time::Duration {
        self.lock_core().tick_interval()
    }

    fn lock_core(&self) -> MutexGuard<'_, EngineCore> {
        // Recover from poisoning - a panicked tick leaves the fields consistent
        self.core
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_search_task(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.search_task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

async fn run_tick_loop(inner: Arc<EngineInner>, mut shutdown_rx: watch::Receiver<bool>) {
    debug!("Tick loop started");
    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        inner.refresh();

        tokio::select! {
            _ = tokio::time::sleep(inner.tick_interval()) => {}
            changed = shutdown_rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }
    debug!("Tick loop stopped");
}
