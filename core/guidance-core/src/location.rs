//! Location input seam.
//!
//! The engine only ever reads the latest values; it never waits on the provider.
//! `LocationFeed` is the push-fed implementation the host app writes
//! CoreLocation callbacks into.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use crate::types::{AuthorizationStatus, HeadingFix, LocationFix};

/// Trait for platform location sources.
///
/// Implementors should:
/// - Return the most recent value without blocking
/// - Report invalid accuracies as negative numbers rather than dropping the fix
pub trait LocationProvider: Send + Sync {
    fn start(&self);

    fn stop(&self);

    /// Ask the platform for permission. Only called while `NotDetermined`.
    fn request_authorization(&self) {}

    fn authorization(&self) -> AuthorizationStatus;

    fn location(&self) -> Option<LocationFix>;

    fn heading(&self) -> Option<HeadingFix>;

    /// Best available heading in degrees, falling back to the course over ground.
    fn best_heading_degrees(&self) -> Option<f64> {
        best_heading(self.heading().as_ref(), self.location().as_ref())
    }

    /// Every value at once. The default reads each getter in turn, so a push
    /// landing in between can mix old and new values; implementations with a
    /// single store should override it.
    fn readings(&self) -> LocationReadings {
        let location = self.location();
        let heading = self.heading();
        LocationReadings {
            authorization: self.authorization(),
            location,
            heading,
            best_heading: best_heading(heading.as_ref(), location.as_ref()),
        }
    }
}

/// The provider's latest values, with the best heading derived from the
/// same location and heading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationReadings {
    pub authorization: AuthorizationStatus,
    pub location: Option<LocationFix>,
    pub heading: Option<HeadingFix>,
    pub best_heading: Option<f64>,
}

/// Compass heading when its accuracy is valid (true north preferred over
/// magnetic), otherwise a valid course, otherwise nothing.
pub fn best_heading(heading: Option<&HeadingFix>, location: Option<&LocationFix>) -> Option<f64> {
    if let Some(heading) = heading.filter(|h| h.heading_accuracy >= 0.0) {
        if heading.true_heading >= 0.0 {
            return Some(heading.true_heading);
        }
        return Some(heading.magnetic_heading);
    }

    location
        .and_then(|fix| fix.course)
        .filter(|course| *course >= 0.0)
}

struct FeedState {
    authorization: AuthorizationStatus,
    location: Option<LocationFix>,
    heading: Option<HeadingFix>,
}

/// Thread-safe latest-value store fed by the host's location callbacks.
#[derive(uniffi::Object)]
pub struct LocationFeed {
    state: RwLock<FeedState>,
    running: AtomicBool,
    authorization_requested: AtomicBool,
}

impl Default for LocationFeed {
    fn default() -> Self {
        Self::new()
    }
}

#[uniffi::export]
impl LocationFeed {
    #[uniffi::constructor]
    pub fn new() -> Self {
        Self {
            state: RwLock::new(FeedState {
                authorization: AuthorizationStatus::NotDetermined,
                location: None,
                heading: None,
            }),
            running: AtomicBool::new(false),
            authorization_requested: AtomicBool::new(false),
        }
    }

    pub fn set_authorization(&self, status: AuthorizationStatus) {
        let mut state = self.write_state();
        if state.authorization != status {
            tracing::debug!(from = ?state.authorization, to = ?status, "Authorization changed");
            state.authorization = status;
        }
    }

    pub fn update_location(&self, fix: LocationFix) {
        self.write_state().location = Some(fix);
    }

    pub fn update_heading(&self, fix: HeadingFix) {
        self.write_state().heading = Some(fix);
    }

    pub fn clear_heading(&self) {
        self.write_state().heading = None;
    }

    /// The platform revoked access mid-session: record it and stop updates.
    pub fn report_denied(&self) {
        self.set_authorization(AuthorizationStatus::Denied);
        LocationProvider::stop(self);
    }

    /// Whether the engine currently wants updates.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Returns true once per permission request, so the host can show the prompt.
    pub fn take_authorization_request(&self) -> bool {
        self.authorization_requested.swap(false, Ordering::SeqCst)
    }
}

impl LocationFeed {
    fn read_state(&self) -> std::sync::RwLockReadGuard<'_, FeedState> {
        // Recover from poisoning - the stored values are plain copies
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_state(&self) -> std::sync::RwLockWriteGuard<'_, FeedState> {
        self.state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LocationProvider for LocationFeed {
    fn start(&self) {
        self.running.store(true, Ordering::SeqCst);
    }

    fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn request_authorization(&self) {
        self.authorization_requested.store(true, Ordering::SeqCst);
    }

    fn authorization(&self) -> AuthorizationStatus {
        self.read_state().authorization
    }

    fn location(&self) -> Option<LocationFix> {
        self.read_state().location
    }

    fn heading(&self) -> Option<HeadingFix> {
        self.read_state().heading
    }

    fn readings(&self) -> LocationReadings {
        let state = self.read_state();
        LocationReadings {
            authorization: state.authorization,
            location: state.location,
            heading: state.heading,
            best_heading: best_heading(state.heading.as_ref(), state.location.as_ref()),
        }
    }
}
