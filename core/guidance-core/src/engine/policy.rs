//! When to search again and when to switch targets.
//!
//! Both decisions are pure so they can be exercised without a runtime.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::SearchPolicyConfig;
use crate::types::{Coordinate, LocationFix, SearchMode, Spot};

/// Bookkeeping from the most recent search attempt.
///
/// Written when a search starts (location, time, accuracy, mode) and when it
/// completes (failure count). Never reset; the next attempt overwrites it.
#[derive(Debug, Clone, Default)]
pub(crate) struct SearchSession {
    pub(crate) last_location: Option<Coordinate>,
    pub(crate) last_started_at: Option<Instant>,
    pub(crate) last_accuracy: Option<f64>,
    pub(crate) last_mode: Option<SearchMode>,
    pub(crate) consecutive_failures: u32,
}

impl SearchSession {
    pub(crate) fn record_start(&mut self, fix: &LocationFix, mode: SearchMode, now: Instant) {
        self.last_location = Some(fix.coordinate);
        self.last_started_at = Some(now);
        self.last_accuracy = Some(fix.horizontal_accuracy);
        self.last_mode = Some(mode);
    }
}

/// Why a search was started. Logged, and useful when reading traces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchTrigger {
    FirstSearch,
    Moved,
    Elapsed,
    AccuracyImproved,
    RetryAfterFailure,
    ModeChanged,
    Manual,
}

impl SearchTrigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstSearch => "first_search",
            Self::Moved => "moved",
            Self::Elapsed => "elapsed",
            Self::AccuracyImproved => "accuracy_improved",
            Self::RetryAfterFailure => "retry_after_failure",
            Self::ModeChanged => "mode_changed",
            Self::Manual => "manual",
        }
    }
}

/// Decide whether the current fix warrants a new search. Callers must not
/// ask while a search is already in flight.
pub(crate) fn search_trigger(
    session: &SearchSession,
    last_search_failed: bool,
    fix: &LocationFix,
    mode: SearchMode,
    now: Instant,
    policy: &SearchPolicyConfig,
) -> Option<SearchTrigger> {
    let (Some(last_location), Some(last_started_at)) =
        (session.last_location, session.last_started_at)
    else {
        return Some(SearchTrigger::FirstSearch);
    };

    let since_last = now.saturating_duration_since(last_started_at);

    if fix.coordinate.distance_to(&last_location) >= policy.min_movement_meters {
        return Some(SearchTrigger::Moved);
    }
    if since_last >= policy.refresh_interval() {
        return Some(SearchTrigger::Elapsed);
    }
    if accuracy_improved(session.last_accuracy, fix.horizontal_accuracy, policy) {
        return Some(SearchTrigger::AccuracyImproved);
    }
    if last_search_failed && since_last >= retry_backoff(session.consecutive_failures, policy) {
        return Some(SearchTrigger::RetryAfterFailure);
    }
    if session.last_mode != Some(mode) {
        return Some(SearchTrigger::ModeChanged);
    }
    None
}

fn accuracy_improved(last: Option<f64>, current: f64, policy: &SearchPolicyConfig) -> bool {
    match last {
        Some(last) if last >= 0.0 && current >= 0.0 => {
            current <= last - policy.accuracy_improvement_meters
        }
        _ => false,
    }
}

/// `min(max, base * 2^(failures - 1))`.
pub(crate) fn retry_backoff(consecutive_failures: u32, policy: &SearchPolicyConfig) -> Duration {
    let exponent = consecutive_failures.saturating_sub(1).min(31);
    let secs = policy
        .backoff_base_secs
        .saturating_mul(1u64 << exponent)
        .min(policy.backoff_max_secs);
    Duration::from_secs(secs)
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TargetDecision {
    Clear,
    Adopt(Spot),
    Keep,
}

/// Hysteresis on target switches: a different spot must be clearly closer
/// (`switch_ratio` of the current distance) unless an update is forced.
pub(crate) fn decide_target(
    current: Option<&Spot>,
    candidates: &[Spot],
    user: &Coordinate,
    force_update: bool,
    switch_ratio: f64,
) -> TargetDecision {
    let Some(nearest) = candidates
        .iter()
        .min_by(|a, b| a.distance_from(user).total_cmp(&b.distance_from(user)))
    else {
        return TargetDecision::Clear;
    };

    let Some(current) = current else {
        return TargetDecision::Adopt(nearest.clone());
    };

    if force_update {
        return TargetDecision::Adopt(nearest.clone());
    }

    if nearest.distance_from(user) <= current.distance_from(user) * switch_ratio {
        TargetDecision::Adopt(nearest.clone())
    } else {
        TargetDecision::Keep
    }
}
