//! Synchronous heart of the engine.
//!
//! `EngineCore` owns every canonical field and is driven by explicit inputs
//! (`Readings` and an `Instant`), so the whole state machine can be exercised
//! without spawning anything. The async shell in `engine/mod.rs` decides when
//! to call it and runs the searches it asks for.

use tokio::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::policy::{decide_target, search_trigger, SearchSession, SearchTrigger, TargetDecision};
use super::snapshot::{display_name, GuidanceSnapshot};
use super::state::{derive_state, is_low_accuracy, StateInputs};
use crate::config::GuidanceConfig;
use crate::distance::{self, DistancePresentation};
use crate::error::SearchError;
use crate::geo;
use crate::location::LocationReadings;
use crate::types::{Coordinate, GuidanceState, LocationFix, SearchMode, Spot, SpotCategory};

/// Inputs for one step, as returned by [`crate::LocationProvider::readings`].
pub(crate) type Readings = LocationReadings;

/// A search the core wants run. Its result must come back through
/// `complete_search` with the same generation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct SearchTicket {
    pub(crate) generation: u64,
    pub(crate) location: Coordinate,
    pub(crate) mode: SearchMode,
    pub(crate) preference: SpotCategory,
}

#[derive(Debug, Default)]
struct Readout {
    arrow_angle: Option<f64>,
    distance_meters: Option<f64>,
    presentation: Option<DistancePresentation>,
    smoothed_angle: Option<f64>,
    last_angle_update: Option<Instant>,
}

pub(crate) struct EngineCore {
    config: GuidanceConfig,
    state: GuidanceState,
    current_target: Option<Spot>,
    search_mode: SearchMode,
    cafe_preference: SpotCategory,
    force_target_update: bool,
    generation: u64,
    in_flight: Option<SearchTicket>,
    has_no_results: bool,
    last_search_failed: bool,
    session: SearchSession,
    readout: Readout,
}

impl EngineCore {
    pub(crate) fn new(config: GuidanceConfig) -> Self {
        Self {
            config,
            state: GuidanceState::PermissionNotDetermined,
            current_target: None,
            search_mode: SearchMode::SmokingOnly,
            cafe_preference: SpotCategory::SmokingSpot,
            force_target_update: false,
            generation: 0,
            in_flight: None,
            has_no_results: false,
            last_search_failed: false,
            session: SearchSession::default(),
            readout: Readout::default(),
        }
    }

    pub(crate) fn state(&self) -> GuidanceState {
        self.state
    }

    pub(crate) fn is_searching(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Fast while the arrow is on screen, slow otherwise.
    pub(crate) fn tick_interval(&self) -> Duration {
        if self.state.is_guiding() {
            self.config.engine.fast_tick()
        } else {
            self.config.engine.slow_tick()
        }
    }

    /// One scheduling step. Returns the search to start, if any.
    pub(crate) fn tick(&mut self, readings: &Readings, now: Instant) -> Option<SearchTicket> {
        self.advance(readings, now, true)
    }

    /// Same as `tick` but never starts a search.
    pub(crate) fn settle(&mut self, readings: &Readings, now: Instant) {
        self.advance(readings, now, false);
    }

    fn advance(
        &mut self,
        readings: &Readings,
        now: Instant,
        allow_search: bool,
    ) -> Option<SearchTicket> {
        self.update_state(readings);

        if !readings.authorization.is_authorized() {
            self.reset_guidance();
            return None;
        }
        let Some(fix) = readings.location else {
            self.reset_guidance();
            return None;
        };

        let mut ticket = None;
        if allow_search && !self.is_searching() {
            if let Some(trigger) = search_trigger(
                &self.session,
                self.last_search_failed,
                &fix,
                self.search_mode,
                now,
                &self.config.policy,
            ) {
                ticket = Some(self.begin_search(&fix, now, trigger));
            }
        }

        self.update_guidance(&fix, readings.best_heading, now);
        self.update_state(readings);
        ticket
    }

    /// Start a search right away, superseding any in flight.
    pub(crate) fn manual_search(&mut self, readings: &Readings, now: Instant) -> Option<SearchTicket> {
        if !readings.authorization.is_authorized() {
            return None;
        }
        let fix = readings.location?;
        Some(self.begin_search(&fix, now, SearchTrigger::Manual))
    }

    /// One-way switch to café-inclusive search. Returns a search to start
    /// when a fix is already available.
    pub(crate) fn enable_cafe_search(
        &mut self,
        readings: &Readings,
        now: Instant,
    ) -> Option<SearchTicket> {
        if self.search_mode != SearchMode::SmokingOnly {
            return None;
        }
        self.search_mode = SearchMode::IncludeCafe;
        self.cafe_preference = SpotCategory::Cafe;
        self.force_target_update = true;
        info!("Café search enabled");

        let fix = readings.location?;
        Some(self.begin_search(&fix, now, SearchTrigger::ModeChanged))
    }

    fn begin_search(&mut self, fix: &LocationFix, now: Instant, trigger: SearchTrigger) -> SearchTicket {
        self.generation += 1;
        self.last_search_failed = false;
        self.has_no_results = false;
        self.session.record_start(fix, self.search_mode, now);

        info!(
            trigger = trigger.as_str(),
            generation = self.generation,
            mode = self.search_mode.as_str(),
            accuracy_m = fix.horizontal_accuracy,
            "Starting search"
        );

        let ticket = SearchTicket {
            generation: self.generation,
            location: fix.coordinate,
            mode: self.search_mode,
            preference: self.cafe_preference,
        };
        self.in_flight = Some(ticket);
        ticket
    }

    /// Apply a finished search. Returns false when the result belongs to a
    /// superseded attempt and was dropped.
    pub(crate) fn complete_search(
        &mut self,
        generation: u64,
        result: Result<Vec<Spot>, SearchError>,
        user_location: &Coordinate,
    ) -> bool {
        if self.in_flight.map(|ticket| ticket.generation) != Some(generation) {
            debug!(generation, current = self.generation, "Discarding superseded search result");
            return false;
        }
        self.in_flight = None;

        match result {
            Ok(spots) => {
                self.last_search_failed = false;
                self.has_no_results = spots.is_empty();
                self.session.consecutive_failures = 0;
                self.apply_candidates(&spots, user_location);
            }
            Err(SearchError::Cancelled) => {
                // No outcome to back off from; the next tick searches again.
                self.session.last_started_at = None;
                debug!(generation, "Search cancelled");
            }
            Err(err) => {
                self.last_search_failed = true;
                self.has_no_results = false;
                self.session.consecutive_failures += 1;
                warn!(
                    error = %err,
                    failures = self.session.consecutive_failures,
                    "Search failed"
                );
            }
        }
        true
    }

    /// Complete the in-flight search as cancelled. Used when its task is
    /// aborted from outside, e.g. on stop.
    pub(crate) fn cancel_search(&mut self) {
        if let Some(ticket) = self.in_flight {
            self.complete_search(ticket.generation, Err(SearchError::Cancelled), &ticket.location);
        }
    }

    fn apply_candidates(&mut self, spots: &[Spot], user_location: &Coordinate) {
        let decision = decide_target(
            self.current_target.as_ref(),
            spots,
            user_location,
            self.force_target_update,
            self.config.policy.target_switch_ratio,
        );

        match decision {
            TargetDecision::Clear => {
                if self.current_target.take().is_some() {
                    info!("Target cleared");
                }
                self.force_target_update = false;
            }
            TargetDecision::Adopt(spot) => {
                if self.current_target.as_ref() != Some(&spot) {
                    info!(
                        spot = %display_name(&spot),
                        category = spot.category.as_str(),
                        distance_m = spot.distance_from(user_location).round(),
                        "Target changed"
                    );
                }
                self.current_target = Some(spot);
                self.force_target_update = false;
            }
            TargetDecision::Keep => {}
        }
    }

    fn update_state(&mut self, readings: &Readings) {
        let low_accuracy = is_low_accuracy(
            readings.location.as_ref(),
            readings.heading.as_ref(),
            readings.best_heading,
            &self.config.accuracy,
        );
        let next = derive_state(&StateInputs {
            authorization: readings.authorization,
            has_location: readings.location.is_some(),
            has_target: self.current_target.is_some(),
            is_searching: self.is_searching(),
            last_search_failed: self.last_search_failed,
            has_no_results: self.has_no_results,
            low_accuracy,
        });
        if next != self.state {
            debug!(from = ?self.state, to = ?next, "State changed");
            self.state = next;
        }
    }

    fn update_guidance(&mut self, fix: &LocationFix, best_heading: Option<f64>, now: Instant) {
        let Some(target) = self.current_target.as_ref() else {
            self.reset_guidance();
            return;
        };

        let distance = target.distance_from(&fix.coordinate);
        self.readout.distance_meters = Some(distance);
        self.readout.presentation = Some(distance::presentation(distance));

        let Some(heading) = best_heading else {
            self.readout.arrow_angle = None;
            self.readout.smoothed_angle = None;
            self.readout.last_angle_update = None;
            return;
        };

        let bearing = geo::bearing_degrees(&fix.coordinate, &target.coordinate);
        let relative = geo::normalize_180(bearing - heading);
        let delta_time = self
            .readout
            .last_angle_update
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.readout.last_angle_update = Some(now);

        let smoothed = geo::smooth_angle_degrees(
            self.readout.smoothed_angle,
            relative,
            delta_time,
            self.config.engine.heading_smoothing_secs,
        );
        self.readout.smoothed_angle = Some(smoothed);
        self.readout.arrow_angle = Some(smoothed);
    }

    fn reset_guidance(&mut self) {
        self.readout = Readout::default();
    }

    pub(crate) fn snapshot(&self) -> GuidanceSnapshot {
        GuidanceSnapshot::build(
            self.state,
            self.readout.arrow_angle,
            self.readout.distance_meters,
            self.readout.presentation.as_ref(),
            self.current_target.as_ref(),
            self.search_mode,
        )
    }
}
