//! Drives a `GuidanceEngine` through a scenario and records every distinct
//! snapshot it publishes.

use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, Utc};
use guidance_core::{
    GuidanceConfig, GuidanceEngine, GuidanceSnapshot, LocationFeed, PlaceSearchClient,
};
use serde::Serialize;
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info};

use crate::scenario::{Event, FixtureProvider, Scenario};

/// One published snapshot, stamped with scenario time and wall time.
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    pub at_ms: u64,
    pub timestamp: String,
    pub snapshot: GuidanceSnapshot,
}

struct Recorder {
    started: Instant,
    wall_start: DateTime<Utc>,
    frames: Vec<Frame>,
}

impl Recorder {
    fn record(&mut self, snapshot: GuidanceSnapshot) {
        let elapsed = self.started.elapsed();
        let at_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let wall = chrono::Duration::from_std(elapsed)
            .map(|offset| self.wall_start + offset)
            .unwrap_or(self.wall_start);

        debug!(at_ms, state = ?snapshot.state, "Frame recorded");
        self.frames.push(Frame {
            at_ms,
            timestamp: wall.to_rfc3339_opts(SecondsFormat::Millis, true),
            snapshot,
        });
    }

    /// Record every change published before `deadline`.
    async fn collect_until(
        &mut self,
        updates: &mut watch::Receiver<GuidanceSnapshot>,
        deadline: Instant,
    ) {
        loop {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        return;
                    }
                    let snapshot = updates.borrow_and_update().clone();
                    self.record(snapshot);
                }
                _ = sleep_until(deadline) => return,
            }
        }
    }
}

/// Run the scenario to completion and return the recorded frames, starting
/// with the engine's initial snapshot.
pub async fn run(scenario: &Scenario, config: GuidanceConfig) -> Vec<Frame> {
    let feed = Arc::new(LocationFeed::new());
    let provider = Arc::new(FixtureProvider::new(&scenario.fixtures));
    let search = PlaceSearchClient::new(provider, config.search.clone());
    let engine = GuidanceEngine::new(feed.clone(), search, config);
    let mut updates = engine.subscribe();

    let mut recorder = Recorder {
        started: Instant::now(),
        wall_start: Utc::now(),
        frames: Vec::new(),
    };

    info!(scenario = %scenario.name, steps = scenario.steps.len(), "Replay started");
    engine.start();
    recorder.record(updates.borrow_and_update().clone());

    for step in &scenario.steps {
        let due = recorder.started + std::time::Duration::from_millis(step.at_ms);
        recorder.collect_until(&mut updates, due).await;
        apply(&engine, &feed, &step.event);
    }

    let end = recorder.started + scenario.duration();
    recorder.collect_until(&mut updates, end).await;
    engine.stop();

    info!(frames = recorder.frames.len(), "Replay finished");
    recorder.frames
}

fn apply(engine: &GuidanceEngine, feed: &LocationFeed, event: &Event) {
    debug!(?event, "Applying step");
    match event {
        Event::Authorization { status } => feed.set_authorization(*status),
        Event::Revoke => feed.report_denied(),
        Event::RequestAuthorization => {
            engine.request_authorization();
            if feed.take_authorization_request() {
                debug!("Engine asked for permission");
            }
        }
        Event::Location { .. } => {
            if let Some(fix) = event.location_fix() {
                feed.update_location(fix);
            }
        }
        Event::Heading { .. } => {
            if let Some(fix) = event.heading_fix() {
                feed.update_heading(fix);
            }
        }
        Event::ClearHeading => feed.clear_heading(),
        Event::EnableCafe => engine.enable_cafe_search(),
        Event::Retry => engine.retry_search_now(),
    }
}
