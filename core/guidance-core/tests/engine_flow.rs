//! End-to-end engine behavior against a fake place provider and a push-fed
//! location feed, on a paused clock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use guidance_core::{
    AuthorizationStatus, Coordinate, GuidanceConfig, GuidanceEngine, GuidanceState, HeadingFix,
    LocationFeed, LocationFix, PlaceResult, PlaceSearchClient, PlaceSearchProvider, ProviderError,
    SearchMode,
};

const ORIGIN: Coordinate = Coordinate {
    latitude: 35.681,
    longitude: 139.767,
};

fn north(meters: f64) -> Coordinate {
    Coordinate::new(ORIGIN.latitude + meters / 111_195.0, ORIGIN.longitude)
}

fn place(name: &str, meters: f64) -> PlaceResult {
    PlaceResult {
        name: Some(name.to_string()),
        coordinate: north(meters),
    }
}

#[derive(Default)]
struct FakeProvider {
    places: HashMap<String, Vec<PlaceResult>>,
    latency: Duration,
    fail: bool,
    calls: AtomicUsize,
    finished: AtomicUsize,
}

impl FakeProvider {
    fn with(mut self, query: &str, results: Vec<PlaceResult>) -> Self {
        self.places.insert(query.to_string(), results);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Queries that ran to the end instead of being aborted.
    fn finished(&self) -> usize {
        self.finished.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PlaceSearchProvider for FakeProvider {
    async fn search(
        &self,
        query: &str,
        _center: Coordinate,
        _radius_meters: f64,
    ) -> Result<Vec<PlaceResult>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.finished.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::Request("offline".to_string()));
        }
        Ok(self.places.get(query).cloned().unwrap_or_default())
    }
}

fn engine_with(provider: Arc<FakeProvider>) -> (GuidanceEngine, Arc<LocationFeed>) {
    let config = GuidanceConfig::default();
    let feed = Arc::new(LocationFeed::new());
    let search = PlaceSearchClient::new(provider, config.search.clone());
    let engine = GuidanceEngine::new(feed.clone(), search, config);
    (engine, feed)
}

fn fix() -> LocationFix {
    LocationFix {
        coordinate: ORIGIN,
        horizontal_accuracy: 10.0,
        course: None,
    }
}

fn compass(true_heading: f64) -> HeadingFix {
    HeadingFix {
        true_heading,
        magnetic_heading: true_heading,
        heading_accuracy: 5.0,
    }
}

async fn advance(millis: u64) {
    tokio::time::sleep(Duration::from_millis(millis)).await;
}

#[tokio::test(start_paused = true)]
async fn guides_from_permission_prompt_to_navigation() {
    let provider = Arc::new(FakeProvider {
        latency: Duration::from_millis(800),
        ..FakeProvider::default()
    }
    .with("喫煙所", vec![place("South Exit", 450.0), place("North Plaza", 250.0)]));
    let (engine, feed) = engine_with(provider.clone());

    engine.start();
    assert!(feed.is_running());
    assert_eq!(engine.snapshot().state, GuidanceState::PermissionNotDetermined);
    assert!(engine.snapshot().should_show_permission_button);

    engine.request_authorization();
    assert!(feed.take_authorization_request());

    feed.set_authorization(AuthorizationStatus::AuthorizedWhenInUse);
    advance(600).await;
    assert_eq!(engine.snapshot().state, GuidanceState::Locating);
    assert_eq!(engine.snapshot().status_message.as_deref(), Some("測位中…"));

    feed.update_location(fix());
    advance(600).await;
    assert_eq!(engine.snapshot().state, GuidanceState::Searching);

    advance(1_000).await;
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.state, GuidanceState::LowAccuracy);
    assert_eq!(snapshot.current_spot_display_name.as_deref(), Some("North Plaza"));
    assert_eq!(snapshot.distance_text, "徒歩圏内");
    assert!(snapshot.arrow_angle_degrees.is_none());

    feed.update_heading(compass(0.0));
    advance(300).await;
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.state, GuidanceState::Navigating);
    let arrow = snapshot.arrow_angle_degrees.expect("arrow angle");
    assert!(arrow.abs() < 1.0, "arrow was {}", arrow);

    engine.stop();
    assert!(!feed.is_running());
}

#[tokio::test(start_paused = true)]
async fn failed_search_shows_error_and_backs_off() {
    let provider = Arc::new(FakeProvider {
        fail: true,
        ..FakeProvider::default()
    });
    let (engine, feed) = engine_with(provider.clone());
    feed.set_authorization(AuthorizationStatus::AuthorizedWhenInUse);
    feed.update_location(fix());

    engine.start();
    advance(100).await;
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.state, GuidanceState::Error);
    assert!(snapshot.should_show_retry_button);
    let first_attempt = provider.calls();
    assert_eq!(first_attempt, 2);

    advance(3_000).await;
    assert_eq!(provider.calls(), first_attempt);

    advance(3_000).await;
    assert_eq!(provider.calls(), first_attempt * 2);

    engine.stop();
}

#[tokio::test(start_paused = true)]
async fn retry_now_ignores_backoff() {
    let provider = Arc::new(FakeProvider {
        fail: true,
        ..FakeProvider::default()
    });
    let (engine, feed) = engine_with(provider.clone());
    feed.set_authorization(AuthorizationStatus::AuthorizedWhenInUse);
    feed.update_location(fix());

    engine.refresh();
    advance(100).await;
    assert_eq!(provider.calls(), 2);

    engine.retry_search_now();
    advance(100).await;
    assert_eq!(provider.calls(), 4);
    assert_eq!(engine.snapshot().state, GuidanceState::Error);
}

#[tokio::test(start_paused = true)]
async fn cafe_search_broadens_and_switches_target() {
    let provider = Arc::new(
        FakeProvider::default()
            .with("喫煙所", vec![place("Far Booth", 700.0)])
            .with("喫煙可能なカフェ", vec![place("Kissa Aoi", 300.0)]),
    );
    let (engine, feed) = engine_with(provider);
    feed.set_authorization(AuthorizationStatus::AuthorizedWhenInUse);
    feed.update_location(fix());
    feed.update_heading(compass(0.0));

    engine.start();
    advance(200).await;
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.current_spot_display_name.as_deref(), Some("Far Booth"));
    assert!(snapshot.should_suggest_cafe_fallback);

    engine.enable_cafe_search();
    assert_eq!(engine.snapshot().search_mode, SearchMode::IncludeCafe);
    advance(200).await;

    let snapshot = engine.snapshot();
    assert!(snapshot.is_showing_cafe_alternative);
    assert_eq!(
        snapshot.current_spot_display_name.as_deref(),
        Some("喫煙可能なカフェ：Kissa Aoi")
    );
    assert!(!snapshot.should_suggest_cafe_fallback);

    engine.stop();
}

#[tokio::test(start_paused = true)]
async fn subscribers_see_state_changes() {
    let provider = Arc::new(FakeProvider::default());
    let (engine, feed) = engine_with(provider);
    let mut updates = engine.subscribe();

    feed.set_authorization(AuthorizationStatus::Denied);
    engine.refresh();

    updates.changed().await.expect("snapshot update");
    let snapshot = updates.borrow_and_update().clone();
    assert_eq!(snapshot.state, GuidanceState::PermissionDenied);
    assert!(snapshot.should_show_settings_button);

    // Nothing changed, nothing published.
    engine.refresh();
    assert!(!updates.has_changed().expect("sender alive"));
}

fn slow_provider(latency_ms: u64) -> Arc<FakeProvider> {
    Arc::new(
        FakeProvider {
            latency: Duration::from_millis(latency_ms),
            ..FakeProvider::default()
        }
        .with("喫煙所", vec![place("North Plaza", 250.0)]),
    )
}

#[tokio::test(start_paused = true)]
async fn restart_during_search_searches_again() {
    let provider = slow_provider(800);
    let (engine, feed) = engine_with(provider.clone());
    feed.set_authorization(AuthorizationStatus::AuthorizedWhenInUse);
    feed.update_location(fix());
    feed.update_heading(compass(0.0));

    engine.start();
    advance(100).await;
    assert_eq!(provider.calls(), 2);
    assert_eq!(engine.snapshot().state, GuidanceState::Searching);

    engine.stop();
    engine.start();
    advance(1_000).await;

    assert_eq!(provider.calls(), 4);
    assert_eq!(provider.finished(), 2);
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.state, GuidanceState::Navigating);
    assert_eq!(snapshot.current_spot_display_name.as_deref(), Some("North Plaza"));

    engine.stop();
}

#[tokio::test(start_paused = true)]
async fn retry_supersedes_slow_search() {
    let provider = slow_provider(1_500);
    let (engine, feed) = engine_with(provider.clone());
    feed.set_authorization(AuthorizationStatus::AuthorizedWhenInUse);
    feed.update_location(fix());

    engine.refresh();
    advance(500).await;
    assert_eq!(provider.calls(), 2);

    engine.retry_search_now();
    // The first search would have landed at 1500 ms.
    advance(1_200).await;
    assert_eq!(provider.calls(), 4);
    assert_eq!(provider.finished(), 0);
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.state, GuidanceState::Searching);
    assert!(snapshot.current_target.is_none());

    advance(500).await;
    assert_eq!(provider.calls(), 4);
    assert_eq!(provider.finished(), 2);
    assert_eq!(
        engine.snapshot().current_spot_display_name.as_deref(),
        Some("North Plaza")
    );
}

#[tokio::test(start_paused = true)]
async fn cafe_switch_supersedes_slow_search() {
    let provider = Arc::new(
        FakeProvider {
            latency: Duration::from_millis(1_000),
            ..FakeProvider::default()
        }
        .with("喫煙所", vec![place("Far Booth", 700.0)])
        .with("喫煙可能なカフェ", vec![place("Kissa Aoi", 300.0)]),
    );
    let (engine, feed) = engine_with(provider.clone());
    feed.set_authorization(AuthorizationStatus::AuthorizedWhenInUse);
    feed.update_location(fix());

    engine.refresh();
    advance(300).await;
    engine.enable_cafe_search();
    advance(1_500).await;

    // Two smoking-only queries aborted, then two smoking and four café queries.
    assert_eq!(provider.calls(), 8);
    assert_eq!(provider.finished(), 6);
    let snapshot = engine.snapshot();
    assert!(snapshot.is_showing_cafe_alternative);
    assert_eq!(
        snapshot.current_spot_display_name.as_deref(),
        Some("喫煙可能なカフェ：Kissa Aoi")
    );
}

#[tokio::test(start_paused = true)]
async fn stop_abandons_in_flight_search() {
    let provider = slow_provider(800);
    let (engine, feed) = engine_with(provider.clone());
    feed.set_authorization(AuthorizationStatus::AuthorizedWhenInUse);
    feed.update_location(fix());

    engine.start();
    advance(100).await;
    assert_eq!(provider.calls(), 2);

    engine.stop();
    advance(2_000).await;

    assert_eq!(provider.calls(), 2);
    assert_eq!(provider.finished(), 0);
    let snapshot = engine.snapshot();
    assert!(snapshot.current_target.is_none());
    assert_ne!(snapshot.state, GuidanceState::Error);
    assert_ne!(snapshot.state, GuidanceState::NotFound);
}
