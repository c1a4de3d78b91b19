//! SimHarness - a running session plus the plumbing to observe it.

use crate::clock::ManualContext;
use drivesim_core::{
    RouteGenerator, RouteIssue, SessionHandle, SimulationConfig, SimulationEvent,
    SimulationSession,
};
use drivesim_env::{Coordinate, DriveContext, EnvError, Geocoder, LocationProvider};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Errors surfaced while driving a harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Nothing was emitted within the wait budget
    #[error("No event within {0:?}")]
    Timeout(Duration),

    /// The session ended and dropped its event sink
    #[error("Event stream closed")]
    Closed,

    /// The destination lookup ended without a route
    #[error("Route unavailable: {0}")]
    RouteUnavailable(RouteIssue),

    #[error(transparent)]
    Env(#[from] EnvError),
}

/// A [`SimulationSession`] running on its own task, observed through its
/// event stream and its failed-lookup channel.
pub struct SimHarness<C: DriveContext> {
    /// Context the session runs on
    pub context: Arc<C>,

    /// Command side of the session
    pub handle: SessionHandle,

    config: SimulationConfig,
    events: mpsc::UnboundedReceiver<SimulationEvent>,
    issues: mpsc::UnboundedReceiver<RouteIssue>,

    /// Every event observed so far
    log: Vec<SimulationEvent>,

    /// How long to wait for a single event
    wait: Duration,
}

impl<C: DriveContext> SimHarness<C> {
    /// Spawns a session on `context`. Must be called inside a Tokio runtime.
    pub fn launch(
        context: Arc<C>,
        config: SimulationConfig,
        geocoder: Arc<dyn Geocoder>,
        routes: Arc<dyn RouteGenerator>,
        locations: Option<&dyn LocationProvider>,
    ) -> Self {
        let (events_tx, events) = mpsc::unbounded_channel();
        let (session, handle, issues) =
            SimulationSession::new(context.clone(), events_tx, config.clone(), geocoder, routes);
        if let Some(provider) = locations {
            session.attach_locations(provider);
        }
        context.spawn("session", session.run());

        let wait = config.tick_interval() * 2 + Duration::from_secs(5);
        Self {
            context,
            handle,
            config,
            events,
            issues,
            log: Vec::new(),
            wait,
        }
    }

    /// Overrides how long to wait for each event.
    pub fn with_wait(mut self, wait: Duration) -> Self {
        self.wait = wait;
        self
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Every event observed so far, oldest first.
    pub fn log(&self) -> &[SimulationEvent] {
        &self.log
    }

    /// Waits for the next event.
    pub async fn next_event(&mut self) -> Result<SimulationEvent, HarnessError> {
        let event = tokio::time::timeout(self.wait, self.events.recv())
            .await
            .map_err(|_| HarnessError::Timeout(self.wait))?
            .ok_or(HarnessError::Closed)?;
        debug!(?event, "event");
        self.log.push(event.clone());
        Ok(event)
    }

    /// An event that has already been emitted, without waiting.
    pub fn try_next_event(&mut self) -> Option<SimulationEvent> {
        let event = self.events.try_recv().ok()?;
        self.log.push(event.clone());
        Some(event)
    }

    /// A failed lookup that has already been reported, without waiting.
    pub fn try_next_issue(&mut self) -> Option<RouteIssue> {
        self.issues.try_recv().ok()
    }

    /// Waits until a route has loaded, returning its first point.
    ///
    /// Fails with [`HarnessError::RouteUnavailable`] if the lookup is
    /// reported as failed first.
    pub async fn wait_for_route(&mut self) -> Result<Coordinate, HarnessError> {
        let wait = self.wait;
        loop {
            let event = tokio::select! {
                biased;
                issue = self.issues.recv() => {
                    let error = issue.map_or(HarnessError::Closed, HarnessError::RouteUnavailable);
                    return Err(error);
                }
                event = tokio::time::timeout(wait, self.events.recv()) => event
                    .map_err(|_| HarnessError::Timeout(wait))?
                    .ok_or(HarnessError::Closed)?,
            };
            debug!(?event, "event");
            self.log.push(event.clone());
            if let SimulationEvent::LocationUpdated { coordinate } = event {
                return Ok(coordinate);
            }
        }
    }

    /// Searches for `destination` and waits for its route.
    pub async fn search(&mut self, destination: &str) -> Result<Coordinate, HarnessError> {
        self.handle.search(destination)?;
        self.wait_for_route().await
    }

    /// Starts playback and waits until it is running.
    ///
    /// Returns the vehicle's starting point.
    pub async fn start(&mut self) -> Result<Coordinate, HarnessError> {
        self.handle.start()?;
        let mut first = None;
        loop {
            match self.next_event().await? {
                SimulationEvent::LocationUpdated { coordinate } => first = Some(coordinate),
                SimulationEvent::StatusUpdated { running: true } => {
                    return first.ok_or(HarnessError::Closed)
                }
                _ => {}
            }
        }
    }

    /// Collects vehicle positions until playback stops.
    ///
    /// Relies on timers firing by themselves; with a [`ManualContext`] use
    /// [`SimHarness::play_to_completion`] instead.
    pub async fn wait_until_stopped(&mut self) -> Result<Vec<Coordinate>, HarnessError> {
        let mut path = Vec::new();
        loop {
            match self.next_event().await? {
                SimulationEvent::LocationUpdated { coordinate } => path.push(coordinate),
                SimulationEvent::StatusUpdated { running: false } => return Ok(path),
                _ => {}
            }
        }
    }

    /// Starts playback and follows it in real time until it stops.
    pub async fn play_in_real_time(&mut self) -> Result<Vec<Coordinate>, HarnessError> {
        let first = self.start().await?;
        let mut path = vec![first];
        path.extend(self.wait_until_stopped().await?);
        Ok(path)
    }

    /// Ends the session and drains whatever it emitted on the way out.
    pub async fn shutdown(mut self) -> Vec<SimulationEvent> {
        let _ = self.handle.shutdown();
        let mut tail = Vec::new();
        while let Ok(event) = self.next_event().await {
            tail.push(event);
        }
        tail
    }
}

impl SimHarness<ManualContext> {
    /// Spawns a session on a fresh virtual clock.
    pub fn manual(
        config: SimulationConfig,
        geocoder: Arc<dyn Geocoder>,
        routes: Arc<dyn RouteGenerator>,
    ) -> Self {
        Self::launch(ManualContext::shared(), config, geocoder, routes, None)
    }

    /// Advances the virtual clock by one tick interval and returns the event
    /// that tick produced.
    pub async fn step(&mut self) -> Result<SimulationEvent, HarnessError> {
        let fired = self.context.advance(self.config.tick_interval());
        debug!(?fired, now = ?self.context.now(), "advanced virtual clock");
        self.next_event().await
    }

    /// Starts playback and steps the virtual clock until it stops.
    ///
    /// Returns every position the vehicle visited, start included.
    pub async fn play_to_completion(&mut self) -> Result<Vec<Coordinate>, HarnessError> {
        let first = self.start().await?;
        let mut path = vec![first];
        loop {
            match self.step().await? {
                SimulationEvent::LocationUpdated { coordinate } => path.push(coordinate),
                SimulationEvent::StatusUpdated { running: false } => return Ok(path),
                _ => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gps::NoisyLocationFeed;
    use crate::services::{Gazetteer, StraightLineDirections};
    use async_trait::async_trait;
    use drivesim_core::{CoordinateSpan, InterpolatedRoutes, MapRegion, ServiceRoutes};

    const CENTRAL_PARK: Coordinate = Coordinate::new(40.7812, -73.9665);
    const TIMES_SQUARE: Coordinate = Coordinate::new(40.7580, -73.9855);
    const BROOKLYN_BRIDGE: Coordinate = Coordinate::new(40.7061, -73.9969);

    fn interpolated(points: usize) -> SimHarness<ManualContext> {
        let config = SimulationConfig {
            fallback_point_count: points,
            ..Default::default()
        };
        SimHarness::manual(
            config,
            Arc::new(Gazetteer::new_york()),
            Arc::new(InterpolatedRoutes::new(points)),
        )
    }

    /// Parks the simulated device at Central Park.
    async fn at_central_park(harness: &mut SimHarness<ManualContext>) {
        harness.handle.update_location(CENTRAL_PARK).unwrap();
        assert_eq!(
            harness.next_event().await.unwrap(),
            SimulationEvent::RegionUpdated {
                region: MapRegion::around(CENTRAL_PARK, CoordinateSpan::default())
            }
        );
    }

    #[tokio::test]
    async fn test_full_trip_on_virtual_clock() {
        let mut harness = interpolated(31);
        at_central_park(&mut harness).await;

        let start = harness.search("Times Square").await.unwrap();
        assert_eq!(start, CENTRAL_PARK);

        let path = harness.play_to_completion().await.unwrap();

        assert_eq!(path.len(), 31);
        assert_eq!(path.first(), Some(&CENTRAL_PARK));
        assert_eq!(path.last(), Some(&TIMES_SQUARE));
        assert_eq!(harness.context.now(), Duration::from_secs(31));
        assert_eq!(harness.context.pending_timers(), 0);
    }

    #[tokio::test]
    async fn test_service_route_keeps_polyline() {
        let directions = Arc::new(StraightLineDirections::new(500.0));
        let expected = directions.polyline(CENTRAL_PARK, BROOKLYN_BRIDGE);
        let mut harness = SimHarness::manual(
            SimulationConfig::default(),
            Arc::new(Gazetteer::new_york()),
            Arc::new(ServiceRoutes::new(directions)),
        );
        at_central_park(&mut harness).await;

        harness.search("brooklyn bridge").await.unwrap();
        let path = harness.play_to_completion().await.unwrap();

        assert_eq!(path, expected);
    }

    #[tokio::test]
    async fn test_no_region_events_while_running() {
        let mut harness = interpolated(5);
        at_central_park(&mut harness).await;
        harness.search("Times Square").await.unwrap();
        harness.start().await.unwrap();

        harness.handle.update_location(BROOKLYN_BRIDGE).unwrap();
        assert!(matches!(
            harness.step().await.unwrap(),
            SimulationEvent::LocationUpdated { .. }
        ));

        harness.handle.stop().unwrap();
        assert_eq!(
            harness.next_event().await.unwrap(),
            SimulationEvent::StatusUpdated { running: false }
        );

        harness.handle.update_location(BROOKLYN_BRIDGE).unwrap();
        assert!(matches!(
            harness.next_event().await.unwrap(),
            SimulationEvent::RegionUpdated { .. }
        ));
    }

    #[tokio::test]
    async fn test_unknown_destination() {
        let mut harness = interpolated(5);
        at_central_park(&mut harness).await;

        let result = harness.search("Atlantis").await;

        assert!(matches!(
            result,
            Err(HarnessError::RouteUnavailable(RouteIssue::DestinationUnresolved))
        ));
        assert!(harness.try_next_event().is_none());
    }

    #[tokio::test]
    async fn test_unreachable_destination() {
        let directions = Arc::new(StraightLineDirections::default());
        directions.set_unreachable(true);
        let mut harness = SimHarness::manual(
            SimulationConfig::default(),
            Arc::new(Gazetteer::new_york()),
            Arc::new(ServiceRoutes::new(directions)),
        );
        at_central_park(&mut harness).await;

        let result = harness.search("Times Square").await;

        assert!(matches!(
            result,
            Err(HarnessError::RouteUnavailable(RouteIssue::NoRouteFound))
        ));
    }

    #[tokio::test]
    async fn test_start_without_route_does_nothing() {
        let mut harness = interpolated(5);

        harness.handle.start().unwrap();
        harness.context.advance(Duration::from_secs(3));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(harness.try_next_event().is_none());
        assert_eq!(harness.context.pending_timers(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_timer() {
        let mut harness = interpolated(10);
        at_central_park(&mut harness).await;
        harness.search("Times Square").await.unwrap();
        harness.start().await.unwrap();
        harness.step().await.unwrap();

        let context = harness.context.clone();
        let tail = harness.shutdown().await;

        assert_eq!(tail, vec![SimulationEvent::StatusUpdated { running: false }]);
        assert_eq!(context.pending_timers(), 0);
        assert!(context.advance(Duration::from_secs(5)).is_empty());
    }

    #[tokio::test]
    async fn test_toggle_pauses_and_restarts() {
        let mut harness = interpolated(5);
        at_central_park(&mut harness).await;
        harness.search("Times Square").await.unwrap();

        harness.handle.toggle().unwrap();
        assert_eq!(
            harness.next_event().await.unwrap(),
            SimulationEvent::LocationUpdated {
                coordinate: CENTRAL_PARK
            }
        );
        assert_eq!(
            harness.next_event().await.unwrap(),
            SimulationEvent::StatusUpdated { running: true }
        );
        harness.step().await.unwrap();

        harness.handle.toggle().unwrap();
        assert_eq!(
            harness.next_event().await.unwrap(),
            SimulationEvent::StatusUpdated { running: false }
        );

        // Restarting begins again from the first point
        let path = harness.play_to_completion().await.unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], CENTRAL_PARK);
    }

    /// Gazetteer that answers one query slowly.
    struct SlowQuery {
        inner: Gazetteer,
        slow: &'static str,
        delay: Duration,
    }

    #[async_trait]
    impl Geocoder for SlowQuery {
        async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, EnvError> {
            if query == self.slow {
                tokio::time::sleep(self.delay).await;
            }
            self.inner.geocode(query).await
        }
    }

    #[tokio::test]
    async fn test_superseded_search_is_ignored() {
        let geocoder = SlowQuery {
            inner: Gazetteer::new_york(),
            slow: "Times Square",
            delay: Duration::from_millis(150),
        };
        let mut harness = SimHarness::manual(
            SimulationConfig::default(),
            Arc::new(geocoder),
            Arc::new(InterpolatedRoutes::new(4)),
        );
        at_central_park(&mut harness).await;

        harness.handle.search("Times Square").unwrap();
        harness.handle.search("Brooklyn Bridge").unwrap();
        harness.wait_for_route().await.unwrap();

        let path = harness.play_to_completion().await.unwrap();
        assert_eq!(path.last(), Some(&BROOKLYN_BRIDGE));

        // The slow answer lands after playback and must change nothing
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(harness.try_next_event().is_none());
    }

    #[tokio::test]
    async fn test_load_route_supersedes_pending_search() {
        let geocoder = SlowQuery {
            inner: Gazetteer::new_york(),
            slow: "Times Square",
            delay: Duration::from_millis(150),
        };
        let mut harness = SimHarness::manual(
            SimulationConfig::default(),
            Arc::new(geocoder),
            Arc::new(InterpolatedRoutes::new(4)),
        );
        at_central_park(&mut harness).await;

        harness.handle.search("Times Square").unwrap();
        harness.handle.load_route(BROOKLYN_BRIDGE).unwrap();
        harness.wait_for_route().await.unwrap();

        let path = harness.play_to_completion().await.unwrap();
        assert_eq!(path.last(), Some(&BROOKLYN_BRIDGE));

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert!(harness.try_next_event().is_none());
        assert!(harness.try_next_issue().is_none());
    }

    #[tokio::test]
    async fn test_location_feed_sets_route_start() {
        let feed = NoisyLocationFeed::new(CENTRAL_PARK, 0.0, 1, 42);
        let mut harness = SimHarness::launch(
            ManualContext::shared(),
            SimulationConfig::default(),
            Arc::new(Gazetteer::new_york()),
            Arc::new(InterpolatedRoutes::new(3)),
            Some(&feed as &dyn LocationProvider),
        );

        assert!(matches!(
            harness.next_event().await.unwrap(),
            SimulationEvent::RegionUpdated { .. }
        ));
        assert_eq!(harness.search("Grand Central").await.unwrap(), CENTRAL_PARK);
    }
}
