//! Session Runtime - the single logical thread that owns a controller.
//!
//! ```text
//!   SessionHandle ──┐
//!   timer ticks ────┤                  ┌──────────────────────────┐
//!   location feed ──┼──► inbox (mpsc) ─►  SimulationSession::run  │
//!   geocode task ───┤                  │   └─ SimulationController│──► EventSink
//!   route task ─────┘                  └──────────────────────────┘
//!                                                  └──► RouteIssue receiver
//! ```
//!
//! Geocoding and route generation run as spawned tasks and report back
//! through the inbox, so every controller mutation happens on the session
//! task. Spawned tasks and timer callbacks hold only a weak sender: once the
//! last [`SessionHandle`] is gone (or `shutdown` is sent) the session ends,
//! the controller is dropped, its timer is cancelled, and late results have
//! nowhere to go.
//!
//! Lookups that end without a route leave the event stream untouched. Their
//! [`RouteIssue`] goes out on a separate channel for diagnostics.

use crate::config::SimulationConfig;
use crate::controller::{RouteToken, SimulationController};
use crate::error::RouteIssue;
use crate::events::EventSink;
use crate::generator::RouteGenerator;
use crate::route::Route;
use drivesim_env::{
    Coordinate, DriveContext, EnvError, Geocoder, LocationProvider, TickFn, TimerId,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// User-facing commands accepted by a session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Geocode free text and load a route to it
    Search(String),

    /// Load a route to a known coordinate
    LoadRoute(Coordinate),

    Start,
    Stop,
    Toggle,
    Shutdown,
}

/// Everything the session task reacts to.
enum Inbound {
    Command(SessionCommand),
    Tick(TimerId),
    Location(Coordinate),
    Geocoded {
        search: u64,
        query: String,
        result: Result<Option<Coordinate>, EnvError>,
    },
    RouteReady {
        token: RouteToken,
        result: Result<Route, RouteIssue>,
    },
}

/// Cloneable command side of a [`SimulationSession`].
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Inbound>,
}

impl SessionHandle {
    pub fn send(&self, command: SessionCommand) -> Result<(), EnvError> {
        self.tx
            .send(Inbound::Command(command))
            .map_err(|_| EnvError::closed("simulation session"))
    }

    pub fn search(&self, query: impl Into<String>) -> Result<(), EnvError> {
        self.send(SessionCommand::Search(query.into()))
    }

    pub fn load_route(&self, destination: Coordinate) -> Result<(), EnvError> {
        self.send(SessionCommand::LoadRoute(destination))
    }

    pub fn start(&self) -> Result<(), EnvError> {
        self.send(SessionCommand::Start)
    }

    pub fn stop(&self) -> Result<(), EnvError> {
        self.send(SessionCommand::Stop)
    }

    pub fn toggle(&self) -> Result<(), EnvError> {
        self.send(SessionCommand::Toggle)
    }

    pub fn shutdown(&self) -> Result<(), EnvError> {
        self.send(SessionCommand::Shutdown)
    }

    /// Feeds an ambient device fix, as a location provider would.
    pub fn update_location(&self, coordinate: Coordinate) -> Result<(), EnvError> {
        self.tx
            .send(Inbound::Location(coordinate))
            .map_err(|_| EnvError::closed("simulation session"))
    }

    /// Whether the session task has ended.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Owns a [`SimulationController`] and serialises everything that touches it.
pub struct SimulationSession<C, E>
where
    C: DriveContext,
    E: EventSink,
{
    controller: SimulationController<C, E>,
    context: Arc<C>,
    geocoder: Arc<dyn Geocoder>,
    routes: Arc<dyn RouteGenerator>,
    inbox: mpsc::UnboundedReceiver<Inbound>,
    mailbox: mpsc::WeakUnboundedSender<Inbound>,
    issues: mpsc::UnboundedSender<RouteIssue>,

    /// Bumped by every search and every explicit route load; geocode
    /// answers from an older generation are dropped
    search_generation: u64,
}

impl<C, E> SimulationSession<C, E>
where
    C: DriveContext,
    E: EventSink,
{
    /// Creates a session, the handle used to command it and the receiver of
    /// failed-lookup diagnostics.
    ///
    /// Nothing happens until [`SimulationSession::run`] is awaited.
    pub fn new(
        context: Arc<C>,
        sink: E,
        config: SimulationConfig,
        geocoder: Arc<dyn Geocoder>,
        routes: Arc<dyn RouteGenerator>,
    ) -> (Self, SessionHandle, mpsc::UnboundedReceiver<RouteIssue>) {
        let (tx, inbox) = mpsc::unbounded_channel();
        let (issues, issues_rx) = mpsc::unbounded_channel();
        let mailbox = tx.downgrade();

        let ticks = mailbox.clone();
        let on_tick: TickFn = Arc::new(move |timer| {
            if let Some(tx) = ticks.upgrade() {
                let _ = tx.send(Inbound::Tick(timer));
            }
        });

        let controller = SimulationController::new(context.clone(), sink, config, on_tick);
        let session = Self {
            controller,
            context,
            geocoder,
            routes,
            inbox,
            mailbox,
            issues,
            search_generation: 0,
        };
        (session, SessionHandle { tx }, issues_rx)
    }

    pub fn controller(&self) -> &SimulationController<C, E> {
        &self.controller
    }

    /// Forwards every fix from `provider` into the session.
    ///
    /// The forwarding task ends with the provider's stream or the session.
    pub fn attach_locations<L: LocationProvider + ?Sized>(&self, provider: &L) {
        let mut fixes = provider.subscribe();
        let mailbox = self.mailbox.clone();
        self.context.spawn("location-feed", async move {
            while let Some(coordinate) = fixes.recv().await {
                let Some(tx) = mailbox.upgrade() else { break };
                if tx.send(Inbound::Location(coordinate)).is_err() {
                    break;
                }
            }
        });
    }

    /// Processes messages until shutdown or until every handle is dropped.
    pub async fn run(mut self) {
        info!("simulation session started");
        while let Some(message) = self.inbox.recv().await {
            match message {
                Inbound::Command(SessionCommand::Shutdown) => break,
                Inbound::Command(command) => self.handle_command(command),
                Inbound::Tick(timer) => self.controller.on_tick(timer),
                Inbound::Location(coordinate) => self.controller.location_updated(coordinate),
                Inbound::Geocoded {
                    search,
                    query,
                    result,
                } => self.handle_geocoded(search, query, result),
                Inbound::RouteReady { token, result } => self.handle_route(token, result),
            }
        }
        info!(
            running = self.controller.is_running(),
            "simulation session ended"
        );
    }

    fn handle_command(&mut self, command: SessionCommand) {
        debug!(?command, "command");
        match command {
            SessionCommand::Search(query) => self.search(query),
            SessionCommand::LoadRoute(destination) => {
                // A search still geocoding must not replace this route
                self.search_generation += 1;
                self.request_route(destination);
            }
            SessionCommand::Start => self.controller.start(),
            SessionCommand::Stop => self.controller.stop(),
            SessionCommand::Toggle => self.controller.toggle(),
            SessionCommand::Shutdown => {}
        }
    }

    fn search(&mut self, query: String) {
        let query = query.trim().to_string();
        if query.is_empty() {
            debug!("ignoring blank search");
            return;
        }

        self.search_generation += 1;
        let search = self.search_generation;
        let geocoder = self.geocoder.clone();
        let mailbox = self.mailbox.clone();

        self.context.spawn("geocode", async move {
            let result = geocoder.geocode(&query).await;
            if let Some(tx) = mailbox.upgrade() {
                let _ = tx.send(Inbound::Geocoded {
                    search,
                    query,
                    result,
                });
            }
        });
    }

    fn handle_geocoded(
        &mut self,
        search: u64,
        query: String,
        result: Result<Option<Coordinate>, EnvError>,
    ) {
        if search != self.search_generation {
            debug!(search, newest = self.search_generation, %query, "discarding stale geocode");
            return;
        }

        match result {
            Ok(Some(destination)) => {
                info!(%query, %destination, "destination resolved");
                self.request_route(destination);
            }
            Ok(None) => {
                warn!(%query, "destination not found");
                self.report(RouteIssue::DestinationUnresolved);
            }
            Err(e) => {
                warn!(%query, error = %e, "geocoding failed");
                self.report(RouteIssue::DestinationUnresolved);
            }
        }
    }

    fn request_route(&mut self, destination: Coordinate) {
        let request = self.controller.load_route(destination);
        let routes = self.routes.clone();
        let mailbox = self.mailbox.clone();

        self.context.spawn("route", async move {
            let result = routes.generate(request.start, request.destination).await;
            if let Some(tx) = mailbox.upgrade() {
                let _ = tx.send(Inbound::RouteReady {
                    token: request.token,
                    result,
                });
            }
        });
    }

    fn handle_route(&mut self, token: RouteToken, result: Result<Route, RouteIssue>) {
        if !self.controller.is_current(token) {
            debug!(?token, "discarding stale route result");
            return;
        }

        match result {
            Ok(route) if !route.is_empty() => {
                self.controller.complete_route(token, route);
            }
            Ok(_) => {
                warn!("route lookup returned an empty route");
                self.report(RouteIssue::NoRouteFound);
            }
            Err(issue) => {
                warn!(%issue, "route lookup failed");
                self.report(issue);
            }
        }
    }

    fn report(&mut self, issue: RouteIssue) {
        if self.issues.send(issue).is_err() {
            debug!(%issue, "no issue receiver");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::SimulationEvent;
    use crate::generator::InterpolatedRoutes;
    use crate::region::{CoordinateSpan, MapRegion};
    use crate::testing::FakeContext;
    use async_trait::async_trait;
    use std::time::Duration;

    /// Knows exactly one place.
    struct OnePlace;

    #[async_trait]
    impl Geocoder for OnePlace {
        async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, EnvError> {
            match query {
                "home" => Ok(Some(Coordinate::new(1.0, 1.0))),
                "offline" => Err(EnvError::service("geocoder offline")),
                _ => Ok(None),
            }
        }
    }

    struct Running {
        handle: SessionHandle,
        events: mpsc::UnboundedReceiver<SimulationEvent>,
        issues: mpsc::UnboundedReceiver<RouteIssue>,
        context: Arc<FakeContext>,
    }

    fn session(points: usize) -> Running {
        let context = Arc::new(FakeContext::default());
        let (events_tx, events) = mpsc::unbounded_channel();
        let (session, handle, issues) = SimulationSession::new(
            context.clone(),
            events_tx,
            SimulationConfig::default(),
            Arc::new(OnePlace),
            Arc::new(InterpolatedRoutes::new(points)),
        );
        tokio::spawn(session.run());
        Running {
            handle,
            events,
            issues,
            context,
        }
    }

    async fn next<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting")
            .expect("channel closed")
    }

    #[tokio::test]
    async fn test_search_loads_route() {
        let mut s = session(3);
        let origin = Coordinate::new(0.0, 0.0);

        s.handle.update_location(origin).unwrap();
        assert_eq!(
            next(&mut s.events).await,
            SimulationEvent::RegionUpdated {
                region: MapRegion::around(origin, CoordinateSpan::default())
            }
        );

        s.handle.search("  home ").unwrap();
        assert_eq!(
            next(&mut s.events).await,
            SimulationEvent::LocationUpdated { coordinate: origin }
        );
        assert!(matches!(
            next(&mut s.events).await,
            SimulationEvent::RegionUpdated { .. }
        ));
    }

    #[tokio::test]
    async fn test_search_without_location() {
        let mut s = session(3);

        s.handle.search("home").unwrap();

        assert_eq!(next(&mut s.issues).await, RouteIssue::NoCurrentLocation);
        assert!(s.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unresolved_and_failed_geocoding() {
        let mut s = session(3);
        s.handle.update_location(Coordinate::new(0.0, 0.0)).unwrap();
        next(&mut s.events).await;

        s.handle.search("atlantis").unwrap();
        assert_eq!(next(&mut s.issues).await, RouteIssue::DestinationUnresolved);

        s.handle.search("offline").unwrap();
        assert_eq!(next(&mut s.issues).await, RouteIssue::DestinationUnresolved);
        assert!(s.events.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_empty_route_emits_no_events() {
        let mut s = session(0);
        s.handle.update_location(Coordinate::new(0.0, 0.0)).unwrap();
        next(&mut s.events).await;

        s.handle.load_route(Coordinate::new(2.0, 2.0)).unwrap();

        assert_eq!(next(&mut s.issues).await, RouteIssue::NoRouteFound);
        assert!(s.events.try_recv().is_err());

        s.handle.start().unwrap();
        s.handle.shutdown().unwrap();
        assert!(s.events.recv().await.is_none());
        assert_eq!(s.context.scheduled_count(), 0);
    }

    #[tokio::test]
    async fn test_blank_search_ignored_and_shutdown_stops() {
        let mut s = session(3);
        s.handle.update_location(Coordinate::new(0.0, 0.0)).unwrap();
        next(&mut s.events).await;

        s.handle.search("   ").unwrap();
        s.handle.load_route(Coordinate::new(2.0, 2.0)).unwrap();
        assert!(matches!(
            next(&mut s.events).await,
            SimulationEvent::LocationUpdated { .. }
        ));
        next(&mut s.events).await;

        s.handle.start().unwrap();
        assert!(matches!(
            next(&mut s.events).await,
            SimulationEvent::LocationUpdated { .. }
        ));
        assert_eq!(
            next(&mut s.events).await,
            SimulationEvent::StatusUpdated { running: true }
        );
        assert_eq!(s.context.active_count(), 1);

        s.handle.shutdown().unwrap();
        assert_eq!(
            next(&mut s.events).await,
            SimulationEvent::StatusUpdated { running: false }
        );
        assert_eq!(s.context.active_count(), 0);
        assert!(s.events.recv().await.is_none());
        assert!(s.issues.recv().await.is_none());
        assert!(s.handle.is_closed());
    }
}
