//! The playback state machine.
//!
//! ```text
//!            start() [route non-empty]
//!   ┌──────┐ ─────────────────────────► ┌─────────┐ ──┐
//!   │ Idle │                            │ Running │   │ tick (cursor < len)
//!   └──────┘ ◄───────────────────────── └─────────┘ ◄─┘
//!            stop() / tick (cursor == len)
//! ```
//!
//! The controller never blocks and never spawns. Route lookups are split into
//! [`SimulationController::load_route`], which issues a [`RouteRequest`], and
//! [`SimulationController::complete_route`], which applies the answer if the
//! request is still the newest one.

use crate::config::SimulationConfig;
use crate::events::{EventSink, SimulationEvent};
use crate::region::MapRegion;
use crate::route::Route;
use drivesim_env::{Coordinate, DriveContext, TickFn, TimerId};
use std::sync::Arc;
use tracing::{debug, info};

/// Playback state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Running,
}

/// Generation number of a route request.
///
/// Only the token of the most recent [`RouteRequest`] is accepted by
/// [`SimulationController::complete_route`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteToken(u64);

/// A route lookup the owner must carry out.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    pub token: RouteToken,

    /// Device position at request time, `None` if never observed
    pub start: Option<Coordinate>,

    pub destination: Coordinate,
}

/// Drives a simulated vehicle along a [`Route`], one point per tick.
///
/// All methods must be called from a single logical thread. Timer ticks
/// arrive through the `on_tick` callback given at construction; the owner is
/// expected to route them back into [`SimulationController::on_tick`].
pub struct SimulationController<C, E>
where
    C: DriveContext,
    E: EventSink,
{
    context: Arc<C>,
    sink: E,
    config: SimulationConfig,
    on_tick: TickFn,

    route: Route,
    cursor: usize,
    running: bool,
    timer: Option<TimerId>,

    /// Last position reported for the simulated vehicle
    vehicle_location: Option<Coordinate>,

    /// Last ambient fix from the location provider
    device_location: Option<Coordinate>,

    /// Newest route request issued
    generation: u64,
}

impl<C, E> SimulationController<C, E>
where
    C: DriveContext,
    E: EventSink,
{
    pub fn new(context: Arc<C>, sink: E, config: SimulationConfig, on_tick: TickFn) -> Self {
        Self {
            context,
            sink,
            config,
            on_tick,
            route: Route::empty(),
            cursor: 0,
            running: false,
            timer: None,
            vehicle_location: None,
            device_location: None,
            generation: 0,
        }
    }

    pub fn state(&self) -> PlaybackState {
        if self.running {
            PlaybackState::Running
        } else {
            PlaybackState::Idle
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn vehicle_location(&self) -> Option<Coordinate> {
        self.vehicle_location
    }

    pub fn device_location(&self) -> Option<Coordinate> {
        self.device_location
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Issues a route request from the device position to `destination`.
    ///
    /// Supersedes every earlier request. Playback state is untouched.
    pub fn load_route(&mut self, destination: Coordinate) -> RouteRequest {
        self.generation += 1;
        let request = RouteRequest {
            token: RouteToken(self.generation),
            start: self.device_location,
            destination,
        };
        debug!(
            generation = self.generation,
            destination = %destination,
            has_start = request.start.is_some(),
            "route requested"
        );
        request
    }

    /// Whether `token` belongs to the newest request.
    pub fn is_current(&self, token: RouteToken) -> bool {
        token.0 == self.generation
    }

    /// Applies the answer to a route request.
    ///
    /// Returns `false` without any effect when the token is stale or the
    /// route is empty. Otherwise the route replaces the held one, the cursor
    /// resets and the vehicle is placed on the first point.
    pub fn complete_route(&mut self, token: RouteToken, route: Route) -> bool {
        if !self.is_current(token) {
            debug!(token = token.0, newest = self.generation, "discarding stale route");
            return false;
        }
        let Some(first) = route.first().map(|p| p.coordinate()) else {
            debug!(token = token.0, "route lookup returned no points");
            return false;
        };

        info!(points = route.len(), start = %first, "route loaded");
        self.route = route;
        self.cursor = 0;
        self.vehicle_location = Some(first);
        self.sink.emit(SimulationEvent::LocationUpdated { coordinate: first });
        self.center_on(first);
        true
    }

    /// Starts playback from the first point.
    ///
    /// No-op when the route is empty or playback is already running.
    pub fn start(&mut self) {
        if self.running {
            debug!("start ignored: already running");
            return;
        }
        let Some(first) = self.route.first().map(|p| p.coordinate()) else {
            debug!("start ignored: no route");
            return;
        };

        self.running = true;
        self.cursor = 0;
        self.vehicle_location = Some(first);

        let period = self.config.tick_interval();
        let timer = self.context.schedule_repeating(period, self.on_tick.clone());
        self.timer = Some(timer);
        debug!(%timer, points = self.route.len(), "playback started");

        self.sink.emit(SimulationEvent::LocationUpdated { coordinate: first });
        self.sink.emit(SimulationEvent::StatusUpdated { running: true });
    }

    /// Advances playback by one point, stopping once the route is exhausted.
    ///
    /// Ticks from any timer other than the active one are ignored.
    pub fn on_tick(&mut self, timer: TimerId) {
        if !self.running || self.timer != Some(timer) {
            debug!(%timer, "ignoring tick from inactive timer");
            return;
        }

        self.cursor += 1;
        match self.route.get(self.cursor).map(|p| p.coordinate()) {
            Some(coordinate) => {
                self.vehicle_location = Some(coordinate);
                self.sink.emit(SimulationEvent::LocationUpdated { coordinate });
                self.center_on(coordinate);
            }
            None => {
                debug!(cursor = self.cursor, "route exhausted");
                self.stop();
            }
        }
    }

    /// Stops playback and cancels the timer.
    ///
    /// Safe to call at any time; when already idle nothing is emitted.
    pub fn stop(&mut self) {
        if let Some(timer) = self.timer.take() {
            self.context.cancel(timer);
        }
        if !self.running {
            return;
        }

        self.running = false;
        debug!(cursor = self.cursor, "playback stopped");
        self.sink.emit(SimulationEvent::StatusUpdated { running: false });
    }

    /// Flips between running and idle.
    pub fn toggle(&mut self) {
        if self.running {
            self.stop();
        } else {
            self.start();
        }
    }

    /// Records an ambient device fix.
    ///
    /// The fix becomes the start of future route requests and, while idle,
    /// re-centres the map.
    pub fn location_updated(&mut self, coordinate: Coordinate) {
        self.device_location = Some(coordinate);
        self.center_on(coordinate);
    }

    /// Region events are suppressed while running; the adapter follows the
    /// vehicle itself.
    fn center_on(&mut self, coordinate: Coordinate) {
        if self.running {
            return;
        }
        let region = MapRegion::around(coordinate, self.config.region_span);
        self.sink.emit(SimulationEvent::RegionUpdated { region });
    }
}

impl<C, E> Drop for SimulationController<C, E>
where
    C: DriveContext,
    E: EventSink,
{
    fn drop(&mut self) {
        self.stop();
    }
}
