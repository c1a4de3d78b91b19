//! drivesim Core - route generation and simulated vehicle playback
//!
//! A destination is turned into a [`Route`] (interpolated, or from a
//! directions service) and a [`SimulationController`] moves a vehicle along
//! it one point per tick, reporting positions, map regions and run state to
//! an [`EventSink`]. The [`SimulationSession`] owns a controller and
//! marshals asynchronous geocoding and routing results onto it.

pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod generator;
pub mod region;
pub mod route;
pub mod session;

#[cfg(test)]
mod testing;

// Re-export key types for convenience
pub use config::{RouteStrategy, SimulationConfig};
pub use controller::{PlaybackState, RouteRequest, RouteToken, SimulationController};
pub use error::{ConfigError, RouteIssue};
pub use events::{EventSink, RecordingSink, SimulationEvent};
pub use generator::{generator_for, InterpolatedRoutes, RouteGenerator, ServiceRoutes};
pub use region::{CoordinateSpan, MapRegion};
pub use route::{interpolate, Route, RoutePoint, DEFAULT_POINT_COUNT};
pub use session::{SessionCommand, SessionHandle, SimulationSession};
