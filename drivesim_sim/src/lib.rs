//! drivesim Simulation Harness
//!
//! Runs the route simulation without a map SDK, a GPS receiver or a wall
//! clock:
//! - **Time**: [`ManualContext`] fires timers only when the clock is advanced
//! - **Services**: in-memory geocoder, straight-line directions, scripted
//!   and noisy location feeds
//! - **Observation**: [`SimHarness`] spawns a session and reads its events
//!
//! # Usage
//!
//! ```ignore
//! use drivesim_sim::{Gazetteer, SimHarness};
//! use drivesim_core::{InterpolatedRoutes, SimulationConfig};
//!
//! let mut harness = SimHarness::manual(
//!     SimulationConfig::default(),
//!     Arc::new(Gazetteer::new_york()),
//!     Arc::new(InterpolatedRoutes::default()),
//! );
//! harness.handle.update_location(central_park)?;
//! harness.search("Times Square").await?;
//! let path = harness.play_to_completion().await?;
//! ```

mod clock;
mod gps;
mod harness;
mod services;

pub use clock::ManualContext;
pub use gps::NoisyLocationFeed;
pub use harness::{HarnessError, SimHarness};
pub use services::{Gazetteer, ScriptedLocations, StraightLineDirections};
