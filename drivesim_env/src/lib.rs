//! drivesim Environment Abstraction Layer
//!
//! This crate provides the "Sans-IO" seam that lets the route simulation run
//! against a real **Tokio** runtime or a **virtual clock** in tests.
//!
//! # Core Concept
//!
//! Everything the simulation cannot control is intercepted:
//! - Time (`now()`, repeating timers)
//! - Background work (`spawn()`)
//! - Platform services (geocoding, directions, device location)
//!
//! # Example
//!
//! ```ignore
//! use drivesim_env::{DriveContext, TokioContext};
//!
//! let ctx = TokioContext::shared();
//! let timer = ctx.schedule_repeating(Duration::from_secs(1), Arc::new(|id| {
//!     println!("tick from {id}");
//! }));
//! ctx.cancel(timer);
//! ```

mod context;
mod services;
mod types;
mod error;
mod tokio_impl;

pub use context::{DriveContext, TickFn};
pub use services::{DirectionsService, Geocoder, LocationProvider};
pub use types::{Coordinate, TimerId};
pub use error::EnvError;
pub use tokio_impl::TokioContext;
