//! Platform services consumed by the simulation.
//!
//! None of these are implemented by drivesim itself in production. They are
//! the seams where a map SDK, a geocoder or a GPS receiver plugs in.
//!
//! ```text
//!  "Times Square" --geocode()--> Coordinate
//!  (from, to)     --directions()--> [Coordinate; n]   (driving polyline)
//!  GPS            --subscribe()--> stream of Coordinate
//! ```

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::Coordinate;
use tokio::sync::mpsc;

/// Forward geocoding: free text to a coordinate.
#[async_trait]
pub trait Geocoder: Send + Sync + 'static {
    /// Resolves `query` to a coordinate.
    ///
    /// # Returns
    /// * `Ok(Some(coordinate))` - best match
    /// * `Ok(None)` - nothing matched the query
    /// * `Err(EnvError)` - the service failed
    async fn geocode(&self, query: &str) -> Result<Option<Coordinate>, EnvError>;
}

/// Driving directions between two coordinates.
#[async_trait]
pub trait DirectionsService: Send + Sync + 'static {
    /// Returns the polyline of the first driving route from `from` to `to`,
    /// or `None` when no route exists.
    ///
    /// The polyline is ordered from `from` to `to`; its density is whatever
    /// the service chooses.
    async fn directions(
        &self,
        from: Coordinate,
        to: Coordinate,
    ) -> Result<Option<Vec<Coordinate>>, EnvError>;
}

/// Push-based source of device location fixes.
pub trait LocationProvider: Send + Sync + 'static {
    /// Opens a new subscription.
    ///
    /// The stream ends when the provider stops producing fixes.
    fn subscribe(&self) -> mpsc::UnboundedReceiver<Coordinate>;
}
