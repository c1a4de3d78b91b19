//! Route generation strategies.
//!
//! Two strategies produce a [`Route`] from the device position to a
//! destination:
//!
//! - [`InterpolatedRoutes`]: straight line, fixed point count, no network
//! - [`ServiceRoutes`]: whatever polyline a [`DirectionsService`] returns
//!
//! Both report the reason for an empty result as a [`RouteIssue`] rather
//! than failing.

use crate::config::{RouteStrategy, SimulationConfig};
use crate::error::RouteIssue;
use crate::route::{interpolate, Route, DEFAULT_POINT_COUNT};
use async_trait::async_trait;
use drivesim_env::{Coordinate, DirectionsService};
use std::sync::Arc;
use tracing::{debug, warn};

/// Produces a route between the device position and a destination.
///
/// Exactly one result per call. Implementations may complete immediately or
/// after a network round trip; callers must not rely on either.
#[async_trait]
pub trait RouteGenerator: Send + Sync + 'static {
    /// Generates a route from `start` to `destination`.
    ///
    /// `start` is `None` when no device position has been observed yet.
    async fn generate(
        &self,
        start: Option<Coordinate>,
        destination: Coordinate,
    ) -> Result<Route, RouteIssue>;
}

/// Deterministic straight-line fallback used when no routing service exists.
#[derive(Debug, Clone, Copy)]
pub struct InterpolatedRoutes {
    point_count: usize,
}

impl InterpolatedRoutes {
    pub fn new(point_count: usize) -> Self {
        Self { point_count }
    }

    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// The synchronous core of [`RouteGenerator::generate`].
    pub fn route_between(&self, start: Coordinate, destination: Coordinate) -> Route {
        interpolate(start, destination, self.point_count)
    }
}

impl Default for InterpolatedRoutes {
    fn default() -> Self {
        Self::new(DEFAULT_POINT_COUNT)
    }
}

#[async_trait]
impl RouteGenerator for InterpolatedRoutes {
    async fn generate(
        &self,
        start: Option<Coordinate>,
        destination: Coordinate,
    ) -> Result<Route, RouteIssue> {
        let start = start.ok_or(RouteIssue::NoCurrentLocation)?;
        Ok(self.route_between(start, destination))
    }
}

/// Route backed by a directions service, keeping the service's point density.
pub struct ServiceRoutes<D: DirectionsService> {
    directions: Arc<D>,
}

impl<D: DirectionsService> ServiceRoutes<D> {
    pub fn new(directions: Arc<D>) -> Self {
        Self { directions }
    }
}

#[async_trait]
impl<D: DirectionsService> RouteGenerator for ServiceRoutes<D> {
    async fn generate(
        &self,
        start: Option<Coordinate>,
        destination: Coordinate,
    ) -> Result<Route, RouteIssue> {
        let start = start.ok_or(RouteIssue::NoCurrentLocation)?;

        match self.directions.directions(start, destination).await {
            Ok(Some(polyline)) if !polyline.is_empty() => {
                debug!(points = polyline.len(), "directions returned polyline");
                Ok(Route::from_polyline(polyline))
            }
            Ok(_) => Err(RouteIssue::NoRouteFound),
            Err(e) => {
                warn!(error = %e, "directions request failed");
                Err(RouteIssue::NoRouteFound)
            }
        }
    }
}

/// Picks the generator named by `config.strategy`.
///
/// `directions` is only consulted for [`RouteStrategy::Service`]; without one
/// the interpolated fallback is used.
pub fn generator_for<D: DirectionsService>(
    config: &SimulationConfig,
    directions: Option<Arc<D>>,
) -> Arc<dyn RouteGenerator> {
    match (config.strategy, directions) {
        (RouteStrategy::Service, Some(directions)) => Arc::new(ServiceRoutes::new(directions)),
        (RouteStrategy::Service, None) => {
            warn!("no directions service available, using interpolated routes");
            Arc::new(InterpolatedRoutes::new(config.fallback_point_count))
        }
        (RouteStrategy::Interpolated, _) => {
            Arc::new(InterpolatedRoutes::new(config.fallback_point_count))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drivesim_env::EnvError;

    /// Directions stub returning a canned answer.
    struct CannedDirections(Result<Option<Vec<Coordinate>>, ()>);

    #[async_trait]
    impl DirectionsService for CannedDirections {
        async fn directions(
            &self,
            _from: Coordinate,
            _to: Coordinate,
        ) -> Result<Option<Vec<Coordinate>>, EnvError> {
            self.0.clone().map_err(|_| EnvError::service("offline"))
        }
    }

    fn service(answer: Result<Option<Vec<Coordinate>>, ()>) -> ServiceRoutes<CannedDirections> {
        ServiceRoutes::new(Arc::new(CannedDirections(answer)))
    }

    #[tokio::test]
    async fn test_interpolated_requires_start() {
        let routes = InterpolatedRoutes::default();
        let result = routes.generate(None, Coordinate::new(1.0, 1.0)).await;

        assert_eq!(result, Err(RouteIssue::NoCurrentLocation));
    }

    #[tokio::test]
    async fn test_interpolated_uses_point_count() {
        let routes = InterpolatedRoutes::new(3);
        let route = routes
            .generate(Some(Coordinate::new(0.0, 0.0)), Coordinate::new(10.0, 10.0))
            .await
            .unwrap();

        assert_eq!(route.len(), 3);
        assert_eq!(route.get(1).unwrap().coordinate(), Coordinate::new(5.0, 5.0));
    }

    #[tokio::test]
    async fn test_service_keeps_polyline_density() {
        let polyline = vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(0.0, 0.5),
            Coordinate::new(0.2, 0.9),
            Coordinate::new(1.0, 1.0),
        ];
        let routes = service(Ok(Some(polyline.clone())));

        let route = routes
            .generate(Some(Coordinate::new(0.0, 0.0)), Coordinate::new(1.0, 1.0))
            .await
            .unwrap();

        assert_eq!(route.coordinates().collect::<Vec<_>>(), polyline);
        assert_eq!(route.last().unwrap().timestamp(), 3.0);
    }

    #[tokio::test]
    async fn test_service_without_route() {
        let start = Some(Coordinate::new(0.0, 0.0));
        let dest = Coordinate::new(1.0, 1.0);

        assert_eq!(
            service(Ok(None)).generate(start, dest).await,
            Err(RouteIssue::NoRouteFound)
        );
        assert_eq!(
            service(Ok(Some(vec![]))).generate(start, dest).await,
            Err(RouteIssue::NoRouteFound)
        );
        assert_eq!(
            service(Err(())).generate(start, dest).await,
            Err(RouteIssue::NoRouteFound)
        );
        assert_eq!(
            service(Ok(None)).generate(None, dest).await,
            Err(RouteIssue::NoCurrentLocation)
        );
    }

    #[tokio::test]
    async fn test_generator_for_falls_back_without_service() {
        let config = SimulationConfig {
            strategy: RouteStrategy::Service,
            fallback_point_count: 4,
            ..Default::default()
        };

        let routes = generator_for::<CannedDirections>(&config, None);
        let route = routes
            .generate(Some(Coordinate::new(0.0, 0.0)), Coordinate::new(3.0, 3.0))
            .await
            .unwrap();

        assert_eq!(route.len(), 4);
    }
}
