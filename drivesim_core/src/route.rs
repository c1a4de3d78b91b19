//! Routes: ordered, timestamped points a simulated vehicle traverses.

use crate::region::MapRegion;
use drivesim_env::Coordinate;
use geo::{HaversineDistance, Point};
use serde::{Deserialize, Serialize};

/// Number of points produced by the interpolated fallback: one per second
/// for a 30 second trip.
pub const DEFAULT_POINT_COUNT: usize = 31;

/// A single point on a route.
///
/// `timestamp` is seconds from route start. It orders points and nothing
/// else; it is never compared with wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    coordinate: Coordinate,
    timestamp: f64,
}

impl RoutePoint {
    pub fn new(coordinate: Coordinate, timestamp: f64) -> Self {
        Self {
            coordinate,
            timestamp,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coordinate
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// An ordered sequence of [`RoutePoint`]s; insertion order is traversal order.
///
/// An empty route is valid and means "no route available".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    points: Vec<RoutePoint>,
}

impl Route {
    /// Builds a route from points already in traversal order.
    pub fn new(points: Vec<RoutePoint>) -> Self {
        Self { points }
    }

    /// The "no route" value.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Wraps a polyline, stamping each coordinate with its index.
    pub fn from_polyline<I>(coordinates: I) -> Self
    where
        I: IntoIterator<Item = Coordinate>,
    {
        let points = coordinates
            .into_iter()
            .enumerate()
            .map(|(i, coordinate)| RoutePoint::new(coordinate, i as f64))
            .collect();
        Self { points }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn get(&self, index: usize) -> Option<&RoutePoint> {
        self.points.get(index)
    }

    /// Start of the route.
    pub fn first(&self) -> Option<&RoutePoint> {
        self.points.first()
    }

    /// Destination of the route.
    pub fn last(&self) -> Option<&RoutePoint> {
        self.points.last()
    }

    pub fn points(&self) -> &[RoutePoint] {
        &self.points
    }

    pub fn coordinates(&self) -> impl Iterator<Item = Coordinate> + '_ {
        self.points.iter().map(RoutePoint::coordinate)
    }

    /// Great-circle length of the polyline in metres.
    pub fn length_meters(&self) -> f64 {
        self.points
            .windows(2)
            .map(|pair| {
                to_point(&pair[0].coordinate).haversine_distance(&to_point(&pair[1].coordinate))
            })
            .sum()
    }

    /// Region framing the start and destination, or `None` for an empty route.
    pub fn bounding_region(&self, padding: f64) -> Option<MapRegion> {
        let first = self.first()?.coordinate;
        let last = self.last()?.coordinate;
        Some(MapRegion::framing(first, last, padding))
    }
}

fn to_point(coordinate: &Coordinate) -> Point<f64> {
    Point::new(coordinate.longitude, coordinate.latitude)
}

/// Straight-line route from `start` to `end` with `count` evenly spaced points.
///
/// Point `i` sits at progress `i / (count - 1)` and carries timestamp `i`.
/// A count of 1 yields just `start`; a count of 0 yields an empty route.
pub fn interpolate(start: Coordinate, end: Coordinate, count: usize) -> Route {
    match count {
        0 => Route::empty(),
        1 => Route::new(vec![RoutePoint::new(start, 0.0)]),
        _ => {
            let last = count - 1;
            Route::from_polyline((0..count).map(|i| {
                if i == last {
                    end
                } else {
                    start.lerp(&end, i as f64 / last as f64)
                }
            }))
        }
    }
}
