//! Map framing: what part of the map an adapter should show.

use drivesim_env::Coordinate;
use serde::{Deserialize, Serialize};

/// Extent of a map region in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSpan {
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl CoordinateSpan {
    pub const fn new(latitude_delta: f64, longitude_delta: f64) -> Self {
        Self {
            latitude_delta,
            longitude_delta,
        }
    }

    /// Same delta on both axes.
    pub const fn uniform(delta: f64) -> Self {
        Self::new(delta, delta)
    }
}

impl Default for CoordinateSpan {
    /// Street-level zoom, roughly one kilometre across.
    fn default() -> Self {
        Self::uniform(0.01)
    }
}

/// A map viewport: centre plus span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapRegion {
    pub center: Coordinate,
    pub span: CoordinateSpan,
}

impl MapRegion {
    /// Region of `span` centred on `center`.
    pub fn around(center: Coordinate, span: CoordinateSpan) -> Self {
        Self { center, span }
    }

    /// Region showing both `a` and `b`, centred between them.
    ///
    /// The span is the absolute difference on each axis scaled by `padding`,
    /// so a padding above 1.0 leaves a margin around both points.
    pub fn framing(a: Coordinate, b: Coordinate, padding: f64) -> Self {
        Self {
            center: a.midpoint(&b),
            span: CoordinateSpan::new(
                (a.latitude - b.latitude).abs() * padding,
                (a.longitude - b.longitude).abs() * padding,
            ),
        }
    }

    /// Whether `coordinate` lies inside the region (edges included).
    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        (coordinate.latitude - self.center.latitude).abs() <= self.span.latitude_delta / 2.0
            && (coordinate.longitude - self.center.longitude).abs()
                <= self.span.longitude_delta / 2.0
    }
}
