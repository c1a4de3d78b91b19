//! Common types for the drivesim environment abstraction.

use serde::{Deserialize, Serialize};

/// A WGS84 coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Creates a coordinate from latitude and longitude.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Linear interpolation towards `other`.
    ///
    /// `progress` of 0.0 returns `self`, 1.0 returns `other`. Values outside
    /// that range extrapolate along the same line.
    pub fn lerp(&self, other: &Coordinate, progress: f64) -> Coordinate {
        Coordinate {
            latitude: self.latitude + (other.latitude - self.latitude) * progress,
            longitude: self.longitude + (other.longitude - self.longitude) * progress,
        }
    }

    /// Component-wise midpoint between two coordinates.
    pub fn midpoint(&self, other: &Coordinate) -> Coordinate {
        self.lerp(other, 0.5)
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.latitude, self.longitude)
    }
}

/// Identifier of a repeating timer handed out by a [`DriveContext`].
///
/// [`DriveContext`]: crate::DriveContext
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp_endpoints() {
        let a = Coordinate::new(40.0, -74.0);
        let b = Coordinate::new(41.0, -73.0);

        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);
        assert_eq!(a.midpoint(&b), Coordinate::new(40.5, -73.5));
    }

    #[test]
    fn test_display() {
        let c = Coordinate::new(40.7812, -73.9665);
        assert_eq!(c.to_string(), "(40.781200, -73.966500)");
        assert_eq!(TimerId(3).to_string(), "timer#3");
    }
}
