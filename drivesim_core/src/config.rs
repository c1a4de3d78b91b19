//! Simulation configuration.

use crate::error::ConfigError;
use crate::region::CoordinateSpan;
use crate::route::DEFAULT_POINT_COUNT;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Which route generator to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStrategy {
    /// Straight line with a fixed number of points
    #[default]
    Interpolated,

    /// Polyline from a directions service
    Service,
}

impl RouteStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            RouteStrategy::Interpolated => "interpolated",
            RouteStrategy::Service => "service",
        }
    }
}

impl FromStr for RouteStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "interpolated" | "fallback" => Ok(RouteStrategy::Interpolated),
            "service" | "directions" => Ok(RouteStrategy::Service),
            _ => Err(format!("Unknown route strategy: {}", s)),
        }
    }
}

/// Configuration for a simulation session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Playback tick interval in milliseconds (default: 1000)
    pub tick_interval_ms: u64,

    /// Points produced by the interpolated fallback (default: 31)
    pub fallback_point_count: usize,

    /// Span of regions emitted when re-centering on a point
    pub region_span: CoordinateSpan,

    /// Padding applied when framing a whole route (default: 1.5)
    pub route_padding: f64,

    /// Route generator selection
    pub strategy: RouteStrategy,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1000,
            fallback_point_count: DEFAULT_POINT_COUNT,
            region_span: CoordinateSpan::default(),
            route_padding: 1.5,
            strategy: RouteStrategy::default(),
        }
    }
}

impl SimulationConfig {
    /// Tick interval as a `Duration`.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a JSON config file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    /// Rejects values the controller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("tick_interval_ms must be positive".into()));
        }
        if self.fallback_point_count < 2 {
            return Err(ConfigError::Invalid(
                "fallback_point_count must be at least 2".into(),
            ));
        }
        if !(self.route_padding.is_finite() && self.route_padding > 0.0) {
            return Err(ConfigError::Invalid("route_padding must be positive".into()));
        }
        Ok(())
    }
}
