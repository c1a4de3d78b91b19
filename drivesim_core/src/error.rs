//! Error types for route lookup and configuration.

use serde::Serialize;
use thiserror::Error;

/// Why a lookup produced no route.
///
/// None of these are faults: each one simply yields an empty route. The
/// `Display` text is what a user-facing adapter shows in its alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteIssue {
    /// The device position (route start) is unknown
    #[error("Unable to get your current location. Please check location permissions.")]
    NoCurrentLocation,

    /// Geocoding found nothing for the destination text
    #[error("Location not found. Please try a different destination.")]
    DestinationUnresolved,

    /// The routing service returned no route
    #[error("No route found to this destination.")]
    NoRouteFound,
}

/// Errors raised while loading a [`SimulationConfig`].
///
/// [`SimulationConfig`]: crate::SimulationConfig
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}
