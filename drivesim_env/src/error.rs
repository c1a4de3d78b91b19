//! Error types for the drivesim environment abstraction.

use thiserror::Error;

/// Errors raised by platform collaborators (geocoding, directions, location feeds).
#[derive(Debug, Error)]
pub enum EnvError {
    /// A remote service could not be reached or refused the request
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A channel to or from a collaborator was closed
    #[error("Channel closed: {0}")]
    ChannelClosed(String),
}

impl EnvError {
    /// Creates a service error.
    pub fn service(msg: impl Into<String>) -> Self {
        Self::ServiceUnavailable(msg.into())
    }

    /// Creates a closed-channel error.
    pub fn closed(what: impl std::fmt::Display) -> Self {
        Self::ChannelClosed(what.to_string())
    }
}
