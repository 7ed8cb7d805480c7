//! Error types shared across the ride core.
//!
//! Directions failures live next to the gateway in [`crate::directions`]; everything
//! else the core can report is collected here. None of these abort a session: the
//! callers either recover locally or hand the error back to the action that caused it.

use thiserror::Error;

use crate::ecs::RideState;

/// A latitude/longitude pair outside the valid range.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum CoordinateError {
    #[error("latitude {0} is outside [-90, 90]")]
    Latitude(f64),
    #[error("longitude {0} is outside [-180, 180]")]
    Longitude(f64),
}

/// Malformed compact polyline input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolylineError {
    #[error("polyline ended inside a value at byte {offset}")]
    Truncated { offset: usize },
    #[error("byte {byte:#04x} at offset {offset} is not a polyline character")]
    InvalidByte { offset: usize, byte: u8 },
    #[error("polyline value starting before byte {offset} does not fit in 32 bits")]
    Overflow { offset: usize },
}

/// Failures of the key-value store behind the ride records.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store i/o failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store value is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("store is unavailable: {0}")]
    Unavailable(String),
}

/// Failures while loading or validating a [`crate::config::RideConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config value: {0}")]
    Invalid(String),
}

/// Outcome of a location request that did not produce a fix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LocationError {
    /// The rider refused location access. Terminal for the session.
    #[error("location permission denied")]
    PermissionDenied,
    /// Timeout or provider failure; the session keeps waiting for a fix.
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the places-lookup collaborator.
#[derive(Debug, Error)]
pub enum PlacesError {
    #[cfg(feature = "http")]
    #[error("places request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("places request returned http status {0}")]
    HttpStatus(u16),
    #[error("places api returned status {0}")]
    Api(String),
}

/// Rejected rider actions. The session is left unchanged when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RideError {
    #[error("cannot {action} while the ride is {state}")]
    InvalidAction {
        action: &'static str,
        state: RideState,
    },
    #[error("rider position is not known yet")]
    RiderPositionUnknown,
    #[error("location permission was denied for this session")]
    PermissionDenied,
    #[error("ride session has been torn down")]
    SessionClosed,
    #[error("unknown ride option '{0}'")]
    UnknownOption(String),
    #[error("rating must be between 1 and 5, got {0}")]
    InvalidRating(u8),
}
