use thiserror::Error;

use crate::error::PolylineError;

/// Errors encountered while fetching or decoding a route.
///
/// None of these reach the rider: the session maps every one of them to an absent
/// route and keeps the straight-line estimate.
#[derive(Debug, Error)]
pub enum DirectionsError {
    #[cfg(feature = "http")]
    #[error("directions request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("directions request returned http status {0}")]
    HttpStatus(u16),
    #[error("directions response is not valid json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("directions api returned status {status}")]
    Api {
        status: String,
        message: Option<String>,
    },
    #[error("no route between origin and destination")]
    ZeroResults,
    #[error("directions response has no route, leg or polyline")]
    MissingRoute,
    #[error("route point {latitude}, {longitude} is outside the valid coordinate range")]
    PointOutOfRange { latitude: f64, longitude: f64 },
    #[error("route polyline is malformed: {0}")]
    MalformedPolyline(#[from] PolylineError),
}
