//! Geographic helpers: coordinates, haversine distance, and linear interpolation.
//!
//! Everything here is a pure function over value copies. Interpolation works in
//! plain lat/lng space, which is accurate enough at the city scale the ride legs
//! cover.

use serde::{Deserialize, Serialize};

use crate::config::StraightLineHeuristic;
use crate::error::CoordinateError;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Checked constructor: rejects values outside [-90, 90] x [-180, 180] (and NaN).
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::Latitude(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn is_valid(&self) -> bool {
        Self::new(self.latitude, self.longitude).is_ok()
    }

    /// Shift by raw degree offsets. Used for decoy seeding and jitter.
    pub fn offset(self, d_lat: f64, d_lng: f64) -> Self {
        Self {
            latitude: self.latitude + d_lat,
            longitude: self.longitude + d_lng,
        }
    }
}

/// Great-circle distance between two coordinates in kilometres.
pub fn distance_km(a: Coordinate, b: Coordinate) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();
    let sin_dlat = (dlat * 0.5).sin();
    let sin_dlon = (dlon * 0.5).sin();
    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Move `fraction` of the way from `from` to `to`.
///
/// Not clamped: callers keep `fraction` within `[0, 1]`.
pub fn move_toward(from: Coordinate, to: Coordinate, fraction: f64) -> Coordinate {
    Coordinate {
        latitude: from.latitude + (to.latitude - from.latitude) * fraction,
        longitude: from.longitude + (to.longitude - from.longitude) * fraction,
    }
}

/// Round to the 0.1 km precision distances are displayed and priced at.
pub fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Where a [`RouteEstimate`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimateSource {
    StraightLine,
    Provider,
}

/// Distance and duration of the rider's trip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RouteEstimate {
    pub distance_km: f64,
    /// Always at least 1.
    pub duration_minutes: u32,
    pub source: EstimateSource,
}

impl RouteEstimate {
    /// Synthesized estimate from haversine distance and a fixed speed heuristic.
    pub fn straight_line(
        origin: Coordinate,
        destination: Coordinate,
        heuristic: &StraightLineHeuristic,
    ) -> Self {
        let km = distance_km(origin, destination);
        let minutes = (km * heuristic.minutes_per_km).round().max(0.0) as u32;
        Self {
            distance_km: round_to_tenth(km),
            duration_minutes: minutes.max(heuristic.min_minutes).max(1),
            source: EstimateSource::StraightLine,
        }
    }

    /// Estimate taken from a directions provider's leg totals.
    pub fn from_provider(distance_meters: f64, duration_seconds: f64) -> Self {
        let minutes = (duration_seconds.max(0.0) / 60.0).round() as u32;
        Self {
            distance_km: round_to_tenth(distance_meters.max(0.0) / 1000.0),
            duration_minutes: minutes.max(1),
            source: EstimateSource::Provider,
        }
    }
}
