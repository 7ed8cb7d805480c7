//! Directions gateway: trait abstraction over the route provider.
//!
//! Implementations:
//!
//! - **`GoogleDirectionsClient`** (feature `http`): Google Directions JSON API over a
//!   blocking HTTP client.
//! - **`CachedDirectionsGateway`**: LRU cache in front of any gateway.
//! - **`StaticDirectionsGateway`**: fixed answer, used by tests and the offline demo.
//!
//! A gateway answers with a raw [`RouteResult`] or `None`. Turning that into
//! something the session can show (decoded path, markup-free steps, provider
//! estimate) happens in [`resolve_route`]; any failure along the way is an absent
//! route and the session keeps its straight-line fallback.

use std::num::NonZeroUsize;
use std::sync::Mutex;

use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::geo::{distance_km, move_toward, Coordinate, RouteEstimate};
use crate::polyline::{decode, encode, strip_markup};

#[cfg(feature = "http")]
pub mod client;
pub mod error;
mod parser;
mod response;

#[cfg(feature = "http")]
pub use client::GoogleDirectionsClient;
pub use error::DirectionsError;
pub use parser::parse_directions_json;

// ---------------------------------------------------------------------------
// Core types
// ---------------------------------------------------------------------------

/// One turn-by-turn step as the provider sent it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawStep {
    /// Instruction with provider markup still in place.
    pub instruction_markup: String,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// Provider answer for one origin/destination pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteResult {
    pub encoded_polyline: String,
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub steps: Vec<RawStep>,
}

/// A displayable step: instruction text without markup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectionStep {
    pub instruction: String,
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

/// A route the session can display and price against.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRoute {
    pub path: Vec<Coordinate>,
    pub steps: Vec<DirectionStep>,
    pub estimate: RouteEstimate,
}

/// Trait for directions backends. Implementations must be `Send + Sync` so a
/// gateway can be shared between sessions.
pub trait DirectionsGateway: Send + Sync {
    /// Fetch a driving route. `None` covers every failure, including zero results.
    fn fetch_route(&self, origin: Coordinate, destination: Coordinate) -> Option<RouteResult>;
}

/// Decode the polyline and clean the steps of a provider answer.
///
/// An empty or malformed polyline, or one with a point off the globe, is an
/// error: the caller keeps the fallback path.
pub fn resolve_route(result: &RouteResult) -> Result<ResolvedRoute, DirectionsError> {
    let path = decode(&result.encoded_polyline)?;
    if path.is_empty() {
        return Err(DirectionsError::MissingRoute);
    }
    if let Some(point) = path.iter().find(|point| !point.is_valid()) {
        return Err(DirectionsError::PointOutOfRange {
            latitude: point.latitude,
            longitude: point.longitude,
        });
    }
    let steps = result
        .steps
        .iter()
        .map(|step| DirectionStep {
            instruction: strip_markup(&step.instruction_markup),
            distance_meters: step.distance_meters,
            duration_seconds: step.duration_seconds,
        })
        .collect();
    Ok(ResolvedRoute {
        path,
        steps,
        estimate: RouteEstimate::from_provider(result.distance_meters, result.duration_seconds),
    })
}

/// Path shown while no provider route is available.
pub fn fallback_path(origin: Coordinate, destination: Coordinate) -> Vec<Coordinate> {
    vec![origin, destination]
}

// ---------------------------------------------------------------------------
// Static gateway
// ---------------------------------------------------------------------------

/// Returns the same answer for every request.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectionsGateway {
    route: Option<RouteResult>,
}

impl StaticDirectionsGateway {
    pub fn new(route: RouteResult) -> Self {
        Self { route: Some(route) }
    }

    /// Always answers with no route.
    pub fn absent() -> Self {
        Self { route: None }
    }
}

impl DirectionsGateway for StaticDirectionsGateway {
    fn fetch_route(&self, _origin: Coordinate, _destination: Coordinate) -> Option<RouteResult> {
        self.route.clone()
    }
}

/// Offline stand-in for a real provider: a gently bent path between the two
/// points with road distance 30% above the great-circle distance at 30 km/h.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntheticDirectionsGateway;

const SYNTHETIC_DETOUR: f64 = 1.3;
const SYNTHETIC_SPEED_KMH: f64 = 30.0;
const SYNTHETIC_SEGMENTS: usize = 4;

impl DirectionsGateway for SyntheticDirectionsGateway {
    fn fetch_route(&self, origin: Coordinate, destination: Coordinate) -> Option<RouteResult> {
        let road_km = distance_km(origin, destination) * SYNTHETIC_DETOUR;
        let total_seconds = road_km / SYNTHETIC_SPEED_KMH * 3600.0;

        // Intermediate points bend 10% toward the latitude-first corner.
        let corner = Coordinate {
            latitude: destination.latitude,
            longitude: origin.longitude,
        };
        let mut points = vec![origin];
        for i in 1..SYNTHETIC_SEGMENTS {
            let fraction = i as f64 / SYNTHETIC_SEGMENTS as f64;
            let along = move_toward(origin, destination, fraction);
            points.push(move_toward(along, corner, 0.1));
        }
        points.push(destination);

        let share = 1.0 / SYNTHETIC_SEGMENTS as f64;
        let steps = (0..SYNTHETIC_SEGMENTS)
            .map(|i| RawStep {
                instruction_markup: if i + 1 == SYNTHETIC_SEGMENTS {
                    "Arrive at <b>destination</b>".to_string()
                } else {
                    format!("Continue on <b>Segment {}</b>", i + 1)
                },
                distance_meters: (road_km * 1000.0 * share).round(),
                duration_seconds: (total_seconds * share).round(),
            })
            .collect();

        Some(RouteResult {
            encoded_polyline: encode(&points),
            distance_meters: (road_km * 1000.0).round(),
            duration_seconds: total_seconds.round(),
            steps,
        })
    }
}

// ---------------------------------------------------------------------------
// Caching wrapper
// ---------------------------------------------------------------------------

/// Default number of origin/destination pairs kept by [`CachedDirectionsGateway`].
pub const DEFAULT_ROUTE_CACHE_CAPACITY: usize = 64;

/// Coordinates are bucketed at 1e-5 degrees (about a metre) for cache keys.
const KEY_PRECISION: f64 = 1e5;

type RouteKey = (i64, i64, i64, i64);

fn route_key(origin: Coordinate, destination: Coordinate) -> RouteKey {
    let quantize = |value: f64| (value * KEY_PRECISION).round() as i64;
    (
        quantize(origin.latitude),
        quantize(origin.longitude),
        quantize(destination.latitude),
        quantize(destination.longitude),
    )
}

/// LRU-cached wrapper around any [`DirectionsGateway`].
///
/// Only successful answers are cached, so a transient failure is retried on the
/// next request.
pub struct CachedDirectionsGateway {
    inner: Box<dyn DirectionsGateway>,
    cache: Mutex<LruCache<RouteKey, RouteResult>>,
}

impl CachedDirectionsGateway {
    pub fn new(inner: Box<dyn DirectionsGateway>, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn with_default_capacity(inner: Box<dyn DirectionsGateway>) -> Self {
        Self::new(inner, DEFAULT_ROUTE_CACHE_CAPACITY)
    }

    pub fn cached_routes(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }
}

impl DirectionsGateway for CachedDirectionsGateway {
    fn fetch_route(&self, origin: Coordinate, destination: Coordinate) -> Option<RouteResult> {
        let key = route_key(origin, destination);

        // Fast path: cache hit
        if let Ok(mut cache) = self.cache.lock() {
            if let Some(cached) = cache.get(&key) {
                return Some(cached.clone());
            }
        }

        let result = self.inner.fetch_route(origin, destination);

        if let Some(ref route) = result {
            if let Ok(mut cache) = self.cache.lock() {
                cache.put(key, route.clone());
            }
        }

        result
    }
}
