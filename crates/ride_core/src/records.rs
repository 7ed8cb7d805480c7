//! Typed ride records kept in the key-value store.
//!
//! All writes here are fire-and-forget: failures are logged at `warn` and
//! swallowed, so a broken store never blocks a ride.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::directions::DirectionStep;
use crate::geo::Coordinate;
use crate::store::{load_json, save_json, KeyValueStore};

pub const LAST_RIDE_KEY: &str = "lastRide";
pub const RIDE_HISTORY_KEY: &str = "rideHistory";
pub const RECENT_DESTINATIONS_KEY: &str = "recentDestinations";
pub const ROUTE_STEPS_KEY: &str = "routeSteps";

pub const RIDE_HISTORY_CAP: usize = 20;
pub const RECENT_DESTINATIONS_CAP: usize = 6;

/// Summary of a finished trip, written when the vehicle reaches the destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideReceipt {
    pub dest_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest_subtitle: Option<String>,
    /// Formatted fare, e.g. `"19.00"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    pub when: DateTime<Utc>,
}

/// Write `lastRide`, then prepend to `rideHistory`.
///
/// History is only touched after the receipt landed. A history value that fails
/// to parse is left alone rather than overwritten.
pub fn record_trip_receipt(store: &dyn KeyValueStore, receipt: &RideReceipt) {
    if let Err(error) = save_json(store, LAST_RIDE_KEY, receipt) {
        warn!(%error, "failed to persist last ride");
        return;
    }

    let existing: Vec<RideReceipt> = match load_json(store, RIDE_HISTORY_KEY) {
        Ok(history) => history.unwrap_or_default(),
        Err(error) => {
            warn!(%error, "ride history is unreadable, skipping history update");
            return;
        }
    };

    let mut history = Vec::with_capacity(RIDE_HISTORY_CAP);
    history.push(receipt.clone());
    history.extend(existing.into_iter().take(RIDE_HISTORY_CAP - 1));
    if let Err(error) = save_json(store, RIDE_HISTORY_KEY, &history) {
        warn!(%error, "failed to persist ride history");
        return;
    }
    debug!(entries = history.len(), "ride history updated");
}

pub fn last_ride(store: &dyn KeyValueStore) -> Option<RideReceipt> {
    load_json(store, LAST_RIDE_KEY).unwrap_or_else(|error| {
        warn!(%error, "failed to read last ride");
        None
    })
}

pub fn ride_history(store: &dyn KeyValueStore) -> Vec<RideReceipt> {
    load_json(store, RIDE_HISTORY_KEY)
        .unwrap_or_else(|error| {
            warn!(%error, "failed to read ride history");
            None
        })
        .unwrap_or_default()
}

/// A destination the rider picked recently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentDestination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub subtitle: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Epoch milliseconds.
    pub when: i64,
}

impl RecentDestination {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    fn same_place(&self, other: &RecentDestination) -> bool {
        let same_id = matches!((&self.id, &other.id), (Some(a), Some(b)) if a == b);
        same_id
            || (self.name == other.name
                && self.latitude == other.latitude
                && self.longitude == other.longitude)
    }
}

/// Put `entry` first, drop older entries for the same place, keep at most six.
pub fn insert_recent(
    existing: Vec<RecentDestination>,
    entry: RecentDestination,
) -> Vec<RecentDestination> {
    let mut next = Vec::with_capacity(RECENT_DESTINATIONS_CAP);
    let rest: Vec<_> = existing
        .into_iter()
        .filter(|recent| !recent.same_place(&entry))
        .collect();
    next.push(entry);
    next.extend(rest);
    next.truncate(RECENT_DESTINATIONS_CAP);
    next
}

pub fn recent_destinations(store: &dyn KeyValueStore) -> Vec<RecentDestination> {
    load_json(store, RECENT_DESTINATIONS_KEY)
        .unwrap_or_else(|error| {
            warn!(%error, "failed to read recent destinations");
            None
        })
        .unwrap_or_default()
}

pub fn record_recent_destination(store: &dyn KeyValueStore, entry: RecentDestination) {
    let existing: Vec<RecentDestination> = match load_json(store, RECENT_DESTINATIONS_KEY) {
        Ok(recents) => recents.unwrap_or_default(),
        Err(error) => {
            warn!(%error, "recent destinations are unreadable, skipping update");
            return;
        }
    };
    let next = insert_recent(existing, entry);
    if let Err(error) = save_json(store, RECENT_DESTINATIONS_KEY, &next) {
        warn!(%error, "failed to persist recent destinations");
    }
}

pub fn save_route_steps(store: &dyn KeyValueStore, steps: &[DirectionStep]) {
    if let Err(error) = save_json(store, ROUTE_STEPS_KEY, steps) {
        warn!(%error, "failed to persist route steps");
    }
}

pub fn load_route_steps(store: &dyn KeyValueStore) -> Vec<DirectionStep> {
    load_json(store, ROUTE_STEPS_KEY)
        .unwrap_or_else(|error| {
            warn!(%error, "failed to read route steps");
            None
        })
        .unwrap_or_default()
}

/// What the home screen shows: the last ride and the recent destinations.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HomeSummary {
    pub last_ride: Option<RideReceipt>,
    pub recent_destinations: Vec<RecentDestination>,
}

impl HomeSummary {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        Self {
            last_ride: last_ride(store),
            recent_destinations: recent_destinations(store),
        }
    }
}
