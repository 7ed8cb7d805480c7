//! Test helpers for common test setup and utilities.
//!
//! This module provides shared fixtures so unit and integration tests build
//! sessions the same way.

use crate::config::RideConfig;
use crate::ecs::{Destination, RideSession};
use crate::geo::Coordinate;
use crate::pricing::RideCatalog;
use crate::session::RideStateMachine;
use crate::store::{MemoryStore, SharedStore};

/// Seed used by every test config so decoy placement is reproducible.
pub const TEST_SEED: u64 = 42;

/// Rider pickup point in downtown San Francisco.
pub fn test_rider() -> Coordinate {
    Coordinate {
        latitude: 37.7749,
        longitude: -122.4194,
    }
}

/// About 2 km north-east of [`test_rider`].
pub fn test_destination() -> Destination {
    Destination {
        id: Some("2".to_string()),
        name: "Downtown".to_string(),
        subtitle: "San Francisco".to_string(),
        coordinate: Coordinate {
            latitude: 37.7858,
            longitude: -122.401,
        },
    }
}

pub fn test_config() -> RideConfig {
    RideConfig::default().with_seed(TEST_SEED)
}

/// A fresh idle session with the catalog's first option selected.
pub fn test_session(destination: Destination) -> RideSession {
    let selected = RideCatalog::standard()
        .first()
        .map(|option| option.id.clone())
        .unwrap_or_default();
    RideSession::new(destination, selected)
}

/// A state machine over an in-memory store, rider position not yet known.
pub fn test_machine() -> RideStateMachine {
    test_machine_with_store(MemoryStore::shared())
}

pub fn test_machine_with_store(store: SharedStore) -> RideStateMachine {
    RideStateMachine::new(test_config(), test_destination(), store).expect("test config is valid")
}

/// A state machine whose rider position has already been resolved.
pub fn located_machine(store: SharedStore) -> RideStateMachine {
    let mut machine = test_machine_with_store(store);
    let token = machine
        .request_location()
        .expect("fresh session accepts location requests");
    machine.location_resolved(token, Ok(test_rider()));
    machine
}
