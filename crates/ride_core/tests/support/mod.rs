#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use ride_core::directions::{RawStep, RouteResult};
use ride_core::ecs::RideState;
use ride_core::error::PlacesError;
use ride_core::geo::Coordinate;
use ride_core::places::{PlaceSuggestion, PlacesLookup};
use ride_core::polyline::encode;
use ride_core::session::RideStateMachine;
use ride_core::test_helpers::{test_destination, test_rider};

/// Upper bound on simulated time for any single phase of a ride.
pub const PHASE_LIMIT_MS: u64 = 10 * 60 * 1000;

/// Advance in movement-sized slices until `state` is reached or the limit passes.
pub fn advance_until_state(machine: &mut RideStateMachine, state: RideState) -> bool {
    let start = machine.now();
    while machine.state() != state {
        if machine.is_closed() || machine.now() - start > PHASE_LIMIT_MS {
            return false;
        }
        machine.advance_by(500);
    }
    true
}

/// Drive a located machine through confirmation, pickup, trip and arrival.
pub fn complete_ride(machine: &mut RideStateMachine) {
    machine.confirm_ride().expect("confirm");
    assert!(advance_until_state(machine, RideState::AtPickup));
    machine.start_trip().expect("start trip");
    assert!(advance_until_state(machine, RideState::Arrived));
}

/// A provider answer between the test rider and the test destination.
pub fn provider_route(distance_meters: f64, duration_seconds: f64) -> RouteResult {
    let rider = test_rider();
    let destination = test_destination().coordinate;
    let midpoint = Coordinate {
        latitude: destination.latitude,
        longitude: rider.longitude,
    };
    RouteResult {
        encoded_polyline: encode(&[rider, midpoint, destination]),
        distance_meters,
        duration_seconds,
        steps: vec![
            RawStep {
                instruction_markup: "Head <b>north</b> on <b>Van Ness Ave</b>".to_string(),
                distance_meters: 1_200.0,
                duration_seconds: 240.0,
            },
            RawStep {
                instruction_markup: "Turn <b>right</b> onto Market&nbsp;St".to_string(),
                distance_meters: distance_meters - 1_200.0,
                duration_seconds: duration_seconds - 240.0,
            },
        ],
    }
}

/// Scripted places lookup: fixed suggestions, a coordinate per id, and a switch to fail.
pub struct ScriptedPlaces {
    pub suggestions: Vec<PlaceSuggestion>,
    pub coordinates: Vec<(String, Coordinate)>,
    pub fail: bool,
    pub autocomplete_calls: AtomicUsize,
    pub last_query: Mutex<Option<String>>,
}

impl ScriptedPlaces {
    pub fn new(suggestions: Vec<PlaceSuggestion>, coordinates: Vec<(String, Coordinate)>) -> Self {
        Self {
            suggestions,
            coordinates,
            fail: false,
            autocomplete_calls: AtomicUsize::new(0),
            last_query: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new(), Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.autocomplete_calls.load(Ordering::SeqCst)
    }
}

impl PlacesLookup for ScriptedPlaces {
    fn autocomplete(
        &self,
        query: &str,
        _near: Option<Coordinate>,
    ) -> Result<Vec<PlaceSuggestion>, PlacesError> {
        self.autocomplete_calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_query.lock() {
            *last = Some(query.to_string());
        }
        if self.fail {
            return Err(PlacesError::Api("OVER_QUERY_LIMIT".to_string()));
        }
        Ok(self.suggestions.clone())
    }

    fn resolve(&self, place_id: &str) -> Result<Option<Coordinate>, PlacesError> {
        if self.fail {
            return Err(PlacesError::HttpStatus(503));
        }
        Ok(self
            .coordinates
            .iter()
            .find(|(id, _)| id == place_id)
            .map(|(_, coordinate)| *coordinate))
    }
}
