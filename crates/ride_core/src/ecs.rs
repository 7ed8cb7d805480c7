use std::fmt;

use bevy_ecs::prelude::{Component, Resource};
use serde::{Deserialize, Serialize};

use crate::clock::EventKind;
use crate::directions::DirectionStep;
use crate::geo::{Coordinate, RouteEstimate};
use crate::pricing::Fare;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RideState {
    #[default]
    Idle,
    FindingDriver,
    DriverEnRoute,
    AtPickup,
    InRide,
    Arrived,
}

impl RideState {
    pub fn as_str(self) -> &'static str {
        match self {
            RideState::Idle => "idle",
            RideState::FindingDriver => "finding_driver",
            RideState::DriverEnRoute => "driver_en_route",
            RideState::AtPickup => "at_pickup",
            RideState::InRide => "in_ride",
            RideState::Arrived => "arrived",
        }
    }

    /// The single forward edge out of each state.
    pub fn can_transition_to(self, next: RideState) -> bool {
        matches!(
            (self, next),
            (RideState::Idle, RideState::FindingDriver)
                | (RideState::FindingDriver, RideState::DriverEnRoute)
                | (RideState::DriverEnRoute, RideState::AtPickup)
                | (RideState::AtPickup, RideState::InRide)
                | (RideState::InRide, RideState::Arrived)
                | (RideState::Arrived, RideState::Idle)
        )
    }

    /// Timers that only run while the session is in this state.
    pub fn owned_timers(self) -> &'static [EventKind] {
        match self {
            RideState::FindingDriver => &[EventKind::MatchingComplete],
            RideState::DriverEnRoute => &[EventKind::EtaTick, EventKind::MoveStep],
            RideState::InRide => &[EventKind::MoveStep],
            RideState::Idle | RideState::AtPickup | RideState::Arrived => &[],
        }
    }

    /// Whether a vehicle is assigned to the rider.
    pub fn has_driver(self) -> bool {
        matches!(
            self,
            RideState::DriverEnRoute | RideState::AtPickup | RideState::InRide | RideState::Arrived
        )
    }
}

impl fmt::Display for RideState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoy vehicle shown around the rider before a driver is assigned.
#[derive(Debug, Clone, PartialEq, Eq, Component)]
pub struct NearbyCar {
    /// Seeding order; decoy 0 is the assigned driver's start candidate.
    pub index: usize,
    pub id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Component)]
pub struct Position(pub Coordinate);

/// Where the rider is going.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    pub id: Option<String>,
    pub name: String,
    pub subtitle: String,
    pub coordinate: Coordinate,
}

/// Both trip estimates. The provider estimate replaces the straight-line one
/// wholesale once it arrives.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RouteEstimates {
    pub straight_line: Option<RouteEstimate>,
    pub provider: Option<RouteEstimate>,
}

impl RouteEstimates {
    pub fn freshest(&self) -> Option<RouteEstimate> {
        self.provider.or(self.straight_line)
    }
}

/// Displayed route: decoded path and markup-free steps.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RouteView {
    pub path: Vec<Coordinate>,
    pub steps: Vec<DirectionStep>,
}

/// The single active ride session.
#[derive(Debug, Clone, PartialEq, Resource)]
pub struct RideSession {
    pub destination: Destination,
    pub rider_position: Option<Coordinate>,
    pub selected_option: String,
    pub state: RideState,
    pub driver_position: Option<Coordinate>,
    pub eta_minutes: Option<u32>,
    pub rating: Option<u8>,
    pub estimates: RouteEstimates,
    pub route: RouteView,
    /// Fare fixed when the ride was confirmed.
    pub locked_fare: Option<Fare>,
    pub permission_denied: bool,
    pub confirmation_open: bool,
}

impl RideSession {
    pub fn new(destination: Destination, selected_option: String) -> Self {
        Self {
            destination,
            rider_position: None,
            selected_option,
            state: RideState::Idle,
            driver_position: None,
            eta_minutes: None,
            rating: None,
            estimates: RouteEstimates::default(),
            route: RouteView::default(),
            locked_fare: None,
            permission_denied: false,
            confirmation_open: false,
        }
    }
}

/// Generation counter guarding async continuations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Resource)]
pub struct SessionLiveness {
    pub generation: u64,
    pub closed: bool,
}

impl SessionLiveness {
    pub fn token(&self) -> AsyncToken {
        AsyncToken(self.generation)
    }

    pub fn bump(&mut self) -> AsyncToken {
        self.generation += 1;
        self.token()
    }

    /// A continuation may apply only if the session is open and nothing bumped the
    /// generation since `token` was issued.
    pub fn accepts(&self, token: AsyncToken) -> bool {
        !self.closed && token.0 == self.generation
    }
}

/// Handed out when an async operation starts; checked when it completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AsyncToken(pub u64);
