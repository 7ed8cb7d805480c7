//! Driver assignment once the matching delay has elapsed.

use bevy_ecs::prelude::{Query, Res, ResMut};
use tracing::{debug, info};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::config::{MovementConfig, RideConfig};
use crate::ecs::{NearbyCar, Position, RideSession, RideState};
use crate::geo::Coordinate;
use crate::lifecycle::transition;
use crate::pricing::RideCatalog;
use crate::telemetry::RideTelemetry;

/// ETA used when the selected option is missing from the catalog.
const UNKNOWN_OPTION_ETA_MINUTES: u32 = 4;

/// Decoy 0's position, or a fixed offset from the rider when there is no fleet.
pub fn driver_start(
    rider: Coordinate,
    first_car: Option<Coordinate>,
    movement: &MovementConfig,
) -> Coordinate {
    first_car.unwrap_or_else(|| {
        rider.offset(
            movement.fallback_driver_offset_lat,
            movement.fallback_driver_offset_lng,
        )
    })
}

pub fn initial_eta_minutes(option_eta: Option<u32>, movement: &MovementConfig) -> u32 {
    option_eta
        .unwrap_or(UNKNOWN_OPTION_ETA_MINUTES)
        .max(movement.min_driver_eta_minutes)
}

pub fn matching_system(
    event: Res<CurrentEvent>,
    mut session: ResMut<RideSession>,
    mut clock: ResMut<SimulationClock>,
    mut telemetry: ResMut<RideTelemetry>,
    config: Res<RideConfig>,
    catalog: Res<RideCatalog>,
    cars: Query<(&NearbyCar, &Position)>,
) {
    if event.0.kind != EventKind::MatchingComplete {
        return;
    }
    if session.state != RideState::FindingDriver {
        return;
    }

    let Some(rider) = session.rider_position else {
        debug!("rider position unknown at matching time, retrying");
        clock.schedule_in(config.timers.matching_delay_ms, EventKind::MatchingComplete);
        return;
    };

    let first_car = cars
        .iter()
        .find(|(car, _)| car.index == 0)
        .map(|(_, position)| position.0);
    let start = driver_start(rider, first_car, &config.movement);
    let option_eta = catalog
        .get(&session.selected_option)
        .map(|option| option.base_eta_minutes);
    let eta = initial_eta_minutes(option_eta, &config.movement);

    session.driver_position = Some(start);
    session.eta_minutes = Some(eta);
    info!(
        eta_minutes = eta,
        from_fleet = first_car.is_some(),
        "driver assigned"
    );
    transition(
        &mut session,
        RideState::DriverEnRoute,
        &mut clock,
        &config.timers,
        &mut telemetry,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_prefers_first_decoy() {
        let movement = MovementConfig::default();
        let rider = Coordinate::new(37.0, -122.0).expect("valid");
        let car = rider.offset(0.001, 0.001);
        assert_eq!(driver_start(rider, Some(car), &movement), car);

        let fallback = driver_start(rider, None, &movement);
        assert!((fallback.latitude - 37.002).abs() < 1e-12);
        assert!((fallback.longitude - -122.0015).abs() < 1e-12);
    }

    #[test]
    fn eta_has_a_floor() {
        let movement = MovementConfig::default();
        assert_eq!(initial_eta_minutes(Some(3), &movement), 3);
        assert_eq!(initial_eta_minutes(Some(1), &movement), 2);
        assert_eq!(initial_eta_minutes(None, &movement), 4);
    }
}
