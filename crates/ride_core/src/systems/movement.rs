//! Movement system: advances the assigned vehicle toward its current target.
//!
//! While the driver is en route the target is the rider; during the trip it is
//! the destination. Each step covers a fixed share of the remaining distance, so
//! the vehicle slows as it closes in and snaps onto the target once inside the
//! proximity threshold.

use bevy_ecs::prelude::{Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::config::{MovementConfig, RideConfig};
use crate::ecs::{RideSession, RideState};
use crate::geo::{distance_km, move_toward, Coordinate};
use crate::lifecycle::transition;
use crate::pricing::RideCatalog;
use crate::store::StoreResource;
use crate::systems::trip_completed::persist_trip_receipt;
use crate::telemetry::RideTelemetry;

/// Result of one movement step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StepOutcome {
    Moving(Coordinate),
    Reached(Coordinate),
}

/// Move `fraction` of the way to `target`; snap onto it when within `threshold_km`.
pub fn step_toward(
    from: Coordinate,
    target: Coordinate,
    fraction: f64,
    threshold_km: f64,
) -> StepOutcome {
    let next = move_toward(from, target, fraction);
    if distance_km(next, target) < threshold_km {
        StepOutcome::Reached(target)
    } else {
        StepOutcome::Moving(next)
    }
}

fn leg_parameters(
    session: &RideSession,
    movement: &MovementConfig,
) -> Option<(Coordinate, f64)> {
    match session.state {
        RideState::DriverEnRoute => session
            .rider_position
            .map(|rider| (rider, movement.pickup_step_fraction)),
        RideState::InRide => Some((
            session.destination.coordinate,
            movement.dropoff_step_fraction,
        )),
        _ => None,
    }
}

pub fn movement_system(
    event: Res<CurrentEvent>,
    mut session: ResMut<RideSession>,
    mut clock: ResMut<SimulationClock>,
    mut telemetry: ResMut<RideTelemetry>,
    config: Res<RideConfig>,
    catalog: Res<RideCatalog>,
    store: Option<Res<StoreResource>>,
) {
    if event.0.kind != EventKind::MoveStep {
        return;
    }
    if !matches!(session.state, RideState::DriverEnRoute | RideState::InRide) {
        return;
    }

    let (Some((target, fraction)), Some(vehicle)) = (
        leg_parameters(&session, &config.movement),
        session.driver_position,
    ) else {
        debug!(state = %session.state, "movement tick without positions, waiting");
        clock.schedule_in(config.timers.move_step_ms, EventKind::MoveStep);
        return;
    };

    match step_toward(
        vehicle,
        target,
        fraction,
        config.movement.proximity_threshold_km,
    ) {
        StepOutcome::Moving(next) => {
            session.driver_position = Some(next);
            debug!(
                remaining_km = distance_km(next, target),
                state = %session.state,
                "vehicle moved"
            );
            clock.schedule_in(config.timers.move_step_ms, EventKind::MoveStep);
        }
        StepOutcome::Reached(target) => {
            session.driver_position = Some(target);
            let next_state = if session.state == RideState::DriverEnRoute {
                session.eta_minutes = Some(0);
                RideState::AtPickup
            } else {
                if let Some(store) = store.as_ref() {
                    persist_trip_receipt(&session, &catalog, store.0.as_ref());
                }
                RideState::Arrived
            };
            transition(
                &mut session,
                next_state,
                &mut clock,
                &config.timers,
                &mut telemetry,
            );
        }
    }
}
