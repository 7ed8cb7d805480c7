//! Ride state transitions and the timers each state owns.
//!
//! Every state change goes through [`transition`]: the exited state's timers are
//! removed from the clock before the entered state's timers are scheduled, so a
//! stale tick from a previous state can never fire.

use bevy_ecs::prelude::{Res, ResMut, World};
use bevy_ecs::system::SystemState;
use tracing::info;

use crate::clock::{EventKind, SimulationClock};
use crate::config::{RideConfig, TimerConfig};
use crate::ecs::{RideSession, RideState};
use crate::telemetry::RideTelemetry;

pub fn transition(
    session: &mut RideSession,
    next: RideState,
    clock: &mut SimulationClock,
    timers: &TimerConfig,
    telemetry: &mut RideTelemetry,
) {
    let previous = session.state;
    debug_assert!(
        previous.can_transition_to(next),
        "invalid ride transition {previous} -> {next}"
    );

    for kind in previous.owned_timers() {
        clock.cancel(*kind);
    }
    session.state = next;
    telemetry.record(clock.now(), previous, next);
    info!(from = %previous, to = %next, at_ms = clock.now(), "ride state changed");

    schedule_entry_timers(next, clock, timers);
}

type TransitionParams<'w> = (
    ResMut<'w, RideSession>,
    ResMut<'w, SimulationClock>,
    Res<'w, RideConfig>,
    ResMut<'w, RideTelemetry>,
);

/// [`transition`] for callers holding the whole world rather than system params.
pub fn transition_world(world: &mut World, next: RideState) {
    let mut params: SystemState<TransitionParams> = SystemState::new(world);
    let (mut session, mut clock, config, mut telemetry) = params.get_mut(world);
    transition(
        &mut session,
        next,
        &mut clock,
        &config.timers,
        &mut telemetry,
    );
}

fn schedule_entry_timers(state: RideState, clock: &mut SimulationClock, timers: &TimerConfig) {
    match state {
        RideState::FindingDriver => {
            clock.schedule_in(timers.matching_delay_ms, EventKind::MatchingComplete);
        }
        RideState::DriverEnRoute => {
            clock.schedule_in(timers.eta_tick_ms, EventKind::EtaTick);
            clock.schedule_in(timers.move_step_ms, EventKind::MoveStep);
        }
        RideState::InRide => {
            clock.schedule_in(timers.move_step_ms, EventKind::MoveStep);
        }
        RideState::Idle | RideState::AtPickup | RideState::Arrived => {}
    }
}
