//! Session runner: advances the clock and routes timer events into the ECS.
//!
//! Clock progression and event routing happen here, outside systems. Each step
//! pops the next event from [SimulationClock], inserts it as [CurrentEvent],
//! then runs the schedule.

use bevy_ecs::prelude::{Res, Schedule, World};
use bevy_ecs::schedule::IntoSystemConfigs;

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::systems::{
    eta_countdown::eta_countdown_system, fleet_jitter::fleet_jitter_system,
    matching::matching_system, movement::movement_system,
};

// Condition functions for each event kind
fn is_matching_complete(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::MatchingComplete)
        .unwrap_or(false)
}

fn is_eta_tick(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::EtaTick)
        .unwrap_or(false)
}

fn is_move_step(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::MoveStep)
        .unwrap_or(false)
}

fn is_fleet_jitter(event: Option<Res<CurrentEvent>>) -> bool {
    event
        .map(|e| e.0.kind == EventKind::FleetJitter)
        .unwrap_or(false)
}

/// Runs one step: pops the next event, inserts it as [CurrentEvent], then runs the schedule.
/// Returns `false` if the clock was empty.
pub fn run_next_event(world: &mut World, schedule: &mut Schedule) -> bool {
    let event = match world.resource_mut::<SimulationClock>().pop_next() {
        Some(e) => e,
        None => return false,
    };
    world.insert_resource(CurrentEvent(event));
    schedule.run(world);
    true
}

/// Runs every event due at or before `until_ms`, then moves the clock to `until_ms`.
/// Returns the number of steps executed.
pub fn run_until(world: &mut World, schedule: &mut Schedule, until_ms: u64) -> usize {
    let mut steps = 0;
    loop {
        let due = world
            .resource::<SimulationClock>()
            .next_event_time()
            .is_some_and(|ts| ts <= until_ms);
        if !due || !run_next_event(world, schedule) {
            break;
        }
        steps += 1;
    }
    world.resource_mut::<SimulationClock>().advance_to(until_ms);
    steps
}

/// Runs steps until the event queue is empty or `max_steps` is reached.
/// Returns the number of steps executed.
///
/// The decoy fleet re-arms its timer forever, so a session with decoys only
/// stops at `max_steps`.
pub fn run_until_empty(world: &mut World, schedule: &mut Schedule, max_steps: usize) -> usize {
    let mut steps = 0;
    while steps < max_steps && run_next_event(world, schedule) {
        steps += 1;
    }
    steps
}

/// Builds the ride schedule: every timer-reacting system, gated on the event kind.
pub fn ride_schedule() -> Schedule {
    let mut schedule = Schedule::default();
    schedule.add_systems((
        // MatchingComplete
        matching_system.run_if(is_matching_complete),
        // EtaTick
        eta_countdown_system.run_if(is_eta_tick),
        // MoveStep
        movement_system.run_if(is_move_step),
        // FleetJitter
        fleet_jitter_system.run_if(is_fleet_jitter),
    ));
    schedule
}
