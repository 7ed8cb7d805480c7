//! Decoy fleet: a handful of vehicles seeded around the rider and nudged on a
//! timer so the map looks alive before a driver is assigned.
//!
//! Decoys are ECS entities ([`NearbyCar`] + [`Position`]). They are never matched;
//! the assigned driver only borrows decoy 0's position as its start point.

use std::f64::consts::PI;

use bevy_ecs::prelude::{Entity, Resource, With, World};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::clock::{EventKind, SimulationClock};
use crate::config::{FleetConfig, RideConfig};
use crate::ecs::{NearbyCar, Position};
use crate::geo::Coordinate;

/// Seedable RNG driving decoy placement and jitter.
#[derive(Debug, Resource)]
pub struct FleetRng(StdRng);

impl FleetRng {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self(rng)
    }
}

/// Decoy positions at equal angular spacing around `rider`, each at a random
/// radius of `base_radius_deg * U[radius_factor_min, radius_factor_max]`.
pub fn seed_positions(
    rider: Coordinate,
    config: &FleetConfig,
    rng: &mut FleetRng,
) -> Vec<(String, Coordinate)> {
    (0..config.size)
        .map(|i| {
            let angle = 2.0 * PI * i as f64 / config.size as f64;
            let radius = config.base_radius_deg
                * rng
                    .0
                    .gen_range(config.radius_factor_min..=config.radius_factor_max);
            let position = rider.offset(radius * angle.cos(), radius * angle.sin());
            (format!("car-{i}"), position)
        })
        .collect()
}

/// Independent uniform nudge in `[-jitter_deg, jitter_deg]` on each axis.
pub fn jitter(position: Coordinate, config: &FleetConfig, rng: &mut FleetRng) -> Coordinate {
    let delta = config.jitter_deg;
    position.offset(
        rng.0.gen_range(-delta..=delta),
        rng.0.gen_range(-delta..=delta),
    )
}

/// Replace the fleet with a fresh one around `rider` and restart the jitter timer.
pub fn reseed(world: &mut World, rider: Coordinate) {
    clear(world);

    let config = world.resource::<RideConfig>().clone();
    let seeded = {
        let mut rng = world.resource_mut::<FleetRng>();
        seed_positions(rider, &config.fleet, &mut rng)
    };
    let count = seeded.len();
    for (index, (id, position)) in seeded.into_iter().enumerate() {
        world.spawn((NearbyCar { index, id }, Position(position)));
    }

    if count > 0 {
        world
            .resource_mut::<SimulationClock>()
            .schedule_in(config.timers.fleet_jitter_ms, EventKind::FleetJitter);
    }
    debug!(count, "decoy fleet seeded");
}

/// Remove every decoy and stop the jitter timer.
pub fn clear(world: &mut World) {
    let cars: Vec<Entity> = world
        .query_filtered::<Entity, With<NearbyCar>>()
        .iter(world)
        .collect();
    for car in cars {
        world.despawn(car);
    }
    world
        .resource_mut::<SimulationClock>()
        .cancel(EventKind::FleetJitter);
}

/// Current decoys ordered by seeding index.
pub fn nearby_cars(world: &mut World) -> Vec<(String, Coordinate)> {
    let mut cars: Vec<(usize, String, Coordinate)> = world
        .query::<(&NearbyCar, &Position)>()
        .iter(world)
        .map(|(car, position)| (car.index, car.id.clone(), position.0))
        .collect();
    cars.sort_by_key(|(index, _, _)| *index);
    cars.into_iter().map(|(_, id, position)| (id, position)).collect()
}
