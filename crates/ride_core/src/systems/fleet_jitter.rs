use bevy_ecs::prelude::{Query, Res, ResMut, With};

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::config::RideConfig;
use crate::ecs::{NearbyCar, Position};
use crate::fleet::{jitter, FleetRng};

/// Nudge every decoy and re-arm the jitter timer while any decoy exists.
pub fn fleet_jitter_system(
    event: Res<CurrentEvent>,
    mut clock: ResMut<SimulationClock>,
    mut rng: ResMut<FleetRng>,
    config: Res<RideConfig>,
    mut cars: Query<&mut Position, With<NearbyCar>>,
) {
    if event.0.kind != EventKind::FleetJitter {
        return;
    }

    let mut moved = 0usize;
    for mut position in cars.iter_mut() {
        position.0 = jitter(position.0, &config.fleet, &mut rng);
        moved += 1;
    }

    if moved > 0 {
        clock.schedule_in(config.timers.fleet_jitter_ms, EventKind::FleetJitter);
    }
}
