use bevy_ecs::prelude::{Res, ResMut};
use tracing::debug;

use crate::clock::{CurrentEvent, EventKind, SimulationClock};
use crate::config::RideConfig;
use crate::ecs::{RideSession, RideState};

/// Count the pickup ETA down by a minute. The countdown stops once it shows 1;
/// reaching the rider sets it to 0.
pub fn eta_countdown_system(
    event: Res<CurrentEvent>,
    mut session: ResMut<RideSession>,
    mut clock: ResMut<SimulationClock>,
    config: Res<RideConfig>,
) {
    if event.0.kind != EventKind::EtaTick {
        return;
    }
    if session.state != RideState::DriverEnRoute {
        return;
    }

    let current = session.eta_minutes.unwrap_or(1);
    let next = current.saturating_sub(1).max(1);
    session.eta_minutes = Some(next);
    debug!(eta_minutes = next, "pickup eta updated");

    if next > 1 {
        clock.schedule_in(config.timers.eta_tick_ms, EventKind::EtaTick);
    }
}
