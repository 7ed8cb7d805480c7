//! Telemetry: timestamped log of ride state transitions.

use bevy_ecs::prelude::Resource;

use crate::ecs::RideState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateTransition {
    /// Simulation time (ms) of the transition.
    pub at_ms: u64,
    pub from: RideState,
    pub to: RideState,
}

/// Collects every lifecycle transition of the session.
#[derive(Debug, Default, Resource)]
pub struct RideTelemetry {
    pub transitions: Vec<StateTransition>,
}

impl RideTelemetry {
    pub fn record(&mut self, at_ms: u64, from: RideState, to: RideState) {
        self.transitions.push(StateTransition { at_ms, from, to });
    }

    /// When the session last entered `state`.
    pub fn entered_at(&self, state: RideState) -> Option<u64> {
        self.transitions
            .iter()
            .rev()
            .find(|transition| transition.to == state)
            .map(|transition| transition.at_ms)
    }

    /// Visited states in order, starting with the first `from`.
    pub fn path(&self) -> Vec<RideState> {
        let mut path: Vec<RideState> = self.transitions.first().map(|t| t.from).into_iter().collect();
        path.extend(self.transitions.iter().map(|t| t.to));
        path
    }

    /// Time from confirmation to driver assignment.
    pub fn time_to_match(&self) -> Option<u64> {
        let confirmed = self.entered_at(RideState::FindingDriver)?;
        let matched = self.entered_at(RideState::DriverEnRoute)?;
        Some(matched.saturating_sub(confirmed))
    }

    /// Time from driver assignment to pickup.
    pub fn time_to_pickup(&self) -> Option<u64> {
        let matched = self.entered_at(RideState::DriverEnRoute)?;
        let pickup = self.entered_at(RideState::AtPickup)?;
        Some(pickup.saturating_sub(matched))
    }

    /// Time from trip start to arrival.
    pub fn trip_duration(&self) -> Option<u64> {
        let started = self.entered_at(RideState::InRide)?;
        let arrived = self.entered_at(RideState::Arrived)?;
        Some(arrived.saturating_sub(started))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_durations_follow_transitions() {
        let mut telemetry = RideTelemetry::default();
        telemetry.record(0, RideState::Idle, RideState::FindingDriver);
        telemetry.record(2_000, RideState::FindingDriver, RideState::DriverEnRoute);
        telemetry.record(20_000, RideState::DriverEnRoute, RideState::AtPickup);
        telemetry.record(21_000, RideState::AtPickup, RideState::InRide);
        telemetry.record(90_000, RideState::InRide, RideState::Arrived);

        assert_eq!(telemetry.time_to_match(), Some(2_000));
        assert_eq!(telemetry.time_to_pickup(), Some(18_000));
        assert_eq!(telemetry.trip_duration(), Some(69_000));
        assert_eq!(telemetry.path().len(), 6);
        assert_eq!(telemetry.path()[0], RideState::Idle);
    }

    #[test]
    fn empty_log_has_no_durations() {
        let telemetry = RideTelemetry::default();
        assert_eq!(telemetry.time_to_match(), None);
        assert!(telemetry.path().is_empty());
    }
}
