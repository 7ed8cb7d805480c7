pub mod eta_countdown;
pub mod fleet_jitter;
pub mod matching;
pub mod movement;
pub mod trip_completed;

#[cfg(test)]
mod end_to_end_tests {
    use bevy_ecs::prelude::World;

    use crate::clock::{EventKind, SimulationClock, ONE_SEC_MS};
    use crate::config::RideConfig;
    use crate::ecs::{RideSession, RideState};
    use crate::fleet;
    use crate::lifecycle::transition_world;
    use crate::records::last_ride;
    use crate::runner::{ride_schedule, run_until, run_until_empty};
    use crate::session::build_ride_world;
    use crate::store::{MemoryStore, SharedStore};
    use crate::test_helpers::{test_destination, test_rider};

    fn confirmed_world(store: SharedStore) -> World {
        let config = RideConfig::default().with_seed(5);
        let mut world = build_ride_world(config, test_destination(), store).expect("valid config");
        world.resource_mut::<RideSession>().rider_position = Some(test_rider());
        fleet::reseed(&mut world, test_rider());

        transition_world(&mut world, RideState::FindingDriver);
        world
    }

    #[test]
    fn matching_assigns_driver_from_first_decoy() {
        let mut world = confirmed_world(MemoryStore::shared());
        let mut schedule = ride_schedule();

        run_until(&mut world, &mut schedule, 2 * ONE_SEC_MS);

        // Jitter fired just before matching at the same instant; nothing moves the
        // decoys again until 4 s.
        let first_car = fleet::nearby_cars(&mut world)[0].1;
        let session = world.resource::<RideSession>();
        assert_eq!(session.state, RideState::DriverEnRoute);
        assert_eq!(session.driver_position, Some(first_car));
        assert_eq!(session.eta_minutes, Some(3));
        let clock = world.resource::<SimulationClock>();
        assert_eq!(clock.pending(EventKind::MatchingComplete), 0);
        assert_eq!(clock.pending(EventKind::EtaTick), 1);
        assert_eq!(clock.pending(EventKind::MoveStep), 1);
    }

    #[test]
    fn driver_reaches_pickup_with_zero_eta() {
        let mut world = confirmed_world(MemoryStore::shared());
        let mut schedule = ride_schedule();

        let steps = run_until_empty(&mut world, &mut schedule, 500);
        assert_eq!(steps, 500, "decoy jitter keeps the clock busy");

        let session = world.resource::<RideSession>();
        assert_eq!(session.state, RideState::AtPickup);
        assert_eq!(session.eta_minutes, Some(0));
        assert_eq!(session.driver_position, Some(test_rider()));
        let clock = world.resource::<SimulationClock>();
        assert_eq!(clock.pending(EventKind::EtaTick), 0);
        assert_eq!(clock.pending(EventKind::MoveStep), 0);
    }

    #[test]
    fn arrival_persists_receipt_before_state_change() {
        let store = MemoryStore::shared();
        let mut world = confirmed_world(store.clone());
        let mut schedule = ride_schedule();
        run_until_empty(&mut world, &mut schedule, 500);
        assert_eq!(world.resource::<RideSession>().state, RideState::AtPickup);

        transition_world(&mut world, RideState::InRide);
        run_until_empty(&mut world, &mut schedule, 2_000);

        let session = world.resource::<RideSession>();
        assert_eq!(session.state, RideState::Arrived);
        assert_eq!(session.driver_position, Some(test_destination().coordinate));
        let receipt = last_ride(store.as_ref()).expect("receipt persisted");
        assert_eq!(receipt.dest_name, test_destination().name);
    }
}
