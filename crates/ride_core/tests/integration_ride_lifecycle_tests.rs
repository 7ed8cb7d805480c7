mod support;

use ride_core::clock::EventKind;
use ride_core::config::RideConfig;
use ride_core::directions::StaticDirectionsGateway;
use ride_core::ecs::RideState;
use ride_core::error::{LocationError, RideError};
use ride_core::records::last_ride;
use ride_core::session::{Completion, RideStateMachine};
use ride_core::store::MemoryStore;
use ride_core::test_helpers::{
    located_machine, test_config, test_destination, test_machine, test_rider,
};

use support::{advance_until_state, complete_ride, provider_route};

#[test]
fn full_ride_visits_every_state_in_order() {
    let store = MemoryStore::shared();
    let mut machine = located_machine(store.clone());

    complete_ride(&mut machine);

    assert_eq!(
        machine.telemetry().path(),
        vec![
            RideState::Idle,
            RideState::FindingDriver,
            RideState::DriverEnRoute,
            RideState::AtPickup,
            RideState::InRide,
            RideState::Arrived,
        ]
    );
    let session = machine.session();
    assert_eq!(session.driver_position, Some(test_destination().coordinate));

    let receipt = last_ride(store.as_ref()).expect("receipt written on arrival");
    assert_eq!(receipt.dest_name, "Downtown");
    assert_eq!(receipt.dest_subtitle.as_deref(), Some("San Francisco"));
    assert_eq!(receipt.price.as_deref(), Some("5.90"));

    machine.rate(5).expect("rating accepted");
    assert_eq!(machine.session().rating, Some(5));

    machine.dismiss().expect("dismiss");
    let session = machine.session();
    assert_eq!(session.state, RideState::Idle);
    assert_eq!(session.driver_position, None);
    assert_eq!(session.eta_minutes, None);
    assert_eq!(session.rating, None);
    assert_eq!(session.locked_fare, None);
}

#[test]
fn confirm_reaches_en_route_after_matching_delay() {
    let mut machine = located_machine(MemoryStore::shared());
    machine.confirm_ride().expect("confirm");
    assert_eq!(machine.state(), RideState::FindingDriver);

    machine.advance_by(1_999);
    assert_eq!(machine.state(), RideState::FindingDriver);
    assert_eq!(machine.session().driver_position, None);

    machine.advance_by(1);
    assert_eq!(machine.state(), RideState::DriverEnRoute);
    assert!(machine.session().driver_position.is_some());
    assert!(machine.session().eta_minutes.expect("eta") >= 2);
    assert_eq!(machine.telemetry().time_to_match(), Some(2_000));
}

#[test]
fn repeated_ticks_reach_pickup_with_zero_eta() {
    let mut machine = located_machine(MemoryStore::shared());
    machine.confirm_ride().expect("confirm");
    assert!(advance_until_state(&mut machine, RideState::AtPickup));

    let session = machine.session();
    assert_eq!(session.eta_minutes, Some(0));
    assert_eq!(session.driver_position, Some(test_rider()));
    assert_eq!(machine.clock().pending(EventKind::EtaTick), 0);
    assert_eq!(machine.clock().pending(EventKind::MoveStep), 0);

    // Nothing moves the driver until the trip starts.
    machine.advance_by(60_000);
    assert_eq!(machine.state(), RideState::AtPickup);
    assert_eq!(machine.session().eta_minutes, Some(0));
}

#[test]
fn trip_starts_from_where_the_rider_is() {
    let mut machine = located_machine(MemoryStore::shared());
    machine.confirm_ride().expect("confirm");
    assert!(advance_until_state(&mut machine, RideState::AtPickup));

    let moved = test_rider().offset(0.0005, 0.0);
    machine.set_rider_position(moved);
    assert_eq!(machine.session().driver_position, Some(test_rider()));

    machine.start_trip().expect("start");
    assert_eq!(machine.state(), RideState::InRide);
    assert_eq!(machine.session().driver_position, Some(moved));
}

#[test]
fn eta_counts_down_and_stops_at_one() {
    let mut config = test_config();
    config.movement.pickup_step_fraction = 0.001;
    let mut machine = RideStateMachine::new(config, test_destination(), MemoryStore::shared())
        .expect("valid config");
    let token = machine.request_location().expect("open");
    machine.location_resolved(token, Ok(test_rider()));
    machine.select_option("xl").expect("xl exists");
    machine.confirm_ride().expect("confirm");

    machine.advance_by(2_000);
    assert_eq!(machine.session().eta_minutes, Some(5));
    machine.advance_by(30_000);
    assert_eq!(machine.session().eta_minutes, Some(4));
    machine.advance_by(90_000);
    assert_eq!(machine.session().eta_minutes, Some(1));
    assert_eq!(machine.clock().pending(EventKind::EtaTick), 0);

    machine.advance_by(120_000);
    assert_eq!(machine.session().eta_minutes, Some(1));
    assert_eq!(machine.state(), RideState::DriverEnRoute);
}

#[test]
fn invalid_actions_leave_session_unchanged() {
    let mut machine = located_machine(MemoryStore::shared());
    let before = machine.session().clone();

    assert_eq!(
        machine.start_trip(),
        Err(RideError::InvalidAction {
            action: "start the trip",
            state: RideState::Idle
        })
    );
    assert!(matches!(
        machine.dismiss(),
        Err(RideError::InvalidAction { .. })
    ));
    assert!(matches!(machine.rate(4), Err(RideError::InvalidAction { .. })));
    assert_eq!(
        machine.select_option("helicopter"),
        Err(RideError::UnknownOption("helicopter".to_string()))
    );
    assert_eq!(machine.session(), &before);

    machine.confirm_ride().expect("confirm");
    let confirmed = machine.session().clone();
    assert!(matches!(
        machine.confirm_ride(),
        Err(RideError::InvalidAction {
            state: RideState::FindingDriver,
            ..
        })
    ));
    assert!(matches!(
        machine.select_option("comfort"),
        Err(RideError::InvalidAction { .. })
    ));
    assert!(matches!(
        machine.request_ride(),
        Err(RideError::InvalidAction { .. })
    ));
    assert_eq!(machine.session(), &confirmed);
}

#[test]
fn rating_must_be_one_to_five() {
    let mut machine = located_machine(MemoryStore::shared());
    complete_ride(&mut machine);

    assert_eq!(machine.rate(0), Err(RideError::InvalidRating(0)));
    assert_eq!(machine.rate(6), Err(RideError::InvalidRating(6)));
    assert_eq!(machine.session().rating, None);
    machine.rate(1).expect("one star");
    assert_eq!(machine.session().rating, Some(1));
}

#[test]
fn fare_is_locked_at_confirmation() {
    let store = MemoryStore::shared();
    let mut machine = located_machine(store.clone());
    let quoted = machine.fare().expect("straight-line quote");
    machine.confirm_ride().expect("confirm");
    assert_eq!(machine.session().locked_fare, Some(quoted));

    let gateway = StaticDirectionsGateway::new(provider_route(4_800.0, 900.0));
    assert_eq!(machine.refresh_route(&gateway), Completion::Applied);
    let repriced = machine.selected_quote().expect("quote").fare;
    assert_ne!(repriced, quoted, "provider estimate reprices the quote list");
    assert_eq!(machine.fare(), Some(quoted));

    complete_ride_from_finding(&mut machine);
    let receipt = last_ride(store.as_ref()).expect("receipt");
    assert_eq!(receipt.price, Some(quoted.to_string()));
}

fn complete_ride_from_finding(machine: &mut RideStateMachine) {
    assert!(advance_until_state(machine, RideState::AtPickup));
    machine.start_trip().expect("start");
    assert!(advance_until_state(machine, RideState::Arrived));
}

#[test]
fn confirm_requires_rider_position() {
    let mut machine = test_machine();
    assert_eq!(machine.confirm_ride(), Err(RideError::RiderPositionUnknown));
    assert_eq!(machine.state(), RideState::Idle);
    assert!(machine.clock().is_empty());
}

#[test]
fn teardown_cancels_timers_and_drops_late_results() {
    let mut machine = test_machine();
    let location_token = machine.request_location().expect("open");
    machine.location_resolved(location_token, Ok(test_rider()));
    let route = machine.route_request().expect("route request");
    machine.confirm_ride().expect("confirm");
    assert!(!machine.clock().is_empty());

    machine.teardown();
    assert!(machine.is_closed());
    assert!(machine.clock().is_empty());
    assert!(!machine.step());
    assert_eq!(machine.advance_by(60_000), 0);
    assert_eq!(machine.state(), RideState::FindingDriver);
    assert!(machine.nearby_cars().is_empty());

    assert_eq!(
        machine.route_resolved(route.token, Some(provider_route(4_800.0, 900.0))),
        Completion::Discarded
    );
    assert_eq!(machine.session().estimates.provider, None);
    assert_eq!(machine.request_location(), Err(RideError::SessionClosed));
    assert_eq!(machine.start_trip(), Err(RideError::SessionClosed));

    // Idempotent.
    machine.teardown();
    assert!(machine.is_closed());
}

#[test]
fn unknown_rider_position_pauses_pickup() {
    let mut machine = located_machine(MemoryStore::shared());
    machine.confirm_ride().expect("confirm");
    machine.advance_by(2_000);
    assert_eq!(machine.state(), RideState::DriverEnRoute);

    machine.clear_rider_position();
    let parked = machine.session().driver_position;
    machine.advance_by(15_000);
    assert_eq!(machine.state(), RideState::DriverEnRoute);
    assert_eq!(machine.session().driver_position, parked);
    assert_eq!(machine.clock().pending(EventKind::MoveStep), 1);
    assert_eq!(machine.clock().pending(EventKind::FleetJitter), 0);

    machine.set_rider_position(test_rider());
    assert!(advance_until_state(&mut machine, RideState::AtPickup));
}

#[test]
fn stale_location_result_is_discarded() {
    let mut machine = test_machine();
    let first = machine.request_location().expect("open");
    let second = machine.request_location().expect("open");
    assert_eq!(first, second);

    assert_eq!(
        machine.location_resolved(first, Ok(test_rider())),
        Completion::Applied
    );
    let moved = test_rider().offset(0.01, 0.0);
    assert_eq!(
        machine.location_resolved(second, Ok(moved)),
        Completion::Discarded
    );
    assert_eq!(machine.session().rider_position, Some(test_rider()));
}

#[test]
fn unavailable_location_keeps_waiting() {
    let mut machine = test_machine();
    let token = machine.request_location().expect("open");
    assert_eq!(
        machine.location_resolved(token, Err(LocationError::Unavailable("timeout".into()))),
        Completion::Applied
    );
    assert!(!machine.session().permission_denied);
    let retry = machine.request_location().expect("still open");
    machine.location_resolved(retry, Ok(test_rider()));
    assert_eq!(machine.session().rider_position, Some(test_rider()));
}

#[test]
fn decoys_hide_while_driver_is_assigned() {
    let mut machine = located_machine(MemoryStore::shared());
    assert_eq!(machine.nearby_cars().len(), 5);

    machine.confirm_ride().expect("confirm");
    machine.advance_by(2_000);
    assert!(machine.nearby_cars().is_empty());
    assert_eq!(machine.clock().pending(EventKind::FleetJitter), 1);

    assert!(advance_until_state(&mut machine, RideState::AtPickup));
    machine.start_trip().expect("start");
    assert!(advance_until_state(&mut machine, RideState::Arrived));
    machine.dismiss().expect("dismiss");
    assert_eq!(machine.nearby_cars().len(), 5);
}

#[test]
fn same_seed_seeds_same_fleet() {
    let mut a = located_machine(MemoryStore::shared());
    let mut b = located_machine(MemoryStore::shared());
    assert_eq!(a.nearby_cars(), b.nearby_cars());

    let config = RideConfig::default().with_seed(7).with_fleet_size(0);
    let mut empty = RideStateMachine::new(config, test_destination(), MemoryStore::shared())
        .expect("valid config");
    let token = empty.request_location().expect("open");
    empty.location_resolved(token, Ok(test_rider()));
    assert!(empty.nearby_cars().is_empty());
    assert_eq!(empty.clock().pending(EventKind::FleetJitter), 0);

    // Without decoys the driver starts at the fixed offset from the rider.
    empty.confirm_ride().expect("confirm");
    empty.advance_by(2_000);
    let start = empty.session().driver_position.expect("driver");
    assert!((start.latitude - (test_rider().latitude + 0.002)).abs() < 1e-9);
    assert!((start.longitude - (test_rider().longitude - 0.0015)).abs() < 1e-9);
}
