mod support;

use chrono::{TimeZone, Utc};
use ride_core::geo::Coordinate;
use ride_core::places::{
    choose_destination, fallback_suggestions, search_places, PlaceSuggestion, QueryDebouncer,
};
use ride_core::records::recent_destinations;
use ride_core::session::RideStateMachine;
use ride_core::store::MemoryStore;
use ride_core::test_helpers::{test_config, test_rider};

use support::ScriptedPlaces;

fn ferry_building() -> PlaceSuggestion {
    PlaceSuggestion {
        id: "ChIJferry".to_string(),
        name: "Ferry Building".to_string(),
        subtitle: "The Embarcadero".to_string(),
        coordinate: None,
    }
}

fn ferry_coordinate() -> Coordinate {
    Coordinate {
        latitude: 37.7955,
        longitude: -122.3937,
    }
}

fn scripted() -> ScriptedPlaces {
    ScriptedPlaces::new(
        vec![ferry_building()],
        vec![(ferry_building().id, ferry_coordinate())],
    )
}

#[test]
fn empty_query_skips_lookup() {
    let places = scripted();
    assert_eq!(
        search_places(Some(&places), "   ", None),
        fallback_suggestions()
    );
    assert_eq!(places.calls(), 0);
}

#[test]
fn query_is_trimmed_before_lookup() {
    let places = scripted();
    let results = search_places(Some(&places), "  ferry ", Some(test_rider()));
    assert_eq!(results, vec![ferry_building()]);
    assert_eq!(places.calls(), 1);
    assert_eq!(
        places.last_query.lock().expect("lock").as_deref(),
        Some("ferry")
    );
}

#[test]
fn missing_or_failing_lookup_falls_back() {
    assert_eq!(search_places(None, "ferry", None), fallback_suggestions());
    let failing = ScriptedPlaces::failing();
    assert_eq!(
        search_places(Some(&failing), "ferry", None),
        fallback_suggestions()
    );
    assert_eq!(failing.calls(), 1);
}

#[test]
fn chosen_place_is_resolved_and_remembered() {
    let places = scripted();
    let store = MemoryStore::shared();
    let now = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();

    let destination = choose_destination(Some(&places), store.as_ref(), &ferry_building(), now)
        .expect("resolved");
    assert_eq!(destination.coordinate, ferry_coordinate());
    assert_eq!(destination.id.as_deref(), Some("ChIJferry"));

    let recents = recent_destinations(store.as_ref());
    assert_eq!(recents.len(), 1);
    assert_eq!(recents[0].name, "Ferry Building");
    assert_eq!(recents[0].when, now.timestamp_millis());

    // The destination drives a fresh session.
    let mut machine =
        RideStateMachine::new(test_config(), destination, store.clone()).expect("valid config");
    let token = machine.request_location().expect("open");
    machine.location_resolved(token, Ok(test_rider()));
    assert!(machine.summary_line().is_some());
}

#[test]
fn recents_are_deduplicated_newest_first() {
    let places = scripted();
    let store = MemoryStore::shared();
    let airport = fallback_suggestions().remove(0);
    let t = |minute| Utc.with_ymd_and_hms(2024, 5, 1, 9, minute, 0).unwrap();

    choose_destination(Some(&places), store.as_ref(), &ferry_building(), t(0)).expect("ferry");
    choose_destination(None, store.as_ref(), &airport, t(1)).expect("airport");
    choose_destination(Some(&places), store.as_ref(), &ferry_building(), t(2)).expect("ferry");

    let names: Vec<_> = recent_destinations(store.as_ref())
        .into_iter()
        .map(|recent| recent.name)
        .collect();
    assert_eq!(names, vec!["Ferry Building", "Airport"]);
}

#[test]
fn unresolvable_place_is_not_remembered() {
    let store = MemoryStore::shared();
    let unknown = PlaceSuggestion {
        id: "nowhere".to_string(),
        ..ferry_building()
    };
    assert!(choose_destination(Some(&scripted()), store.as_ref(), &unknown, Utc::now()).is_none());
    assert!(
        choose_destination(Some(&ScriptedPlaces::failing()), store.as_ref(), &ferry_building(), Utc::now())
            .is_none()
    );
    assert!(choose_destination(None, store.as_ref(), &ferry_building(), Utc::now()).is_none());
    assert!(recent_destinations(store.as_ref()).is_empty());
}

#[test]
fn debounced_typing_runs_one_search() {
    let places = scripted();
    let mut debouncer = QueryDebouncer::new();
    let mut ran = Vec::new();

    for (now, text) in [(0, "f"), (80, "fe"), (160, "fer"), (240, "ferry")] {
        debouncer.input(text, now);
        if let Some(query) = debouncer.poll(now) {
            ran.push(search_places(Some(&places), &query, None));
        }
    }
    assert!(ran.is_empty());

    let query = debouncer.poll(490).expect("quiet period elapsed");
    assert_eq!(query, "ferry");
    search_places(Some(&places), &query, None);
    assert_eq!(places.calls(), 1);
}
