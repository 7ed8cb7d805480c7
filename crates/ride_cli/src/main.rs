//! Drive one simulated ride from the terminal and print what the rider would see.
//!
//! Run with: cargo run -p ride_cli -- --dest-lat 37.7955 --dest-lng -122.3937

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use clap::Parser;
use eyre::{eyre, Result, WrapErr};
use ride_core::config::RideConfig;
use ride_core::directions::{
    CachedDirectionsGateway, DirectionsGateway, SyntheticDirectionsGateway,
};
use ride_core::ecs::{Destination, RideState};
use ride_core::geo::Coordinate;
use ride_core::places::{choose_destination, fallback_suggestions, search_places, PlacesLookup};
use ride_core::records::last_ride;
use ride_core::session::RideStateMachine;
use ride_core::store::{JsonFileStore, MemoryStore, SharedStore};
use ride_core::units::UnitSystem;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Simulated time allowed for each phase of the ride before giving up.
const PHASE_LIMIT_MS: u64 = 30 * 60 * 1000;
const TICK_MS: u64 = 500;

#[derive(Debug, Parser)]
#[command(author, version, about = "Simulate a single ride from request to arrival")]
struct Args {
    /// Rider latitude
    #[arg(long, default_value_t = 37.7749, allow_negative_numbers = true)]
    rider_lat: f64,
    #[arg(long, default_value_t = -122.4194, allow_negative_numbers = true)]
    rider_lng: f64,

    /// Destination latitude; requires --dest-lng
    #[arg(long, requires = "dest_lng", allow_negative_numbers = true)]
    dest_lat: Option<f64>,
    #[arg(long, requires = "dest_lat", allow_negative_numbers = true)]
    dest_lng: Option<f64>,
    /// Name shown for a pinned destination
    #[arg(long, default_value = "Dropped pin")]
    dest_name: String,

    /// Search for the destination instead of pinning it
    #[arg(long, conflicts_with_all = ["dest_lat", "dest_lng"])]
    query: Option<String>,

    /// Google Maps key for directions and places; offline stand-ins are used without it
    #[arg(long, env = "GOOGLE_MAPS_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// JSON file backing the ride records; in-memory when omitted
    #[arg(long)]
    store: Option<PathBuf>,

    /// JSON session config overriding the defaults
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed for the decoy fleet
    #[arg(long)]
    seed: Option<u64>,

    /// Ride option id (uberx, comfort, xl)
    #[arg(long, default_value = "uberx")]
    option: String,

    /// Stars given after arrival
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(1..=5))]
    rating: u8,

    /// Show distances in miles (persisted to the store)
    #[arg(long)]
    imperial: bool,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ride_core=info,ride_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn open_store(path: Option<&PathBuf>) -> SharedStore {
    match path {
        Some(path) => {
            info!(path = %path.display(), "using file store");
            Arc::new(JsonFileStore::new(path))
        }
        None => MemoryStore::shared(),
    }
}

fn load_config(args: &Args) -> Result<RideConfig> {
    let config = match &args.config {
        Some(path) => RideConfig::from_json_file(path)?,
        None => RideConfig::default(),
    };
    Ok(match args.seed {
        Some(seed) => config.with_seed(seed),
        None => config,
    })
}

#[cfg(feature = "http")]
fn places_lookup(api_key: Option<&str>) -> Result<Option<Box<dyn PlacesLookup>>> {
    let Some(key) = api_key else {
        return Ok(None);
    };
    let client = ride_core::places::GooglePlacesClient::new(key)
        .wrap_err("failed to build places client")?;
    Ok(Some(Box::new(client)))
}

#[cfg(not(feature = "http"))]
fn places_lookup(api_key: Option<&str>) -> Result<Option<Box<dyn PlacesLookup>>> {
    if api_key.is_some() {
        warn!("built without http support, ignoring api key");
    }
    Ok(None)
}

#[cfg(feature = "http")]
fn directions_gateway(api_key: Option<&str>) -> Result<Box<dyn DirectionsGateway>> {
    let inner: Box<dyn DirectionsGateway> = match api_key {
        Some(key) => Box::new(
            ride_core::directions::GoogleDirectionsClient::new(key)
                .wrap_err("failed to build directions client")?,
        ),
        None => Box::new(SyntheticDirectionsGateway),
    };
    Ok(Box::new(CachedDirectionsGateway::with_default_capacity(inner)))
}

#[cfg(not(feature = "http"))]
fn directions_gateway(_api_key: Option<&str>) -> Result<Box<dyn DirectionsGateway>> {
    Ok(Box::new(CachedDirectionsGateway::with_default_capacity(
        Box::new(SyntheticDirectionsGateway),
    )))
}

fn pick_destination(
    args: &Args,
    rider: Coordinate,
    lookup: Option<&dyn PlacesLookup>,
    store: &SharedStore,
) -> Result<Destination> {
    if let (Some(lat), Some(lng)) = (args.dest_lat, args.dest_lng) {
        let coordinate = Coordinate::new(lat, lng).wrap_err("invalid destination")?;
        return Ok(Destination {
            id: None,
            name: args.dest_name.clone(),
            subtitle: format!("{lat:.4}, {lng:.4}"),
            coordinate,
        });
    }

    let suggestions = match &args.query {
        Some(query) => search_places(lookup, query, Some(rider)),
        None => fallback_suggestions(),
    };
    let suggestion = match &args.query {
        Some(_) => suggestions.first(),
        // Downtown when nothing was asked for.
        None => suggestions.last(),
    }
    .ok_or_else(|| eyre!("no places matched {:?}", args.query.as_deref().unwrap_or("")))?;
    choose_destination(lookup, store.as_ref(), suggestion, Utc::now())
        .ok_or_else(|| eyre!("could not resolve a coordinate for '{}'", suggestion.name))
}

fn advance_until(machine: &mut RideStateMachine, state: RideState) -> Result<()> {
    let start = machine.now();
    while machine.state() != state {
        if machine.now() - start > PHASE_LIMIT_MS {
            return Err(eyre!(
                "ride stuck in {} while waiting for {}",
                machine.state(),
                state
            ));
        }
        machine.advance_by(TICK_MS);
    }
    Ok(())
}

fn print_trip_sheet(machine: &mut RideStateMachine) {
    let session = machine.session();
    println!(
        "--- {} ({}) ---",
        session.destination.name, session.destination.subtitle
    );
    if let Some(summary) = machine.summary_line() {
        println!("{summary}");
    }
    for (i, line) in machine.step_lines().iter().enumerate() {
        println!(
            "  {}. {}  {}  {} min",
            i + 1,
            line.instruction,
            line.distance,
            line.minutes
        );
    }
    println!("\nRide options:");
    for quote in machine.quotes() {
        println!(
            "  {} {:<8} ${:>7}  {} min away",
            if quote.selected { ">" } else { " " },
            quote.display_name,
            quote.fare.to_string(),
            quote.base_eta_minutes
        );
    }
    println!("\nNearby cars: {}", machine.nearby_cars().len());
}

fn print_telemetry(machine: &RideStateMachine) {
    const ONE_SEC_MS: u64 = 1000;
    let telemetry = machine.telemetry();
    println!("\nState transitions:");
    for transition in &telemetry.transitions {
        println!(
            "  {:>6} s  {} -> {}",
            transition.at_ms / ONE_SEC_MS,
            transition.from,
            transition.to
        );
    }
    let seconds = |ms: Option<u64>| ms.map(|ms| ms / ONE_SEC_MS).unwrap_or_default();
    println!(
        "time_to_match={} s  time_to_pickup={} s  trip_duration={} s",
        seconds(telemetry.time_to_match()),
        seconds(telemetry.time_to_pickup()),
        seconds(telemetry.trip_duration())
    );
}

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let rider = Coordinate::new(args.rider_lat, args.rider_lng).wrap_err("invalid rider position")?;
    let store = open_store(args.store.as_ref());
    let config = load_config(&args)?;
    let lookup = places_lookup(args.api_key.as_deref())?;
    let gateway = directions_gateway(args.api_key.as_deref())?;

    let destination = pick_destination(&args, rider, lookup.as_deref(), &store)?;
    let mut machine = RideStateMachine::new(config, destination, store.clone())
        .wrap_err("invalid session config")?;

    let token = machine.request_location()?;
    machine.location_resolved(token, Ok(rider));
    if args.imperial && machine.units() != UnitSystem::Imperial {
        machine.toggle_units();
    }
    machine.select_option(&args.option)?;
    machine.refresh_route(gateway.as_ref());

    print_trip_sheet(&mut machine);

    machine.request_ride()?;
    machine.confirm_ride()?;
    info!(fare = ?machine.fare().map(|fare| fare.to_string()), "looking for a driver");
    advance_until(&mut machine, RideState::DriverEnRoute)?;
    if let Some(eta) = machine.session().eta_minutes {
        println!("\nDriver assigned, {eta} min away");
    }
    advance_until(&mut machine, RideState::AtPickup)?;
    println!("Driver has arrived");

    machine.start_trip()?;
    advance_until(&mut machine, RideState::Arrived)?;
    machine.rate(args.rating)?;
    println!("Arrived. Rated {} stars", args.rating);

    print_telemetry(&machine);

    match last_ride(store.as_ref()) {
        Some(receipt) => println!(
            "\nReceipt: {} at ${} ({})",
            receipt.dest_name,
            receipt.price.as_deref().unwrap_or("-"),
            receipt.when.to_rfc3339()
        ),
        None => warn!("no receipt was recorded"),
    }

    machine.dismiss()?;
    machine.teardown();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pinned_destination_needs_both_coordinates() {
        assert!(Args::try_parse_from(["ride_cli", "--dest-lat", "37.79"]).is_err());
        let args = Args::try_parse_from([
            "ride_cli",
            "--dest-lat",
            "37.7955",
            "--dest-lng",
            "-122.3937",
        ])
        .expect("parse");
        assert_eq!(args.dest_lng, Some(-122.3937));
    }

    #[test]
    fn query_conflicts_with_pin() {
        assert!(Args::try_parse_from([
            "ride_cli",
            "--query",
            "ferry",
            "--dest-lat",
            "1",
            "--dest-lng",
            "2"
        ])
        .is_err());
    }

    #[test]
    fn rating_is_range_checked() {
        assert!(Args::try_parse_from(["ride_cli", "--rating", "6"]).is_err());
        assert_eq!(
            Args::try_parse_from(["ride_cli"]).expect("defaults").rating,
            5
        );
    }

    #[test]
    fn default_destination_is_downtown() {
        let args = Args::try_parse_from(["ride_cli"]).expect("defaults");
        let store = MemoryStore::shared();
        let rider = Coordinate::new(args.rider_lat, args.rider_lng).expect("valid");
        let destination = pick_destination(&args, rider, None, &store).expect("destination");
        assert_eq!(destination.name, "Downtown");
    }
}
