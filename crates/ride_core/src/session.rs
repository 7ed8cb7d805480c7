//! [`RideStateMachine`]: the facade that owns one ride session.
//!
//! The session lives in its own ECS [`World`]. Rider actions are methods here and
//! are validated before anything changes; timer-driven progress runs through the
//! [ride schedule](crate::runner::ride_schedule) as the caller advances the clock.
//!
//! Location fixes and directions lookups are asynchronous from the session's point
//! of view: the caller takes an [`AsyncToken`] when it starts one and hands the
//! token back with the result. Rider-position changes and teardown bump the
//! generation, so late results for an old origin or a closed session are dropped.

use bevy_ecs::prelude::{Schedule, World};
use tracing::{debug, info, warn};

use crate::clock::SimulationClock;
use crate::config::RideConfig;
use crate::directions::{
    fallback_path, resolve_route, DirectionStep, DirectionsGateway, RouteResult,
};
use crate::ecs::{
    AsyncToken, Destination, RideSession, RideState, RouteView, SessionLiveness,
};
use crate::error::{ConfigError, LocationError, RideError};
use crate::fleet::{self, FleetRng};
use crate::geo::{Coordinate, RouteEstimate};
use crate::lifecycle::transition_world;
use crate::pricing::{price, quotes, Fare, Quote, RideCatalog};
use crate::records::save_route_steps;
use crate::runner::{ride_schedule, run_next_event, run_until};
use crate::store::{SharedStore, StoreResource};
use crate::telemetry::RideTelemetry;
use crate::units::{step_minutes, UnitPreference, UnitSystem};

/// What happened to an async result handed back to the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    Applied,
    /// The token was stale or the session is closed; nothing changed.
    Discarded,
}

/// Everything a caller needs to run a directions lookup for the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteRequest {
    pub token: AsyncToken,
    pub origin: Coordinate,
    pub destination: Coordinate,
}

/// One formatted row of the route sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct StepLine {
    pub instruction: String,
    /// Unit-aware, one decimal: `"0.2 km"` / `"0.1 mi"`.
    pub distance: String,
    pub minutes: u32,
}

/// Insert every resource a ride session needs. The config is validated first.
pub fn build_ride_world(
    config: RideConfig,
    destination: Destination,
    store: SharedStore,
) -> Result<World, ConfigError> {
    config.validate()?;
    let mut world = World::new();
    let catalog = RideCatalog::standard();
    let selected = catalog
        .first()
        .map(|option| option.id.clone())
        .unwrap_or_default();

    world.insert_resource(UnitPreference::load(store.as_ref()));
    world.insert_resource(StoreResource(store));
    world.insert_resource(FleetRng::new(config.seed));
    world.insert_resource(RideSession::new(destination, selected));
    world.insert_resource(catalog);
    world.insert_resource(config);
    world.insert_resource(SimulationClock::default());
    world.insert_resource(RideTelemetry::default());
    world.insert_resource(SessionLiveness::default());
    Ok(world)
}

pub struct RideStateMachine {
    world: World,
    schedule: Schedule,
}

impl RideStateMachine {
    /// Fails when `config` does not pass [`RideConfig::validate`].
    pub fn new(
        config: RideConfig,
        destination: Destination,
        store: SharedStore,
    ) -> Result<Self, ConfigError> {
        let name = destination.name.clone();
        let world = build_ride_world(config, destination, store)?;
        info!(destination = %name, "ride session created");
        Ok(Self {
            world,
            schedule: ride_schedule(),
        })
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn session(&self) -> &RideSession {
        self.world.resource::<RideSession>()
    }

    pub fn state(&self) -> RideState {
        self.session().state
    }

    pub fn config(&self) -> &RideConfig {
        self.world.resource::<RideConfig>()
    }

    pub fn clock(&self) -> &SimulationClock {
        self.world.resource::<SimulationClock>()
    }

    pub fn now(&self) -> u64 {
        self.clock().now()
    }

    pub fn telemetry(&self) -> &RideTelemetry {
        self.world.resource::<RideTelemetry>()
    }

    pub fn store(&self) -> SharedStore {
        self.world.resource::<StoreResource>().0.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.world.resource::<SessionLiveness>().closed
    }

    /// Decoys to draw. Hidden while a driver is assigned.
    pub fn nearby_cars(&mut self) -> Vec<(String, Coordinate)> {
        if self.state().has_driver() {
            return Vec::new();
        }
        fleet::nearby_cars(&mut self.world)
    }

    /// Provider estimate when present, else the straight-line one.
    pub fn estimate(&self) -> Option<RouteEstimate> {
        self.session().estimates.freshest()
    }

    // ---------------------------------------------------------------------
    // Location
    // ---------------------------------------------------------------------

    /// Start a location request. Hand the token back to [`Self::location_resolved`].
    pub fn request_location(&self) -> Result<AsyncToken, RideError> {
        self.ensure_open()?;
        Ok(self.world.resource::<SessionLiveness>().token())
    }

    pub fn location_resolved(
        &mut self,
        token: AsyncToken,
        result: Result<Coordinate, LocationError>,
    ) -> Completion {
        if !self.accepts(token) {
            debug!("discarding stale location result");
            return Completion::Discarded;
        }
        match result {
            Ok(position) => self.set_rider_position(position),
            Err(LocationError::PermissionDenied) => {
                self.deny_permission();
                Completion::Applied
            }
            Err(LocationError::Unavailable(reason)) => {
                warn!(%reason, "location unavailable, still waiting for a fix");
                Completion::Applied
            }
        }
    }

    /// Apply a new rider fix: refresh the straight-line estimate and fallback route,
    /// reseed the decoys, and invalidate in-flight lookups for the old origin.
    pub fn set_rider_position(&mut self, position: Coordinate) -> Completion {
        if self.ensure_open().is_err() {
            return Completion::Discarded;
        }
        if !position.is_valid() {
            warn!(
                latitude = position.latitude,
                longitude = position.longitude,
                "ignoring out-of-range rider position"
            );
            return Completion::Discarded;
        }

        let heuristic = self.config().estimate;
        {
            let mut session = self.world.resource_mut::<RideSession>();
            let destination = session.destination.coordinate;
            session.rider_position = Some(position);
            session.estimates.straight_line = Some(RouteEstimate::straight_line(
                position,
                destination,
                &heuristic,
            ));
            session.estimates.provider = None;
            session.route = RouteView {
                path: fallback_path(position, destination),
                steps: Vec::new(),
            };
        }
        self.world.resource_mut::<SessionLiveness>().bump();
        fleet::reseed(&mut self.world, position);
        debug!(
            latitude = position.latitude,
            longitude = position.longitude,
            "rider position updated"
        );
        Completion::Applied
    }

    /// The rider's position became unknown: decoys are removed and in-flight
    /// lookups are invalidated. Movement toward the rider pauses until a new fix.
    pub fn clear_rider_position(&mut self) {
        if self.is_closed() {
            return;
        }
        self.world.resource_mut::<RideSession>().rider_position = None;
        self.world.resource_mut::<SessionLiveness>().bump();
        fleet::clear(&mut self.world);
    }

    fn deny_permission(&mut self) {
        warn!("location permission denied, session is inert");
        self.world.resource_mut::<RideSession>().permission_denied = true;
        self.world.resource_mut::<SessionLiveness>().bump();
        self.world.resource_mut::<SimulationClock>().cancel_all();
        fleet::clear(&mut self.world);
    }

    // ---------------------------------------------------------------------
    // Directions
    // ---------------------------------------------------------------------

    /// Origin/destination for a directions lookup, once the rider position is known.
    pub fn route_request(&self) -> Option<RouteRequest> {
        self.ensure_open().ok()?;
        let session = self.session();
        Some(RouteRequest {
            token: self.world.resource::<SessionLiveness>().token(),
            origin: session.rider_position?,
            destination: session.destination.coordinate,
        })
    }

    /// Apply a directions answer. An absent or malformed route keeps the
    /// straight-line estimate and the two-point path.
    pub fn route_resolved(&mut self, token: AsyncToken, result: Option<RouteResult>) -> Completion {
        if !self.accepts(token) {
            debug!("discarding stale directions result");
            return Completion::Discarded;
        }
        let Some(result) = result else {
            debug!("no provider route, keeping straight-line estimate");
            return Completion::Applied;
        };
        let resolved = match resolve_route(&result) {
            Ok(resolved) => resolved,
            Err(error) => {
                warn!(%error, "provider route unusable, keeping straight-line estimate");
                return Completion::Applied;
            }
        };

        save_route_steps(self.store().as_ref(), &resolved.steps);
        let mut session = self.world.resource_mut::<RideSession>();
        session.estimates.provider = Some(resolved.estimate);
        session.route = RouteView {
            path: resolved.path,
            steps: resolved.steps,
        };
        info!(
            distance_km = resolved.estimate.distance_km,
            duration_minutes = resolved.estimate.duration_minutes,
            "provider route applied"
        );
        Completion::Applied
    }

    /// Run a lookup against `gateway` and apply the answer.
    pub fn refresh_route(&mut self, gateway: &dyn DirectionsGateway) -> Completion {
        let Some(request) = self.route_request() else {
            return Completion::Discarded;
        };
        let result = gateway.fetch_route(request.origin, request.destination);
        self.route_resolved(request.token, result)
    }

    pub fn route_steps(&self) -> &[DirectionStep] {
        &self.session().route.steps
    }

    pub fn route_path(&self) -> &[Coordinate] {
        &self.session().route.path
    }

    // ---------------------------------------------------------------------
    // Options and pricing
    // ---------------------------------------------------------------------

    pub fn select_option(&mut self, option_id: &str) -> Result<(), RideError> {
        self.ensure_open()?;
        self.ensure_state(RideState::Idle, "select an option")?;
        if self.world.resource::<RideCatalog>().get(option_id).is_none() {
            return Err(RideError::UnknownOption(option_id.to_string()));
        }
        self.world.resource_mut::<RideSession>().selected_option = option_id.to_string();
        Ok(())
    }

    /// Every option priced against the freshest estimate. Empty until an estimate exists.
    pub fn quotes(&self) -> Vec<Quote> {
        let Some(estimate) = self.estimate() else {
            return Vec::new();
        };
        quotes(
            self.world.resource::<RideCatalog>(),
            &estimate,
            &self.session().selected_option,
        )
    }

    pub fn selected_quote(&self) -> Option<Quote> {
        self.quotes().into_iter().find(|quote| quote.selected)
    }

    /// The locked fare once confirmed, else the selected option's current price.
    pub fn fare(&self) -> Option<Fare> {
        self.session()
            .locked_fare
            .or_else(|| self.selected_quote().map(|quote| quote.fare))
    }

    // ---------------------------------------------------------------------
    // Display
    // ---------------------------------------------------------------------

    pub fn units(&self) -> UnitSystem {
        self.world.resource::<UnitPreference>().system()
    }

    pub fn toggle_units(&mut self) -> UnitSystem {
        let store = self.store();
        self.world
            .resource_mut::<UnitPreference>()
            .toggle(store.as_ref())
    }

    /// `"~22 min • 12.3 km"`.
    pub fn summary_line(&self) -> Option<String> {
        let estimate = self.estimate()?;
        Some(format!(
            "~{} min • {}",
            estimate.duration_minutes,
            self.units().format_km(estimate.distance_km)
        ))
    }

    pub fn step_lines(&self) -> Vec<StepLine> {
        let units = self.units();
        self.route_steps()
            .iter()
            .map(|step| StepLine {
                instruction: step.instruction.clone(),
                distance: units.format_km(step.distance_meters / 1000.0),
                minutes: step_minutes(step.duration_seconds),
            })
            .collect()
    }

    // ---------------------------------------------------------------------
    // Lifecycle actions
    // ---------------------------------------------------------------------

    /// Open the confirmation sheet.
    pub fn request_ride(&mut self) -> Result<(), RideError> {
        self.ensure_open()?;
        self.ensure_state(RideState::Idle, "request a ride")?;
        self.world.resource_mut::<RideSession>().confirmation_open = true;
        Ok(())
    }

    /// Close the confirmation sheet without confirming.
    pub fn cancel_request(&mut self) -> Result<(), RideError> {
        self.ensure_open()?;
        self.ensure_state(RideState::Idle, "cancel the request")?;
        self.world.resource_mut::<RideSession>().confirmation_open = false;
        Ok(())
    }

    /// Lock the fare and start looking for a driver.
    pub fn confirm_ride(&mut self) -> Result<(), RideError> {
        self.ensure_open()?;
        self.ensure_state(RideState::Idle, "confirm a ride")?;
        if self.session().rider_position.is_none() {
            return Err(RideError::RiderPositionUnknown);
        }
        let fare = {
            let session = self.session();
            let option = self.world.resource::<RideCatalog>().get(&session.selected_option);
            match (option, session.estimates.freshest()) {
                (Some(option), Some(estimate)) => Some(price(option, &estimate)),
                _ => None,
            }
        };

        {
            let mut session = self.world.resource_mut::<RideSession>();
            session.locked_fare = fare;
            session.confirmation_open = false;
        }
        info!(
            option = %self.session().selected_option,
            fare = %fare.map(|fare| fare.to_string()).unwrap_or_default(),
            "ride confirmed"
        );
        self.apply_transition(RideState::FindingDriver);
        Ok(())
    }

    /// Board the rider. The trip leg starts from the rider's current position.
    pub fn start_trip(&mut self) -> Result<(), RideError> {
        self.ensure_open()?;
        self.ensure_state(RideState::AtPickup, "start the trip")?;
        {
            let mut session = self.world.resource_mut::<RideSession>();
            if let Some(rider) = session.rider_position {
                session.driver_position = Some(rider);
            }
        }
        self.apply_transition(RideState::InRide);
        Ok(())
    }

    pub fn rate(&mut self, stars: u8) -> Result<(), RideError> {
        self.ensure_open()?;
        self.ensure_state(RideState::Arrived, "rate the ride")?;
        if !(1..=5).contains(&stars) {
            return Err(RideError::InvalidRating(stars));
        }
        self.world.resource_mut::<RideSession>().rating = Some(stars);
        Ok(())
    }

    /// Close the trip summary and return to idle.
    pub fn dismiss(&mut self) -> Result<(), RideError> {
        self.ensure_open()?;
        self.ensure_state(RideState::Arrived, "dismiss the trip")?;
        {
            let mut session = self.world.resource_mut::<RideSession>();
            session.driver_position = None;
            session.eta_minutes = None;
            session.rating = None;
            session.locked_fare = None;
            session.confirmation_open = false;
        }
        self.apply_transition(RideState::Idle);
        Ok(())
    }

    /// End the session: every timer is cancelled, decoys are removed, and pending
    /// async results will be discarded. Idempotent.
    pub fn teardown(&mut self) {
        if self.is_closed() {
            return;
        }
        let state = self.state();
        self.world.resource_mut::<SimulationClock>().cancel_all();
        fleet::clear(&mut self.world);
        let mut liveness = self.world.resource_mut::<SessionLiveness>();
        liveness.bump();
        liveness.closed = true;
        info!(state = %state, "ride session torn down");
    }

    // ---------------------------------------------------------------------
    // Time
    // ---------------------------------------------------------------------

    /// Process the next pending timer event. Returns `false` when none is pending.
    pub fn step(&mut self) -> bool {
        if self.is_closed() {
            return false;
        }
        run_next_event(&mut self.world, &mut self.schedule)
    }

    /// Advance simulation time by `ms`, firing every timer that falls due.
    /// Returns the number of events processed.
    pub fn advance_by(&mut self, ms: u64) -> usize {
        if self.is_closed() {
            return 0;
        }
        let until = self.now().saturating_add(ms);
        run_until(&mut self.world, &mut self.schedule, until)
    }

    // ---------------------------------------------------------------------
    // Internals
    // ---------------------------------------------------------------------

    fn accepts(&self, token: AsyncToken) -> bool {
        self.world.resource::<SessionLiveness>().accepts(token)
    }

    fn ensure_open(&self) -> Result<(), RideError> {
        if self.is_closed() {
            return Err(RideError::SessionClosed);
        }
        if self.session().permission_denied {
            return Err(RideError::PermissionDenied);
        }
        Ok(())
    }

    fn ensure_state(&self, expected: RideState, action: &'static str) -> Result<(), RideError> {
        let state = self.state();
        if state == expected {
            Ok(())
        } else {
            Err(RideError::InvalidAction { action, state })
        }
    }

    fn apply_transition(&mut self, next: RideState) {
        transition_world(&mut self.world, next);
    }
}
