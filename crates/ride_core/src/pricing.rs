//! Ride option catalog and fare calculation.
//!
//! Formula: `fare = (base_fare + per_km * distance_km + per_min * duration_minutes) * surge`,
//! rounded half-up to cents.

use std::fmt;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::geo::RouteEstimate;

/// One ride tier with its rate parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RideOption {
    pub id: String,
    pub display_name: String,
    pub base_eta_minutes: u32,
    pub base_fare: f64,
    pub per_km: f64,
    pub per_min: f64,
    pub surge_multiplier: f64,
}

impl RideOption {
    fn new(
        id: &str,
        display_name: &str,
        base_eta_minutes: u32,
        base_fare: f64,
        per_km: f64,
        per_min: f64,
        surge_multiplier: f64,
    ) -> Self {
        Self {
            id: id.to_string(),
            display_name: display_name.to_string(),
            base_eta_minutes,
            base_fare,
            per_km,
            per_min,
            surge_multiplier,
        }
    }
}

/// Immutable, ordered catalog of ride options.
#[derive(Debug, Clone, PartialEq, Resource)]
pub struct RideCatalog {
    options: Vec<RideOption>,
}

impl RideCatalog {
    /// The three production tiers: economy, comfort and XL.
    pub fn standard() -> Self {
        Self {
            options: vec![
                RideOption::new("uberx", "UberX", 3, 2.00, 1.20, 0.25, 1.00),
                RideOption::new("comfort", "Comfort", 4, 3.00, 1.50, 0.30, 1.05),
                RideOption::new("xl", "XL", 5, 4.00, 1.90, 0.35, 1.10),
            ],
        }
    }

    pub fn options(&self) -> &[RideOption] {
        &self.options
    }

    /// Initially selected option.
    pub fn first(&self) -> Option<&RideOption> {
        self.options.first()
    }

    pub fn get(&self, id: &str) -> Option<&RideOption> {
        self.options.iter().find(|option| option.id == id)
    }
}

impl Default for RideCatalog {
    fn default() -> Self {
        Self::standard()
    }
}

/// A price in whole cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fare(pub u64);

impl Fare {
    pub fn cents(self) -> u64 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Fare {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

/// Price `option` for `estimate`.
pub fn price(option: &RideOption, estimate: &RouteEstimate) -> Fare {
    let raw = (option.base_fare
        + option.per_km * estimate.distance_km
        + option.per_min * f64::from(estimate.duration_minutes))
        * option.surge_multiplier;
    // Nudge so values like 2.675 that land a hair under the half-cent still round up.
    let cents = (raw.max(0.0) * 100.0 + 0.5 + 1e-9).floor();
    Fare(cents as u64)
}

/// One row of the options sheet.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub option_id: String,
    pub display_name: String,
    pub fare: Fare,
    pub base_eta_minutes: u32,
    pub selected: bool,
}

/// Price every catalog option against `estimate`.
pub fn quotes(catalog: &RideCatalog, estimate: &RouteEstimate, selected_id: &str) -> Vec<Quote> {
    catalog
        .options()
        .iter()
        .map(|option| Quote {
            option_id: option.id.clone(),
            display_name: option.display_name.clone(),
            fare: price(option, estimate),
            base_eta_minutes: option.base_eta_minutes,
            selected: option.id == selected_id,
        })
        .collect()
}
