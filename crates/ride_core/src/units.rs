//! Metric/imperial display preference.

use std::fmt;

use bevy_ecs::prelude::Resource;
use tracing::warn;

use crate::store::KeyValueStore;

pub const KM_TO_MILES: f64 = 0.621371;
pub const UNIT_PREFERENCE_KEY: &str = "unitPreference";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    pub fn as_str(self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    /// Anything other than `"imperial"` reads as metric.
    pub fn from_stored(raw: &str) -> Self {
        if raw == "imperial" {
            UnitSystem::Imperial
        } else {
            UnitSystem::Metric
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            UnitSystem::Metric => UnitSystem::Imperial,
            UnitSystem::Imperial => UnitSystem::Metric,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            UnitSystem::Metric => "km",
            UnitSystem::Imperial => "mi",
        }
    }

    /// Convert a kilometre value into this system's distance unit.
    pub fn distance_from_km(self, km: f64) -> f64 {
        match self {
            UnitSystem::Metric => km,
            UnitSystem::Imperial => km * KM_TO_MILES,
        }
    }

    /// `"12.3 km"` / `"7.6 mi"`.
    pub fn format_km(self, km: f64) -> String {
        format!("{:.1} {}", self.distance_from_km(km), self.suffix())
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn miles_to_km(miles: f64) -> f64 {
    miles / KM_TO_MILES
}

/// Step duration as shown on the route sheet: whole minutes, at least 1.
pub fn step_minutes(duration_seconds: f64) -> u32 {
    ((duration_seconds.max(0.0) / 60.0).round() as u32).max(1)
}

/// Injected unit preference. Loaded once at session start; every change is written
/// back to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Resource)]
pub struct UnitPreference {
    system: UnitSystem,
}

impl UnitPreference {
    pub fn new(system: UnitSystem) -> Self {
        Self { system }
    }

    /// Read the persisted preference. Missing or unreadable values fall back to metric.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        match store.get(UNIT_PREFERENCE_KEY) {
            Ok(Some(raw)) => Self::new(UnitSystem::from_stored(&raw)),
            Ok(None) => Self::default(),
            Err(error) => {
                warn!(%error, "failed to read unit preference, using metric");
                Self::default()
            }
        }
    }

    pub fn system(&self) -> UnitSystem {
        self.system
    }

    pub fn set(&mut self, system: UnitSystem, store: &dyn KeyValueStore) {
        self.system = system;
        if let Err(error) = store.set(UNIT_PREFERENCE_KEY, system.as_str()) {
            warn!(%error, "failed to persist unit preference");
        }
    }

    pub fn toggle(&mut self, store: &dyn KeyValueStore) -> UnitSystem {
        let next = self.system.toggled();
        self.set(next, store);
        next
    }
}
