//! Ride session configuration: timer intervals, movement thresholds, decoy fleet
//! parameters and the straight-line estimate heuristic.
//!
//! Every field has a default matching the production behavior, so a config file
//! only needs the values it overrides.

use std::fs;
use std::path::Path;

use bevy_ecs::prelude::Resource;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Intervals (simulation ms) for every timer the session owns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimerConfig {
    /// One-shot delay between confirmation and driver assignment.
    pub matching_delay_ms: u64,
    /// ETA countdown interval while the driver approaches.
    pub eta_tick_ms: u64,
    /// Position-advance interval for the assigned vehicle.
    pub move_step_ms: u64,
    /// Decoy fleet jitter interval.
    pub fleet_jitter_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            matching_delay_ms: 2_000,
            eta_tick_ms: 30_000,
            move_step_ms: 1_500,
            fleet_jitter_ms: 2_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Great-circle distance below which the vehicle counts as arrived.
    pub proximity_threshold_km: f64,
    /// Share of the remaining distance covered per tick toward pickup.
    pub pickup_step_fraction: f64,
    /// Share of the remaining distance covered per tick toward the destination.
    pub dropoff_step_fraction: f64,
    pub min_driver_eta_minutes: u32,
    /// Driver start offset (degrees) from the rider when no decoy exists.
    pub fallback_driver_offset_lat: f64,
    pub fallback_driver_offset_lng: f64,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            proximity_threshold_km: 0.05,
            pickup_step_fraction: 0.2,
            dropoff_step_fraction: 0.12,
            min_driver_eta_minutes: 2,
            fallback_driver_offset_lat: 0.002,
            fallback_driver_offset_lng: -0.0015,
        }
    }
}

/// Decoy vehicles seeded around the rider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FleetConfig {
    pub size: usize,
    pub base_radius_deg: f64,
    pub radius_factor_min: f64,
    pub radius_factor_max: f64,
    /// Per-axis jitter bound (degrees) applied on every fleet tick.
    pub jitter_deg: f64,
}

impl Default for FleetConfig {
    fn default() -> Self {
        Self {
            size: 5,
            base_radius_deg: 0.002,
            radius_factor_min: 0.7,
            radius_factor_max: 1.3,
            jitter_deg: 0.000_125,
        }
    }
}

/// Fixed-speed heuristic behind the straight-line estimate (3 min/km is 20 km/h).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StraightLineHeuristic {
    pub minutes_per_km: f64,
    pub min_minutes: u32,
}

impl Default for StraightLineHeuristic {
    fn default() -> Self {
        Self {
            minutes_per_km: 3.0,
            min_minutes: 5,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Resource)]
#[serde(default)]
pub struct RideConfig {
    pub timers: TimerConfig,
    pub movement: MovementConfig,
    pub fleet: FleetConfig,
    pub estimate: StraightLineHeuristic,
    /// Seed for the decoy fleet RNG. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl RideConfig {
    /// Load a JSON config file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let config: Self = serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_timers(mut self, timers: TimerConfig) -> Self {
        self.timers = timers;
        self
    }

    pub fn with_fleet_size(mut self, size: usize) -> Self {
        self.fleet.size = size;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let timers = &self.timers;
        if timers.matching_delay_ms == 0
            || timers.eta_tick_ms == 0
            || timers.move_step_ms == 0
            || timers.fleet_jitter_ms == 0
        {
            return Err(ConfigError::Invalid(
                "timer intervals must be greater than zero".to_string(),
            ));
        }

        let movement = &self.movement;
        if !is_positive(movement.proximity_threshold_km) {
            return Err(ConfigError::Invalid(format!(
                "proximity_threshold_km must be positive, got {}",
                movement.proximity_threshold_km
            )));
        }
        for (name, fraction) in [
            ("pickup_step_fraction", movement.pickup_step_fraction),
            ("dropoff_step_fraction", movement.dropoff_step_fraction),
        ] {
            if !is_positive(fraction) || fraction > 1.0 {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in (0, 1], got {fraction}"
                )));
            }
        }

        let fleet = &self.fleet;
        if !is_non_negative(fleet.radius_factor_min)
            || fleet.radius_factor_min > fleet.radius_factor_max
        {
            return Err(ConfigError::Invalid(format!(
                "fleet radius factors must satisfy 0 <= min <= max, got [{}, {}]",
                fleet.radius_factor_min, fleet.radius_factor_max
            )));
        }
        if !is_non_negative(fleet.jitter_deg) {
            return Err(ConfigError::Invalid(format!(
                "fleet jitter_deg must not be negative, got {}",
                fleet.jitter_deg
            )));
        }

        if !is_non_negative(self.estimate.minutes_per_km) {
            return Err(ConfigError::Invalid(format!(
                "minutes_per_km must not be negative, got {}",
                self.estimate.minutes_per_km
            )));
        }
        Ok(())
    }
}

// NaN fails both checks.
fn is_positive(value: f64) -> bool {
    value > 0.0
}

fn is_non_negative(value: f64) -> bool {
    value >= 0.0
}
