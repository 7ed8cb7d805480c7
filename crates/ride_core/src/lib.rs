pub mod clock;
pub mod config;
pub mod directions;
pub mod ecs;
pub mod error;
pub mod fleet;
pub mod geo;
pub mod lifecycle;
pub mod places;
pub mod polyline;
pub mod pricing;
pub mod records;
pub mod runner;
pub mod session;
pub mod store;
pub mod systems;
pub mod telemetry;
pub mod units;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
