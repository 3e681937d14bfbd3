//! Configuration module for transport-motion.
//!
//! Provides types for loading and validating the transport calibration,
//! homing, travel, telemetry, stepper and station settings from TOML files
//! (with `std` feature) or pre-parsed data.

mod homing;
#[cfg(feature = "std")]
mod loader;
mod station;
mod stepper;
mod system;
mod telemetry;
mod transport;
mod travel;
pub mod units;
mod validation;

pub use homing::{HomingConfig, HomingStrategy};
pub use station::{Side, StationConfig};
pub use stepper::StepperConfig;
pub use system::SystemConfig;
pub use telemetry::TelemetryConfig;
pub use transport::TransportConfig;
pub use travel::TravelConfig;
pub use validation::validate_config;
#[cfg(feature = "std")]
pub(crate) use validation::validate_stepper;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

pub use units::DutyCycle;

use core::time::Duration;

/// Convert a configured number of seconds into a `Duration`.
///
/// Negative and NaN values collapse to zero, overflow saturates.
#[inline]
pub(crate) fn secs(value: f32) -> Duration {
    if value > 0.0 {
        Duration::try_from_secs_f32(value).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}
