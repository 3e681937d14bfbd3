//! # transport-motion
//!
//! Motion control for an encoder-tracked linear transport with embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **Wrap-safe position tracking**: A 0–360° encoder is unwrapped into a continuous,
//!   signed linear position relative to a home reference
//! - **Homing**: Cancelable single-speed homing in the background, or precise
//!   three-phase homing on the caller's thread
//! - **Closed-loop travel**: Threshold speed selection with a slow zone near the target
//! - **Telemetry link**: Reconnecting serial reader publishing the latest encoder reading
//! - **Stepper queue**: FIFO open-loop step/direction moves with best-effort stop
//! - **no_std compatible**: Unwrapping, drivers and configuration work without std
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use transport_motion::{AxisController, PositionTracker, SerialSource, Shared, TelemetryLink};
//!
//! let config = transport_motion::load_config("transport.toml")?;
//!
//! let tracker = Arc::new(PositionTracker::new(config.transport));
//! let link = TelemetryLink::new(SerialSource::new(config.telemetry.clone()), config.telemetry)
//!     .with_tracker(Arc::clone(&tracker));
//! link.start();
//!
//! // One H-bridge shared by every controller
//! let motor = Shared::new(MotorDriver::new(r_en, l_en, rpwm, lpwm));
//! let sensor = Shared::new(EndStop::active_low(sensor_pin));
//!
//! let mut axis = AxisController::new(motor, sensor, link, tracker, config.travel, config.homing);
//! axis.home()?;
//! axis.goto(250.0)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Threads, serial telemetry, TOML loading and tracing logs
//! - `alloc`: Enables heap allocation for no_std with allocator
//! - `defmt`: Enables defmt logging for embedded targets

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

#[cfg(feature = "alloc")]
extern crate alloc;

// Core modules
pub mod config;
pub mod error;
pub mod motion;
pub mod motor;
pub mod position;

// Threaded components (std only)
#[cfg(feature = "std")]
pub mod axis;
#[cfg(feature = "std")]
pub mod homing;
#[cfg(feature = "std")]
mod shared;
#[cfg(feature = "std")]
pub mod stepper;
#[cfg(feature = "std")]
pub mod telemetry;

// Re-exports for ergonomic API
pub use config::{validate_config, SystemConfig};
pub use error::{Error, Result};
pub use motion::{Direction, SpeedSelector, TravelCommand};
pub use motor::{EndStop, MotorDriver, ReferenceSensor, StepperDriver, StopMode, Transport};
pub use position::{TrackerState, UnwrapState};

#[cfg(feature = "std")]
pub use axis::{AxisController, StationTable, Stations};
#[cfg(feature = "std")]
pub use homing::{HomingOutcome, HomingSession, HomingState, HomingStatus};
#[cfg(feature = "std")]
pub use position::PositionTracker;
#[cfg(feature = "std")]
pub use shared::Shared;
#[cfg(feature = "std")]
pub use stepper::{StepCommandQueue, StepCommandQueueBuilder};
#[cfg(feature = "std")]
pub use telemetry::{AngleSource, SerialSource, TelemetryLink, TelemetrySnapshot};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::DutyCycle;
