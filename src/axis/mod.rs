//! Axis module for transport-motion (std only).
//!
//! Closed-loop travel to millimetre targets, precise three-phase homing and
//! station-to-station moves over a station table.

mod controller;
mod stations;

pub use controller::AxisController;
pub use stations::{StationTable, Stations};
