//! Telemetry module for transport-motion (std only).
//!
//! A background link to the encoder/sensor board: port discovery, a line
//! protocol parser and a reconnecting read loop that publishes the latest
//! reading as an owned snapshot.

mod link;
mod protocol;
mod serial;
mod snapshot;

pub use link::{LinkSource, TelemetryLink};
pub use protocol::{parse_line, ParseError, Reading};
pub use serial::SerialSource;
pub use snapshot::{AngleSource, TelemetrySnapshot};
