//! Latest telemetry state.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Most recent state of the telemetry link.
///
/// `ok == false` means the angle and aux values may be stale or absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    /// Last parsed encoder angle in degrees.
    pub angle_deg: Option<f32>,
    /// Last parsed auxiliary value.
    pub aux_raw: Option<u32>,
    /// Whether the last event was a successful parse.
    pub ok: bool,
    /// Description of the last failure.
    pub error: Option<String>,
    /// Wall-clock time of the last successful parse.
    pub timestamp: Option<SystemTime>,
    /// Device path of the current or last connection.
    pub port: Option<String>,
    /// Last non-empty line received.
    pub last_line: Option<String>,
}

impl TelemetrySnapshot {
    /// The angle, only if the snapshot is valid.
    #[inline]
    pub fn angle(&self) -> Option<f32> {
        if self.ok {
            self.angle_deg
        } else {
            None
        }
    }

    /// Time since the last successful parse.
    pub fn age(&self) -> Option<Duration> {
        self.timestamp.and_then(|ts| ts.elapsed().ok())
    }
}

/// Anything that can report the latest encoder reading.
pub trait AngleSource {
    /// Owned copy of the latest snapshot. Never blocks on I/O.
    fn latest(&self) -> TelemetrySnapshot;

    /// The latest angle, if the snapshot is valid.
    fn angle_deg(&self) -> Option<f32> {
        self.latest().angle()
    }
}

impl<T: AngleSource + ?Sized> AngleSource for Arc<T> {
    fn latest(&self) -> TelemetrySnapshot {
        (**self).latest()
    }

    fn angle_deg(&self) -> Option<f32> {
        (**self).angle_deg()
    }
}
