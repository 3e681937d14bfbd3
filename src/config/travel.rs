//! Closed-loop travel defaults.

use core::time::Duration;

use serde::Deserialize;

use super::secs;

/// Default parameters for `goto_position_mm` and station moves.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TravelConfig {
    /// Cruise duty cycle.
    pub speed: f32,

    /// Arrival band around the target in millimetres.
    pub tolerance_mm: f32,

    /// Distance from target below which speed is capped.
    pub slow_zone_mm: f32,

    /// Duty cycle cap inside the slow zone.
    pub slow_speed: f32,

    /// Travel timeout in seconds.
    pub timeout_s: f32,

    /// Control loop period in milliseconds.
    pub loop_interval_ms: u32,

    /// Wait before retrying a missing encoder reading, in milliseconds.
    pub retry_interval_ms: u32,

    /// Dwell at the pickup station before the dropoff leg, in seconds.
    pub station_dwell_s: f32,
}

impl Default for TravelConfig {
    fn default() -> Self {
        Self {
            speed: 0.6,
            tolerance_mm: 2.0,
            slow_zone_mm: 10.0,
            slow_speed: 0.25,
            timeout_s: 30.0,
            loop_interval_ms: 50,
            retry_interval_ms: 50,
            station_dwell_s: 0.5,
        }
    }
}

impl TravelConfig {
    /// Travel timeout.
    #[inline]
    pub fn timeout(&self) -> Duration {
        secs(self.timeout_s)
    }

    /// Control loop period.
    #[inline]
    pub fn loop_interval(&self) -> Duration {
        Duration::from_millis(self.loop_interval_ms as u64)
    }

    /// Retry wait for a missing reading.
    #[inline]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms as u64)
    }

    /// Dwell between station legs.
    #[inline]
    pub fn station_dwell(&self) -> Duration {
        secs(self.station_dwell_s)
    }
}
