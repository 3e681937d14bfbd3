//! Homing configuration.

use core::time::Duration;

use serde::Deserialize;

use crate::motion::Direction;

use super::secs;

/// Which homing procedure to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingStrategy {
    /// Drive toward the sensor at one speed, coast, settle, commit.
    #[default]
    SingleSpeed,
    /// Fast approach, back off until release, slow re-approach, commit.
    ThreePhase,
}

/// Homing parameters for both strategies.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct HomingConfig {
    /// Procedure used by the background homing session.
    pub strategy: HomingStrategy,

    /// Direction that moves the carriage toward the reference sensor.
    pub direction: Direction,

    /// Single-speed approach duty cycle.
    pub speed: f32,

    /// Single-speed timeout in seconds.
    pub timeout_s: f32,

    /// Settle time after stopping, before reading the encoder.
    pub settle_s: f32,

    /// Sensor poll interval in milliseconds.
    pub poll_interval_ms: u32,

    /// Three-phase: fast approach duty cycle.
    pub fast_speed: f32,

    /// Three-phase: release and contact duty cycle.
    pub slow_speed: f32,

    /// Three-phase: timeout per phase in seconds.
    pub approach_timeout_s: f32,

    /// Three-phase: pause after each brake in seconds.
    pub pause_s: f32,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            strategy: HomingStrategy::SingleSpeed,
            direction: Direction::Backward,
            speed: 0.4,
            timeout_s: 10.0,
            settle_s: 0.15,
            poll_interval_ms: 10,
            fast_speed: 0.6,
            slow_speed: 0.2,
            approach_timeout_s: 20.0,
            pause_s: 0.2,
        }
    }
}

impl HomingConfig {
    /// Single-speed timeout.
    #[inline]
    pub fn timeout(&self) -> Duration {
        secs(self.timeout_s)
    }

    /// Post-stop settle time.
    #[inline]
    pub fn settle(&self) -> Duration {
        secs(self.settle_s)
    }

    /// Sensor poll interval.
    #[inline]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms as u64)
    }

    /// Three-phase per-phase timeout.
    #[inline]
    pub fn approach_timeout(&self) -> Duration {
        secs(self.approach_timeout_s)
    }

    /// Three-phase pause after braking.
    #[inline]
    pub fn pause(&self) -> Duration {
        secs(self.pause_s)
    }
}
