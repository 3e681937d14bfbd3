//! Threshold-based speed selection for closed-loop travel.
//!
//! No PID: the command is full speed outside the slow zone, the capped slow
//! speed inside it, and stop inside the tolerance band.

use crate::config::units::DutyCycle;
use crate::config::TravelConfig;

use super::Direction;

/// Output of one control decision.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TravelCommand {
    /// Within tolerance: stop and report arrival.
    Arrived,
    /// Drive toward the target.
    Drive {
        /// Direction that reduces the error.
        direction: Direction,
        /// Commanded duty cycle.
        speed: DutyCycle,
    },
}

/// Chooses a motor command from the remaining distance to target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedSelector {
    /// Cruise duty cycle.
    pub speed: DutyCycle,
    /// Arrival band in millimetres.
    pub tolerance_mm: f32,
    /// Deceleration zone in millimetres.
    pub slow_zone_mm: f32,
    /// Duty cycle cap inside the slow zone.
    pub slow_speed: DutyCycle,
}

impl SpeedSelector {
    /// Create a selector.
    pub fn new(speed: f32, tolerance_mm: f32, slow_zone_mm: f32, slow_speed: f32) -> Self {
        Self {
            speed: DutyCycle::clamped(speed),
            tolerance_mm,
            slow_zone_mm,
            slow_speed: DutyCycle::clamped(slow_speed),
        }
    }

    /// Selector with the configured travel defaults.
    pub fn from_config(config: &TravelConfig) -> Self {
        Self::new(config.speed, config.tolerance_mm, config.slow_zone_mm, config.slow_speed)
    }

    /// Decide the command for `error_mm = target - position`.
    pub fn command(&self, error_mm: f32) -> TravelCommand {
        let distance = libm::fabsf(error_mm);
        if distance <= self.tolerance_mm {
            return TravelCommand::Arrived;
        }

        let speed = if distance < self.slow_zone_mm {
            self.speed.min(self.slow_speed)
        } else {
            self.speed
        };

        TravelCommand::Drive {
            direction: Direction::toward(error_mm),
            speed,
        }
    }
}
