//! Direction of travel.

use core::str::FromStr;

use serde::Deserialize;

use crate::error::{truncated, StepperError};

/// Direction of transport or stepper motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Direction {
    /// Positive travel.
    Forward,
    /// Negative travel.
    Backward,
}

impl Direction {
    /// Direction that reduces a signed position error.
    #[inline]
    pub fn toward(error: f32) -> Self {
        if error > 0.0 {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }

    /// The opposite direction.
    #[inline]
    pub fn reversed(self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        }
    }

    /// Get the sign multiplier.
    #[inline]
    pub fn sign(self) -> i8 {
        match self {
            Direction::Forward => 1,
            Direction::Backward => -1,
        }
    }

    /// Lowercase name as accepted by [`FromStr`].
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

impl FromStr for Direction {
    type Err = StepperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("forward") {
            Ok(Direction::Forward)
        } else if s.eq_ignore_ascii_case("backward") {
            Ok(Direction::Backward)
        } else {
            Err(StepperError::InvalidDirection(truncated(s)))
        }
    }
}
