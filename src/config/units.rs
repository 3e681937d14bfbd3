//! Unit types for physical quantities.
//!
//! The only quantity with a hard physical bound is the H-bridge duty cycle;
//! positions and angles are carried as suffixed `f32`/`f64` values.

use serde::Deserialize;

/// PWM duty cycle in `[0.0, 1.0]`.
///
/// Construction always clamps, so a `DutyCycle` can be written to hardware
/// without further checks.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Deserialize)]
#[serde(from = "f32")]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DutyCycle(f32);

impl DutyCycle {
    /// Output fully off.
    pub const OFF: Self = Self(0.0);
    /// Output fully on.
    pub const FULL: Self = Self(1.0);

    /// Create a duty cycle, clamping into `[0.0, 1.0]`.
    ///
    /// NaN maps to `OFF`.
    #[inline]
    pub fn clamped(value: f32) -> Self {
        if value.is_nan() {
            Self::OFF
        } else {
            Self(value.clamp(0.0, 1.0))
        }
    }

    /// Get the raw fraction.
    #[inline]
    pub const fn value(self) -> f32 {
        self.0
    }

    /// Scale onto a PWM peripheral's duty range.
    #[inline]
    pub fn to_duty(self, max_duty: u16) -> u16 {
        libm::roundf(self.0 * max_duty as f32) as u16
    }

    /// Lower of two duty cycles.
    #[inline]
    pub fn min(self, other: Self) -> Self {
        if other.0 < self.0 {
            other
        } else {
            self
        }
    }
}

impl From<f32> for DutyCycle {
    fn from(value: f32) -> Self {
        Self::clamped(value)
    }
}
