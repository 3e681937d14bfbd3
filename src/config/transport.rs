//! Linear transport calibration.

use serde::Deserialize;

/// Encoder-to-belt calibration.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Belt travel per encoder revolution in millimetres.
    pub mm_per_rev: f32,

    /// `+1` if increasing angle means increasing position, `-1` otherwise.
    pub direction_sign: i8,

    /// Report negative positions as zero (home sits on an end-stop).
    pub clamp_min_zero: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mm_per_rev: 90.19,
            direction_sign: 1,
            clamp_min_zero: false,
        }
    }
}

impl TransportConfig {
    /// Create a calibration with the given travel per revolution.
    pub fn new(mm_per_rev: f32) -> Self {
        Self {
            mm_per_rev,
            ..Self::default()
        }
    }

    /// Millimetres per degree of encoder rotation.
    #[inline]
    pub fn mm_per_deg(&self) -> f64 {
        self.mm_per_rev as f64 / 360.0
    }

    /// Direction sign as a float multiplier.
    #[inline]
    pub fn sign(&self) -> f64 {
        if self.direction_sign < 0 {
            -1.0
        } else {
            1.0
        }
    }
}
