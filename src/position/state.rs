//! Tracker state: unwrap history plus the home reference.

use crate::config::TransportConfig;

use super::UnwrapState;

/// Complete position-tracking state.
///
/// Pure value type; [`PositionTracker`](super::PositionTracker) wraps it in a
/// mutex for shared use.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TrackerState {
    /// Unwrap history.
    pub angle: UnwrapState,
    /// Continuous angle recorded when homing succeeded.
    pub home_cont_deg: Option<f64>,
}

impl TrackerState {
    /// Create an unhomed state with no samples.
    pub const fn new() -> Self {
        Self {
            angle: UnwrapState::new(),
            home_cont_deg: None,
        }
    }

    /// Feed one raw sample.
    #[inline]
    pub fn ingest(&mut self, raw_deg: f32) -> f64 {
        self.angle.ingest(raw_deg)
    }

    /// Ingest `raw_deg` and record the resulting continuous angle as home.
    pub fn set_home(&mut self, raw_deg: f32) -> f64 {
        let cont = self.angle.ingest(raw_deg);
        self.home_cont_deg = Some(cont);
        cont
    }

    /// Forget the home reference.
    #[inline]
    pub fn clear_home(&mut self) {
        self.home_cont_deg = None;
    }

    /// Whether a home reference is set.
    #[inline]
    pub fn is_homed(&self) -> bool {
        self.home_cont_deg.is_some()
    }

    /// Forget both unwrap history and home reference.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Ingest `raw_deg` and return the linear position in millimetres.
    ///
    /// Unhomed axes report `0.0`. With `clamp_min_zero`, negative positions
    /// are reported as `0.0`.
    pub fn position_mm(&mut self, raw_deg: f32, config: &TransportConfig, clamp_min_zero: bool) -> f32 {
        let cont = self.angle.ingest(raw_deg);
        let mm = match self.home_cont_deg {
            Some(home) => (config.sign() * (cont - home) * config.mm_per_deg()) as f32,
            None => 0.0,
        };
        if clamp_min_zero && mm < 0.0 {
            0.0
        } else {
            mm
        }
    }
}
