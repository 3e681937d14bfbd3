//! Wrap-around detection for a `[0, 360)` angle signal.

/// Accumulated turn count plus the last raw sample.
///
/// Any single-step delta larger than 180° is taken to be a wrap through
/// 0/360, never genuine motion; the signal must be sampled often enough that
/// real motion between two samples stays below half a turn.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UnwrapState {
    turns: i64,
    last_raw: Option<f32>,
}

impl UnwrapState {
    /// Create an empty state (no sample seen yet).
    #[inline]
    pub const fn new() -> Self {
        Self {
            turns: 0,
            last_raw: None,
        }
    }

    /// Feed one raw sample and return the continuous angle in degrees.
    pub fn ingest(&mut self, raw_deg: f32) -> f64 {
        if let Some(last) = self.last_raw {
            let delta = raw_deg - last;
            if delta < -180.0 {
                // 359 -> 0: moved forward through zero
                self.turns += 1;
            } else if delta > 180.0 {
                // 0 -> 359: moved backward through zero
                self.turns -= 1;
            }
        } else {
            self.turns = 0;
        }
        self.last_raw = Some(raw_deg);
        self.compose(raw_deg)
    }

    /// Continuous angle of the last sample, if any.
    #[inline]
    pub fn continuous_deg(&self) -> Option<f64> {
        self.last_raw.map(|raw| self.compose(raw))
    }

    /// Completed turns (signed).
    #[inline]
    pub fn turns(&self) -> i64 {
        self.turns
    }

    /// Last raw sample.
    #[inline]
    pub fn last_raw(&self) -> Option<f32> {
        self.last_raw
    }

    /// Forget all history.
    #[inline]
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    #[inline]
    fn compose(&self, raw_deg: f32) -> f64 {
        self.turns as f64 * 360.0 + raw_deg as f64
    }
}
