//! Stepper command limits.

use core::time::Duration;

use serde::Deserialize;

use super::secs;

/// Safety bounds and timing for the open-loop stepper.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct StepperConfig {
    /// Largest step count a single move may request.
    pub max_steps: u32,

    /// Shortest half-period between pulse edges in seconds.
    pub min_delay_s: f32,

    /// Longest half-period between pulse edges in seconds.
    pub max_delay_s: f32,

    /// Wait after toggling ENA or DIR, in milliseconds.
    pub enable_settle_ms: u32,

    /// Invert DIR pin logic (default: DIR low = forward).
    pub invert_direction: bool,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            max_steps: 400_000,
            min_delay_s: 0.0001,
            max_delay_s: 0.05,
            enable_settle_ms: 10,
            invert_direction: false,
        }
    }
}

impl StepperConfig {
    /// Clamp a requested step count into `[1, max_steps]`.
    #[inline]
    pub fn clamp_steps(&self, steps: i64) -> u32 {
        steps.clamp(1, self.max_steps.max(1) as i64) as u32
    }

    /// Clamp a requested half-period into `[min_delay_s, max_delay_s]`.
    #[inline]
    pub fn clamp_delay(&self, delay_s: f32) -> Duration {
        let delay = if delay_s.is_nan() { self.min_delay_s } else { delay_s };
        secs(delay.max(self.min_delay_s).min(self.max_delay_s))
    }

    /// Settle time after ENA/DIR changes.
    #[inline]
    pub fn enable_settle(&self) -> Duration {
        Duration::from_millis(self.enable_settle_ms as u64)
    }
}
