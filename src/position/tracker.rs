//! Thread-safe position tracker (std only).

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::config::TransportConfig;

use super::TrackerState;

/// Shared position tracker.
///
/// Owns the unwrap state and home reference; every mutation happens under one
/// lock so ingestion from the telemetry thread and from position queries is
/// never interleaved.
#[derive(Debug)]
pub struct PositionTracker {
    state: Mutex<TrackerState>,
    config: TransportConfig,
}

impl PositionTracker {
    /// Create an unhomed tracker.
    pub fn new(config: TransportConfig) -> Self {
        Self {
            state: Mutex::new(TrackerState::new()),
            config,
        }
    }

    /// Calibration in use.
    #[inline]
    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Feed one raw sample.
    pub fn ingest(&self, raw_deg: f32) {
        self.lock().ingest(raw_deg);
    }

    /// Ingest `raw_deg` and store the resulting continuous angle as home.
    ///
    /// Returns the committed home reference.
    pub fn set_home(&self, raw_deg: f32) -> f64 {
        self.lock().set_home(raw_deg)
    }

    /// Forget the home reference.
    pub fn clear_home(&self) {
        self.lock().clear_home();
    }

    /// Forget unwrap history and home reference.
    pub fn reset(&self) {
        self.lock().reset();
    }

    /// Whether a home reference is set.
    pub fn is_homed(&self) -> bool {
        self.lock().is_homed()
    }

    /// Ingest `raw_deg` and return the linear position in millimetres.
    pub fn position_mm(&self, raw_deg: f32, clamp_min_zero: bool) -> f32 {
        self.lock().position_mm(raw_deg, &self.config, clamp_min_zero)
    }

    /// Continuous angle of the last sample.
    pub fn continuous_deg(&self) -> Option<f64> {
        self.lock().angle.continuous_deg()
    }

    /// Committed home reference.
    pub fn home_reference_deg(&self) -> Option<f64> {
        self.lock().home_cont_deg
    }

    /// Owned copy of the full state.
    pub fn snapshot(&self) -> TrackerState {
        *self.lock()
    }
}
