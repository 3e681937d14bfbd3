//! Homing run records.

use std::time::Duration;

use crate::error::HomingError;

/// Lifecycle of a homing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HomingState {
    /// No run has been started.
    #[default]
    Idle,
    /// A run is in progress.
    Running,
    /// The last run committed a home reference.
    Succeeded,
    /// The last run failed.
    Failed,
    /// The last run was cancelled by the caller.
    Cancelled,
}

impl HomingState {
    /// Whether this is a terminal state.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            HomingState::Succeeded | HomingState::Failed | HomingState::Cancelled
        )
    }
}

/// Result of one completed homing run.
#[derive(Debug, Clone, PartialEq)]
pub struct HomingOutcome {
    /// Terminal state.
    pub state: HomingState,
    /// Committed continuous home angle, on success.
    pub home_reference_deg: Option<f64>,
    /// Failure detail, on failure or cancellation.
    pub error: Option<HomingError>,
    /// Wall time the run took.
    pub elapsed: Duration,
}

impl HomingOutcome {
    /// Build the record for a finished run.
    pub fn from_result(result: Result<f64, HomingError>, elapsed: Duration) -> Self {
        match result {
            Ok(home) => Self {
                state: HomingState::Succeeded,
                home_reference_deg: Some(home),
                error: None,
                elapsed,
            },
            Err(e) => Self {
                state: if e == HomingError::Cancelled {
                    HomingState::Cancelled
                } else {
                    HomingState::Failed
                },
                home_reference_deg: None,
                error: Some(e),
                elapsed,
            },
        }
    }

    /// Whether the run committed a reference.
    #[inline]
    pub fn succeeded(&self) -> bool {
        self.state == HomingState::Succeeded
    }

    /// Whether the run ended on a caller request.
    #[inline]
    pub fn cancelled(&self) -> bool {
        self.state == HomingState::Cancelled
    }
}

/// Session status as seen by callers.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct HomingStatus {
    /// A run is in progress.
    pub running: bool,
    /// Current state; the last terminal state when idle.
    pub state: HomingState,
    /// Last completed run, kept until the next one starts.
    pub last_result: Option<HomingOutcome>,
}
