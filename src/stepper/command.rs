//! Queued stepper instructions.

use core::time::Duration;

use crate::motion::Direction;

/// One instruction for the stepper worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepCommand {
    /// Emit `steps` pulses in `direction`.
    Move {
        /// Travel direction.
        direction: Direction,
        /// Pulse count, already clamped.
        steps: u32,
        /// Time spent in each pulse level, already clamped.
        half_period: Duration,
        /// Stop generation the move was queued under.
        epoch: u64,
    },
    /// Disable the driver.
    Stop,
}

impl StepCommand {
    /// Whether a stop issued after queuing has cancelled this command.
    #[inline]
    pub fn is_stale(&self, current_epoch: u64) -> bool {
        match self {
            StepCommand::Move { epoch, .. } => *epoch != current_epoch,
            StepCommand::Stop => false,
        }
    }
}
