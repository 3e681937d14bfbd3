//! Transport motor abstraction.

use crate::error::MotorError;
use crate::motion::Direction;

/// How to stop the transport motor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopMode {
    /// Drive disabled, motor free-wheels.
    #[default]
    Coast,
    /// Both half-bridges on with zero differential, motor resists motion.
    Brake,
}

/// A bidirectional, speed-controlled motor.
///
/// Calls are direct hardware writes with no queuing; callers own call-rate
/// and sequencing.
pub trait Transport {
    /// Drive forward at `speed` (clamped to `[0, 1]`).
    fn forward(&mut self, speed: f32) -> Result<(), MotorError>;

    /// Drive backward at `speed` (clamped to `[0, 1]`).
    fn backward(&mut self, speed: f32) -> Result<(), MotorError>;

    /// Stop by coasting or braking.
    fn stop(&mut self, mode: StopMode) -> Result<(), MotorError>;

    /// Drive in `direction` at `speed`.
    fn drive(&mut self, direction: Direction, speed: f32) -> Result<(), MotorError> {
        match direction {
            Direction::Forward => self.forward(speed),
            Direction::Backward => self.backward(speed),
        }
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn forward(&mut self, speed: f32) -> Result<(), MotorError> {
        (**self).forward(speed)
    }

    fn backward(&mut self, speed: f32) -> Result<(), MotorError> {
        (**self).backward(speed)
    }

    fn stop(&mut self, mode: StopMode) -> Result<(), MotorError> {
        (**self).stop(mode)
    }
}
