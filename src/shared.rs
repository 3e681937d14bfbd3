//! Shared hardware handles (std only).
//!
//! One hardware object is constructed once and handed to each controller as a
//! cloned handle. The lock is held for a single call, never across a control
//! loop, so controllers interleave at call granularity.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::MotorError;
use crate::motor::{ReferenceSensor, StopMode, Transport};

/// Cloneable handle to a mutex-guarded hardware object.
#[derive(Debug, Default)]
pub struct Shared<T>(Arc<Mutex<T>>);

impl<T> Shared<T> {
    /// Wrap a hardware object.
    pub fn new(inner: T) -> Self {
        Self(Arc::new(Mutex::new(inner)))
    }

    /// Lock the object. A poisoned lock is recovered; hardware state is
    /// still the best information available.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` with exclusive access.
    pub fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.lock())
    }
}

impl<T> Clone for Shared<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T: Transport> Transport for Shared<T> {
    fn forward(&mut self, speed: f32) -> Result<(), MotorError> {
        self.lock().forward(speed)
    }

    fn backward(&mut self, speed: f32) -> Result<(), MotorError> {
        self.lock().backward(speed)
    }

    fn stop(&mut self, mode: StopMode) -> Result<(), MotorError> {
        self.lock().stop(mode)
    }
}

impl<T: ReferenceSensor> ReferenceSensor for Shared<T> {
    fn is_active(&mut self) -> Result<bool, MotorError> {
        self.lock().is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingMotor {
        calls: u32,
    }

    impl Transport for CountingMotor {
        fn forward(&mut self, _speed: f32) -> Result<(), MotorError> {
            self.calls += 1;
            Ok(())
        }

        fn backward(&mut self, _speed: f32) -> Result<(), MotorError> {
            self.calls += 1;
            Ok(())
        }

        fn stop(&mut self, _mode: StopMode) -> Result<(), MotorError> {
            self.calls += 1;
            Ok(())
        }
    }

    #[test]
    fn test_clones_share_hardware() {
        let motor = Shared::new(CountingMotor::default());
        let mut a = motor.clone();
        let mut b = motor.clone();
        a.forward(0.5).unwrap();
        b.stop(StopMode::Brake).unwrap();
        assert_eq!(motor.with(|m| m.calls), 2);
    }
}
