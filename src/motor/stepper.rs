//! Step/direction pulse driver (TB6600 class).
//!
//! Generic over embedded-hal 1.0 pin types. The enable line is owned by the
//! caller so it can be dropped from another context while pulses are running.

use core::time::Duration;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::error::MotorError;
use crate::motion::Direction;

/// Stepper pulse driver.
///
/// Generic over:
/// - `PUL`: pulse pin (must implement `OutputPin`)
/// - `DIR`: direction pin (must implement `OutputPin`)
/// - `DELAY`: delay provider (must implement `DelayNs`)
pub struct StepperDriver<PUL, DIR, DELAY>
where
    PUL: OutputPin,
    DIR: OutputPin,
    DELAY: DelayNs,
{
    /// Pulse pin (one rising edge per step).
    pulse_pin: PUL,

    /// Direction pin (low = forward unless inverted).
    dir_pin: DIR,

    /// Delay provider for pulse timing.
    delay: DELAY,

    /// Whether direction pin logic is inverted.
    invert_direction: bool,

    /// Current direction (cached to avoid unnecessary pin writes).
    current_direction: Option<Direction>,
}

impl<PUL, DIR, DELAY> StepperDriver<PUL, DIR, DELAY>
where
    PUL: OutputPin,
    DIR: OutputPin,
    DELAY: DelayNs,
{
    /// Create a driver.
    pub fn new(pulse_pin: PUL, dir_pin: DIR, delay: DELAY, invert_direction: bool) -> Self {
        Self {
            pulse_pin,
            dir_pin,
            delay,
            invert_direction,
            current_direction: None,
        }
    }

    /// Hand back the hardware.
    pub fn release(self) -> (PUL, DIR, DELAY) {
        (self.pulse_pin, self.dir_pin, self.delay)
    }

    /// Last direction written to the DIR pin.
    #[inline]
    pub fn direction(&self) -> Option<Direction> {
        self.current_direction
    }

    /// Set the DIR pin. Returns `true` if the pin changed.
    pub fn set_direction(&mut self, direction: Direction) -> Result<bool, MotorError> {
        if self.current_direction == Some(direction) {
            return Ok(false);
        }

        let pin_low = match direction {
            Direction::Forward => !self.invert_direction,
            Direction::Backward => self.invert_direction,
        };

        if pin_low {
            self.dir_pin.set_low().map_err(|_| MotorError::PinError)?;
        } else {
            self.dir_pin.set_high().map_err(|_| MotorError::PinError)?;
        }

        self.current_direction = Some(direction);
        Ok(true)
    }

    /// Emit one pulse: high for `half_period`, then low for `half_period`.
    pub fn pulse(&mut self, half_period: Duration) -> Result<(), MotorError> {
        let us = duration_us(half_period);
        self.pulse_pin.set_high().map_err(|_| MotorError::PinError)?;
        self.delay.delay_us(us);
        self.pulse_pin.set_low().map_err(|_| MotorError::PinError)?;
        self.delay.delay_us(us);
        Ok(())
    }

    /// Emit up to `steps` pulses, asking `keep_going` before each one.
    ///
    /// Returns the number of pulses actually emitted. A pulse already started
    /// always completes.
    pub fn run<F>(&mut self, steps: u32, half_period: Duration, mut keep_going: F) -> Result<u32, MotorError>
    where
        F: FnMut() -> bool,
    {
        let mut emitted = 0;
        while emitted < steps {
            if !keep_going() {
                break;
            }
            self.pulse(half_period)?;
            emitted += 1;
        }
        Ok(emitted)
    }

    /// Block for `duration` on the driver's delay provider.
    pub fn wait(&mut self, duration: Duration) {
        self.delay.delay_us(duration_us(duration));
    }
}

fn duration_us(duration: Duration) -> u32 {
    u32::try_from(duration.as_micros()).unwrap_or(u32::MAX)
}
