//! Reference (end-stop) sensor input.

use embedded_hal::digital::InputPin;

use crate::error::MotorError;

/// A polled boolean sensor marking the home position.
pub trait ReferenceSensor {
    /// Whether the sensor currently detects the carriage.
    fn is_active(&mut self) -> Result<bool, MotorError>;
}

impl<T: ReferenceSensor + ?Sized> ReferenceSensor for &mut T {
    fn is_active(&mut self) -> Result<bool, MotorError> {
        (**self).is_active()
    }
}

/// End-stop on a digital input pin.
///
/// With a pulled-up input the inductive sensor pulls the line low when
/// active, so `active_low` is the usual polarity.
#[derive(Debug)]
pub struct EndStop<P> {
    pin: P,
    active_low: bool,
}

impl<P: InputPin> EndStop<P> {
    /// Sensor that reads LOW when active.
    pub fn active_low(pin: P) -> Self {
        Self {
            pin,
            active_low: true,
        }
    }

    /// Sensor that reads HIGH when active.
    pub fn active_high(pin: P) -> Self {
        Self {
            pin,
            active_low: false,
        }
    }

    /// Hand back the pin.
    pub fn release(self) -> P {
        self.pin
    }
}

impl<P: InputPin> ReferenceSensor for EndStop<P> {
    fn is_active(&mut self) -> Result<bool, MotorError> {
        let high = self.pin.is_high().map_err(|_| MotorError::SensorError)?;
        Ok(high != self.active_low)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};

    #[test]
    fn test_active_low_polarity() {
        let pin = PinMock::new(&[
            PinTransaction::get(State::Low),
            PinTransaction::get(State::High),
        ]);
        let mut sensor = EndStop::active_low(pin);
        assert!(sensor.is_active().unwrap());
        assert!(!sensor.is_active().unwrap());
        sensor.release().done();
    }

    #[test]
    fn test_active_high_polarity() {
        let pin = PinMock::new(&[PinTransaction::get(State::High)]);
        let mut sensor = EndStop::active_high(pin);
        assert!(sensor.is_active().unwrap());
        sensor.release().done();
    }
}
