//! H-bridge transport motor driver (BTS7960 / IBT-2 class).
//!
//! Generic over embedded-hal 1.0 output pins for the two enable lines and
//! `SetDutyCycle` channels for the two PWM inputs.

use embedded_hal::digital::OutputPin;
use embedded_hal::pwm::SetDutyCycle;

use crate::config::units::DutyCycle;
use crate::error::MotorError;

use super::transport::{StopMode, Transport};

/// Two-channel H-bridge driver.
///
/// Generic over:
/// - `REN`/`LEN`: right/left enable pins (must implement `OutputPin`)
/// - `RPWM`/`LPWM`: right/left PWM channels (must implement `SetDutyCycle`)
///
/// Forward drives RPWM, backward drives LPWM. The idle channel is always
/// zeroed before the active one is raised so both half-bridges are never
/// driven at once.
pub struct MotorDriver<REN, LEN, RPWM, LPWM> {
    r_enable: REN,
    l_enable: LEN,
    r_pwm: RPWM,
    l_pwm: LPWM,
}

impl<REN, LEN, RPWM, LPWM> MotorDriver<REN, LEN, RPWM, LPWM>
where
    REN: OutputPin,
    LEN: OutputPin,
    RPWM: SetDutyCycle,
    LPWM: SetDutyCycle,
{
    /// Create a driver. Outputs are not touched until the first command.
    pub fn new(r_enable: REN, l_enable: LEN, r_pwm: RPWM, l_pwm: LPWM) -> Self {
        Self {
            r_enable,
            l_enable,
            r_pwm,
            l_pwm,
        }
    }

    /// Coast immediately, then hand back the hardware.
    pub fn release(mut self) -> (REN, LEN, RPWM, LPWM) {
        let _ = self.coast();
        (self.r_enable, self.l_enable, self.r_pwm, self.l_pwm)
    }

    /// Free-wheel: enables off, both PWM channels at zero.
    pub fn coast(&mut self) -> Result<(), MotorError> {
        self.r_enable.set_low().map_err(|_| MotorError::PinError)?;
        self.l_enable.set_low().map_err(|_| MotorError::PinError)?;
        write_duty(&mut self.r_pwm, DutyCycle::OFF)?;
        write_duty(&mut self.l_pwm, DutyCycle::OFF)
    }

    /// Active brake: enables on, both PWM channels at zero.
    pub fn brake(&mut self) -> Result<(), MotorError> {
        self.enable()?;
        write_duty(&mut self.r_pwm, DutyCycle::OFF)?;
        write_duty(&mut self.l_pwm, DutyCycle::OFF)
    }

    fn enable(&mut self) -> Result<(), MotorError> {
        self.r_enable.set_high().map_err(|_| MotorError::PinError)?;
        self.l_enable.set_high().map_err(|_| MotorError::PinError)
    }
}

fn write_duty<P: SetDutyCycle>(pwm: &mut P, duty: DutyCycle) -> Result<(), MotorError> {
    let max = pwm.max_duty_cycle();
    pwm.set_duty_cycle(duty.to_duty(max))
        .map_err(|_| MotorError::PwmError)
}

impl<REN, LEN, RPWM, LPWM> Transport for MotorDriver<REN, LEN, RPWM, LPWM>
where
    REN: OutputPin,
    LEN: OutputPin,
    RPWM: SetDutyCycle,
    LPWM: SetDutyCycle,
{
    fn forward(&mut self, speed: f32) -> Result<(), MotorError> {
        let duty = DutyCycle::clamped(speed);
        self.enable()?;
        write_duty(&mut self.l_pwm, DutyCycle::OFF)?;
        write_duty(&mut self.r_pwm, duty)
    }

    fn backward(&mut self, speed: f32) -> Result<(), MotorError> {
        let duty = DutyCycle::clamped(speed);
        self.enable()?;
        write_duty(&mut self.r_pwm, DutyCycle::OFF)?;
        write_duty(&mut self.l_pwm, duty)
    }

    fn stop(&mut self, mode: StopMode) -> Result<(), MotorError> {
        match mode {
            StopMode::Coast => self.coast(),
            StopMode::Brake => self.brake(),
        }
    }
}
