//! Builder pattern for StepCommandQueue.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::{validate_stepper, StepperConfig, SystemConfig};
use crate::error::{truncated, ConfigError, Error, Result};
use crate::motor::StepperDriver;

use super::queue::StepCommandQueue;

/// Builder for creating StepCommandQueue instances.
pub struct StepCommandQueueBuilder<PUL, DIR, ENA, DELAY>
where
    PUL: OutputPin + Send + 'static,
    DIR: OutputPin + Send + 'static,
    ENA: OutputPin + Send + 'static,
    DELAY: DelayNs + Send + 'static,
{
    pulse_pin: Option<PUL>,
    dir_pin: Option<DIR>,
    enable_pin: Option<ENA>,
    delay: Option<DELAY>,
    config: StepperConfig,
}

impl<PUL, DIR, ENA, DELAY> Default for StepCommandQueueBuilder<PUL, DIR, ENA, DELAY>
where
    PUL: OutputPin + Send + 'static,
    DIR: OutputPin + Send + 'static,
    ENA: OutputPin + Send + 'static,
    DELAY: DelayNs + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<PUL, DIR, ENA, DELAY> StepCommandQueueBuilder<PUL, DIR, ENA, DELAY>
where
    PUL: OutputPin + Send + 'static,
    DIR: OutputPin + Send + 'static,
    ENA: OutputPin + Send + 'static,
    DELAY: DelayNs + Send + 'static,
{
    /// Create a new builder with default limits.
    pub fn new() -> Self {
        Self {
            pulse_pin: None,
            dir_pin: None,
            enable_pin: None,
            delay: None,
            config: StepperConfig::default(),
        }
    }

    /// Set the PUL pin.
    pub fn pulse_pin(mut self, pin: PUL) -> Self {
        self.pulse_pin = Some(pin);
        self
    }

    /// Set the DIR pin.
    pub fn dir_pin(mut self, pin: DIR) -> Self {
        self.dir_pin = Some(pin);
        self
    }

    /// Set the ENA pin.
    pub fn enable_pin(mut self, pin: ENA) -> Self {
        self.enable_pin = Some(pin);
        self
    }

    /// Set the delay provider used for pulse timing.
    pub fn delay(mut self, delay: DELAY) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set direction inversion.
    pub fn invert_direction(mut self, invert: bool) -> Self {
        self.config.invert_direction = invert;
        self
    }

    /// Use the given limits and timing.
    pub fn stepper_config(mut self, config: StepperConfig) -> Self {
        self.config = config;
        self
    }

    /// Configure from the `[stepper]` section of a SystemConfig.
    pub fn from_config(self, config: &SystemConfig) -> Self {
        self.stepper_config(config.stepper)
    }

    /// Build the queue and start its worker.
    ///
    /// # Errors
    ///
    /// Returns an error if a pin or the delay is missing, the limits are
    /// invalid, or the worker thread cannot be spawned.
    pub fn build(self) -> Result<StepCommandQueue<ENA>> {
        let pulse_pin = self.pulse_pin.ok_or_else(|| missing("pulse_pin is required"))?;
        let dir_pin = self.dir_pin.ok_or_else(|| missing("dir_pin is required"))?;
        let enable_pin = self.enable_pin.ok_or_else(|| missing("enable_pin is required"))?;
        let delay = self.delay.ok_or_else(|| missing("delay is required"))?;
        validate_stepper(&self.config)?;

        let driver = StepperDriver::new(pulse_pin, dir_pin, delay, self.config.invert_direction);
        StepCommandQueue::spawn(driver, enable_pin, self.config)
            .map_err(|e| Error::Config(ConfigError::IoError(truncated(&e.to_string()))))
    }
}

fn missing(what: &str) -> Error {
    Error::Config(ConfigError::ParseError(truncated(what)))
}
