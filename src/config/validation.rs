//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::{HomingConfig, StepperConfig, SystemConfig, TelemetryConfig, TransportConfig, TravelConfig};

/// Validate a system configuration.
///
/// Checks:
/// - Calibration is physically meaningful
/// - Speeds are duty cycles in (0, 1]
/// - Timeouts, tolerances and intervals are positive
/// - Stepper bounds are ordered
/// - Station ids are unique
pub fn validate_config(config: &SystemConfig) -> Result<()> {
    validate_transport(&config.transport)?;
    validate_homing(&config.homing)?;
    validate_travel(&config.travel)?;
    validate_telemetry(&config.telemetry)?;
    validate_stepper(&config.stepper)?;

    for (i, station) in config.stations.iter().enumerate() {
        if config.stations[..i].iter().any(|s| s.id == station.id) {
            return Err(Error::Config(ConfigError::DuplicateStation(station.id)));
        }
    }

    Ok(())
}

fn speed(field: &'static str, value: f32) -> Result<()> {
    if value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(Error::Config(ConfigError::InvalidSpeed { field, value }))
    }
}

fn positive(field: &'static str, value: f32) -> Result<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(Error::Config(ConfigError::InvalidDuration { field, value }))
    }
}

fn validate_transport(config: &TransportConfig) -> Result<()> {
    if config.mm_per_rev.is_nan() || config.mm_per_rev <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidMmPerRev(config.mm_per_rev)));
    }
    if config.direction_sign != 1 && config.direction_sign != -1 {
        return Err(Error::Config(ConfigError::InvalidDirectionSign(config.direction_sign)));
    }
    Ok(())
}

fn validate_homing(config: &HomingConfig) -> Result<()> {
    speed("homing.speed", config.speed)?;
    speed("homing.fast_speed", config.fast_speed)?;
    speed("homing.slow_speed", config.slow_speed)?;
    positive("homing.timeout_s", config.timeout_s)?;
    positive("homing.approach_timeout_s", config.approach_timeout_s)?;
    positive("homing.poll_interval_ms", config.poll_interval_ms as f32)?;
    // Zero settle/pause is allowed, negative is not.
    if config.settle_s < 0.0 {
        return Err(Error::Config(ConfigError::InvalidDuration {
            field: "homing.settle_s",
            value: config.settle_s,
        }));
    }
    if config.pause_s < 0.0 {
        return Err(Error::Config(ConfigError::InvalidDuration {
            field: "homing.pause_s",
            value: config.pause_s,
        }));
    }
    Ok(())
}

fn validate_travel(config: &TravelConfig) -> Result<()> {
    speed("travel.speed", config.speed)?;
    speed("travel.slow_speed", config.slow_speed)?;
    positive("travel.timeout_s", config.timeout_s)?;
    positive("travel.loop_interval_ms", config.loop_interval_ms as f32)?;
    positive("travel.retry_interval_ms", config.retry_interval_ms as f32)?;
    if config.tolerance_mm.is_nan() || config.tolerance_mm <= 0.0 {
        return Err(Error::Config(ConfigError::InvalidTolerance(config.tolerance_mm)));
    }
    if config.slow_zone_mm.is_nan() || config.slow_zone_mm < 0.0 {
        return Err(Error::Config(ConfigError::InvalidSlowZone(config.slow_zone_mm)));
    }
    Ok(())
}

fn validate_telemetry(config: &TelemetryConfig) -> Result<()> {
    if config.port_patterns.is_empty() {
        return Err(Error::Config(ConfigError::NoPortPatterns));
    }
    validate_port_patterns(config)?;
    positive("telemetry.baud_rate", config.baud_rate as f32)?;
    positive("telemetry.read_timeout_ms", config.read_timeout_ms as f32)?;
    positive("telemetry.reconnect_backoff_ms", config.reconnect_backoff_ms as f32)?;
    Ok(())
}

#[cfg(feature = "std")]
fn validate_port_patterns(config: &TelemetryConfig) -> Result<()> {
    match config
        .port_patterns
        .iter()
        .find(|p| glob::Pattern::new(p.as_str()).is_err())
    {
        Some(bad) => Err(Error::Config(ConfigError::InvalidPortPattern(bad.clone()))),
        None => Ok(()),
    }
}

#[cfg(not(feature = "std"))]
fn validate_port_patterns(_config: &TelemetryConfig) -> Result<()> {
    Ok(())
}

pub(crate) fn validate_stepper(config: &StepperConfig) -> Result<()> {
    if config.max_steps == 0 {
        return Err(Error::Config(ConfigError::InvalidMaxSteps));
    }
    if config.min_delay_s.is_nan() || config.min_delay_s <= 0.0 || config.min_delay_s > config.max_delay_s {
        return Err(Error::Config(ConfigError::InvalidDelayRange {
            min: config.min_delay_s,
            max: config.max_delay_s,
        }));
    }
    Ok(())
}
