//! Simulated transport hardware shared by the integration tests.
//!
//! The belt advances a fixed distance in the commanded direction every time
//! the encoder or the end-stop is read, so control loops see one step of
//! motion per tick regardless of wall-clock timing.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::{Arc, Mutex};

use embedded_hal::digital::{ErrorType, OutputPin};
use transport_motion::error::MotorError;
use transport_motion::{AngleSource, Direction, ReferenceSensor, StopMode, TelemetrySnapshot, Transport};

/// Belt travel per revolution of the encoder wheel.
pub const MM_PER_REV: f64 = 90.19;

#[derive(Debug, Clone, Copy)]
pub struct BeltState {
    pub position_mm: f64,
    pub step_mm: f64,
    pub heading: Option<Direction>,
    pub last_stop: Option<StopMode>,
    pub sensor_working: bool,
    pub encoder_online: bool,
    pub angle_offset_deg: f64,
    pub drive_calls: u32,
}

/// Handle to one simulated belt; clones share the belt.
#[derive(Debug, Clone)]
pub struct SimBelt(Arc<Mutex<BeltState>>);

impl SimBelt {
    pub fn at(position_mm: f64) -> Self {
        Self(Arc::new(Mutex::new(BeltState {
            position_mm,
            step_mm: 1.0,
            heading: None,
            last_stop: None,
            sensor_working: true,
            encoder_online: true,
            angle_offset_deg: 37.0,
            drive_calls: 0,
        })))
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut BeltState) -> R) -> R {
        f(&mut self.0.lock().unwrap())
    }

    pub fn position_mm(&self) -> f64 {
        self.with(|b| b.position_mm)
    }

    pub fn is_driving(&self) -> bool {
        self.with(|b| b.heading.is_some())
    }

    fn tick(&self) -> BeltState {
        self.with(|b| {
            if let Some(direction) = b.heading {
                b.position_mm += b.step_mm * direction.sign() as f64;
            }
            *b
        })
    }
}

impl Transport for SimBelt {
    fn forward(&mut self, _speed: f32) -> Result<(), MotorError> {
        self.with(|b| {
            b.heading = Some(Direction::Forward);
            b.drive_calls += 1;
        });
        Ok(())
    }

    fn backward(&mut self, _speed: f32) -> Result<(), MotorError> {
        self.with(|b| {
            b.heading = Some(Direction::Backward);
            b.drive_calls += 1;
        });
        Ok(())
    }

    fn stop(&mut self, mode: StopMode) -> Result<(), MotorError> {
        self.with(|b| {
            b.heading = None;
            b.last_stop = Some(mode);
        });
        Ok(())
    }
}

impl ReferenceSensor for SimBelt {
    /// Active at or behind the home end of the belt.
    fn is_active(&mut self) -> Result<bool, MotorError> {
        let belt = self.tick();
        Ok(belt.sensor_working && belt.position_mm <= 0.0)
    }
}

impl AngleSource for SimBelt {
    fn latest(&self) -> TelemetrySnapshot {
        let belt = self.tick();
        if !belt.encoder_online {
            return TelemetrySnapshot {
                error: Some("no serial port found".into()),
                ..TelemetrySnapshot::default()
            };
        }
        let degrees = belt.position_mm / MM_PER_REV * 360.0 + belt.angle_offset_deg;
        TelemetrySnapshot {
            angle_deg: Some(degrees.rem_euclid(360.0) as f32),
            aux_raw: Some(0),
            ok: true,
            ..TelemetrySnapshot::default()
        }
    }
}

/// Log of `(pin, level)` writes shared by a set of [`LogPin`]s.
pub type PinLog = Arc<Mutex<Vec<(&'static str, bool)>>>;

/// Output pin that appends every write to a shared log.
pub struct LogPin(pub &'static str, pub PinLog);

impl ErrorType for LogPin {
    type Error = Infallible;
}

impl OutputPin for LogPin {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.1.lock().unwrap().push((self.0, false));
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.1.lock().unwrap().push((self.0, true));
        Ok(())
    }
}

pub fn pulses(log: &PinLog) -> usize {
    log.lock()
        .unwrap()
        .iter()
        .filter(|&&(pin, high)| pin == "PUL" && high)
        .count()
}
