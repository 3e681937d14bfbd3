//! Error types for transport-motion.
//!
//! Provides unified error handling across configuration, motor output,
//! homing, closed-loop travel and the stepper command queue.

use core::fmt;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all transport-motion operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Motor or sensor I/O error
    Motor(MotorError),
    /// Homing procedure error
    Homing(HomingError),
    /// Closed-loop travel error
    Travel(TravelError),
    /// Stepper queue error
    Stepper(StepperError),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Travel per encoder revolution must be > 0
    InvalidMmPerRev(f32),
    /// Direction sign must be +1 or -1
    InvalidDirectionSign(i8),
    /// A speed (duty cycle) outside (0, 1]
    InvalidSpeed {
        /// Name of the offending field
        field: &'static str,
        /// Configured value
        value: f32,
    },
    /// A timeout or interval that must be > 0
    InvalidDuration {
        /// Name of the offending field
        field: &'static str,
        /// Configured value in seconds
        value: f32,
    },
    /// Arrival tolerance must be > 0
    InvalidTolerance(f32),
    /// Slow zone must be >= 0
    InvalidSlowZone(f32),
    /// Stepper delay bounds are inverted or non-positive
    InvalidDelayRange {
        /// Minimum inter-pulse delay in seconds
        min: f32,
        /// Maximum inter-pulse delay in seconds
        max: f32,
    },
    /// Stepper step cap must be >= 1
    InvalidMaxSteps,
    /// Telemetry needs at least one port pattern
    NoPortPatterns,
    /// A port pattern is not a valid glob (std only)
    #[cfg(feature = "std")]
    InvalidPortPattern(heapless::String<32>),
    /// Two stations share the same id
    DuplicateStation(u32),
    /// Station side must be `L` or `R`
    InvalidSide(heapless::String<8>),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Motor and sensor I/O errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotorError {
    /// Digital output operation failed
    PinError,
    /// PWM duty cycle update failed
    PwmError,
    /// Reference sensor could not be read
    SensorError,
}

/// Homing phase in which a failure occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingPhase {
    /// Driving toward the reference sensor
    Approach,
    /// Backing off until the sensor releases
    Release,
    /// Slow re-approach to the precise contact point
    Contact,
}

/// Homing procedure errors.
#[derive(Debug, Clone, PartialEq)]
pub enum HomingError {
    /// The run was cancelled by the caller
    Cancelled,
    /// The sensor did not change state in time
    Timeout {
        /// Phase that timed out
        phase: HomingPhase,
        /// Elapsed time in milliseconds when the timeout was detected
        after_ms: u64,
    },
    /// No valid encoder reading was available to commit the reference
    NoEncoderData(heapless::String<64>),
    /// Motor or sensor I/O failed during the run
    Motor(MotorError),
    /// The procedure panicked; the motor was stopped
    Panicked,
}

/// Leg of a station-to-station move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Leg {
    /// Travel to the pickup station
    Pickup,
    /// Travel to the dropoff station
    Dropoff,
}

/// Closed-loop travel errors.
#[derive(Debug, Clone, PartialEq)]
pub enum TravelError {
    /// The axis has no home reference yet
    NotHomed,
    /// No encoder reading was available when travel started
    NoPosition,
    /// Target not reached within the timeout; the motor was braked
    Timeout {
        /// Requested target in millimetres
        target_mm: f32,
        /// Last position observed, if any
        last_mm: Option<f32>,
    },
    /// Station id not present in the station table
    UnknownStation(u32),
    /// One leg of a station move timed out
    LegTimeout {
        /// Which leg failed
        leg: Leg,
        /// Station id of that leg
        station: u32,
    },
    /// Motor output failed during travel
    Motor(MotorError),
}

/// Stepper command queue errors.
#[derive(Debug, Clone, PartialEq)]
pub enum StepperError {
    /// Direction text was not `forward` or `backward`
    InvalidDirection(heapless::String<16>),
    /// The queue worker has been shut down
    ShutDown,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Motor(e) => write!(f, "Motor error: {}", e),
            Error::Homing(e) => write!(f, "Homing error: {}", e),
            Error::Travel(e) => write!(f, "Travel error: {}", e),
            Error::Stepper(e) => write!(f, "Stepper error: {}", e),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidMmPerRev(v) => write!(f, "Invalid mm_per_rev: {}. Must be > 0", v),
            ConfigError::InvalidDirectionSign(v) => {
                write!(f, "Invalid direction_sign: {}. Must be 1 or -1", v)
            }
            ConfigError::InvalidSpeed { field, value } => {
                write!(f, "Invalid speed {} = {}. Must be in (0, 1]", field, value)
            }
            ConfigError::InvalidDuration { field, value } => {
                write!(f, "Invalid duration {} = {}s. Must be > 0", field, value)
            }
            ConfigError::InvalidTolerance(v) => write!(f, "Invalid tolerance_mm: {}. Must be > 0", v),
            ConfigError::InvalidSlowZone(v) => write!(f, "Invalid slow_zone_mm: {}. Must be >= 0", v),
            ConfigError::InvalidDelayRange { min, max } => {
                write!(f, "Invalid stepper delay range: min ({}) must be > 0 and <= max ({})", min, max)
            }
            ConfigError::InvalidMaxSteps => write!(f, "Invalid max_steps: must be >= 1"),
            ConfigError::NoPortPatterns => write!(f, "Telemetry needs at least one port pattern"),
            #[cfg(feature = "std")]
            ConfigError::InvalidPortPattern(p) => write!(f, "Invalid port pattern '{}'", p),
            ConfigError::DuplicateStation(id) => write!(f, "Duplicate station id: {}", id),
            ConfigError::InvalidSide(s) => write!(f, "Invalid station side '{}'. Must be L or R", s),
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::PinError => write!(f, "GPIO pin operation failed"),
            MotorError::PwmError => write!(f, "PWM duty cycle update failed"),
            MotorError::SensorError => write!(f, "Reference sensor read failed"),
        }
    }
}

impl fmt::Display for HomingPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomingPhase::Approach => write!(f, "approach"),
            HomingPhase::Release => write!(f, "release"),
            HomingPhase::Contact => write!(f, "contact"),
        }
    }
}

impl fmt::Display for HomingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomingError::Cancelled => write!(f, "Homing cancelled by user"),
            HomingError::Timeout { phase, after_ms } => {
                write!(f, "Homing timeout in {} phase after {} ms", phase, after_ms)
            }
            HomingError::NoEncoderData(msg) => write!(f, "No encoder data during homing: {}", msg),
            HomingError::Motor(e) => write!(f, "{}", e),
            HomingError::Panicked => write!(f, "Homing procedure panicked"),
        }
    }
}

impl fmt::Display for Leg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Leg::Pickup => write!(f, "pickup"),
            Leg::Dropoff => write!(f, "dropoff"),
        }
    }
}

impl fmt::Display for TravelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TravelError::NotHomed => write!(f, "Axis is not homed"),
            TravelError::NoPosition => write!(f, "Encoder not available at start of travel"),
            TravelError::Timeout { target_mm, last_mm } => match last_mm {
                Some(last) => write!(f, "Timeout travelling to {} mm (last position {} mm)", target_mm, last),
                None => write!(f, "Timeout travelling to {} mm (no position)", target_mm),
            },
            TravelError::UnknownStation(id) => write!(f, "Station {} not found", id),
            TravelError::LegTimeout { leg, station } => {
                write!(f, "Timeout on {} leg to station {}", leg, station)
            }
            TravelError::Motor(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Display for StepperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepperError::InvalidDirection(s) => {
                write!(f, "Invalid direction '{}'. Must be 'forward' or 'backward'", s)
            }
            StepperError::ShutDown => write!(f, "Stepper queue is shut down"),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<MotorError> for Error {
    fn from(e: MotorError) -> Self {
        Error::Motor(e)
    }
}

impl From<HomingError> for Error {
    fn from(e: HomingError) -> Self {
        Error::Homing(e)
    }
}

impl From<TravelError> for Error {
    fn from(e: TravelError) -> Self {
        Error::Travel(e)
    }
}

impl From<StepperError> for Error {
    fn from(e: StepperError) -> Self {
        Error::Stepper(e)
    }
}

impl From<MotorError> for HomingError {
    fn from(e: MotorError) -> Self {
        HomingError::Motor(e)
    }
}

impl From<MotorError> for TravelError {
    fn from(e: MotorError) -> Self {
        TravelError::Motor(e)
    }
}

/// Copy a message into a fixed-capacity string, truncating on a char boundary.
pub(crate) fn truncated<const N: usize>(msg: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in msg.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for MotorError {}

#[cfg(feature = "std")]
impl std::error::Error for HomingError {}

#[cfg(feature = "std")]
impl std::error::Error for TravelError {}

#[cfg(feature = "std")]
impl std::error::Error for StepperError {}
