//! Motor module for transport-motion.
//!
//! Hardware-facing drivers: the H-bridge transport motor, the reference
//! end-stop sensor and the stepper pulse driver.

mod driver;
mod sensor;
mod stepper;
mod transport;

pub use driver::MotorDriver;
pub use sensor::{EndStop, ReferenceSensor};
pub use stepper::StepperDriver;
pub use transport::{StopMode, Transport};
