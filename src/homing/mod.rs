//! Homing module for transport-motion (std only).
//!
//! Establishes the absolute zero of the axis by driving toward the reference
//! sensor and committing the encoder angle at contact. Two procedures exist:
//! a coarse single-speed approach and a precise three-phase approach. The
//! [`HomingSession`] runs either one on a background thread with cooperative
//! cancellation.

mod outcome;
mod procedure;
mod session;

pub use crate::config::HomingStrategy;
pub use outcome::{HomingOutcome, HomingState, HomingStatus};
pub use procedure::{run_strategy, single_speed, three_phase, HomingContext};
pub use session::HomingSession;
