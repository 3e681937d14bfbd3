//! Motion module for transport-motion.
//!
//! Direction handling and the threshold-based speed selection used by the
//! closed-loop controller.

mod control;
mod direction;

pub use control::{SpeedSelector, TravelCommand};
pub use direction::Direction;
