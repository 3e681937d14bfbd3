//! Position module for transport-motion.
//!
//! Unwraps the bounded encoder angle into a continuous angle and converts it
//! into a signed linear position relative to the home reference.

mod state;
#[cfg(feature = "std")]
mod tracker;
mod unwrap;

pub use state::TrackerState;
#[cfg(feature = "std")]
pub use tracker::PositionTracker;
pub use unwrap::UnwrapState;
