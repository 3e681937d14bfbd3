//! Stepper module for transport-motion (std only).
//!
//! A FIFO command queue for an open-loop step/direction actuator. Moves run
//! one at a time on a dedicated worker thread; `stop()` is best-effort and
//! takes effect between pulses.

mod builder;
mod command;
mod delay;
mod queue;

pub use builder::StepCommandQueueBuilder;
pub use command::StepCommand;
pub use delay::ThreadDelay;
pub use queue::StepCommandQueue;
