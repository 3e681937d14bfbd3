//! Homing procedures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::{HomingConfig, HomingStrategy};
use crate::error::{truncated, HomingError, HomingPhase};
use crate::motor::{ReferenceSensor, StopMode, Transport};
use crate::position::PositionTracker;
use crate::telemetry::AngleSource;

/// Everything a homing procedure touches.
pub struct HomingContext<'a, M, S, A> {
    /// Transport motor.
    pub motor: &'a mut M,
    /// End-stop sensor.
    pub sensor: &'a mut S,
    /// Encoder angle source.
    pub source: &'a A,
    /// Tracker that receives the home reference.
    pub tracker: &'a PositionTracker,
    /// Speeds, timeouts and direction.
    pub config: &'a HomingConfig,
    /// Cooperative cancellation flag, checked at every poll.
    pub cancel: &'a AtomicBool,
}

impl<M, S, A> HomingContext<'_, M, S, A>
where
    M: Transport,
    S: ReferenceSensor,
    A: AngleSource,
{
    /// Poll until the sensor reads `active`.
    ///
    /// Each iteration checks cancellation, then the sensor, then the phase
    /// timeout.
    fn wait_for_sensor(
        &mut self,
        active: bool,
        timeout: Duration,
        phase: HomingPhase,
    ) -> Result<(), HomingError> {
        let started = Instant::now();
        let poll = self.config.poll_interval();
        loop {
            if self.cancel.load(Ordering::Acquire) {
                return Err(HomingError::Cancelled);
            }
            if self.sensor.is_active()? == active {
                debug!(%phase, elapsed_ms = started.elapsed().as_millis() as u64, "sensor reached");
                return Ok(());
            }
            let elapsed = started.elapsed();
            if elapsed >= timeout {
                return Err(HomingError::Timeout {
                    phase,
                    after_ms: elapsed.as_millis() as u64,
                });
            }
            thread::sleep(poll);
        }
    }

    /// Read the encoder and commit it as the home reference.
    fn commit(&mut self) -> Result<f64, HomingError> {
        let snapshot = self.source.latest();
        match snapshot.angle() {
            Some(angle) => Ok(self.tracker.set_home(angle)),
            None => {
                let reason = snapshot.error.as_deref().unwrap_or("no angle in snapshot");
                Err(HomingError::NoEncoderData(truncated(reason)))
            }
        }
    }

    fn brake_and_pause(&mut self) -> Result<(), HomingError> {
        self.motor.stop(StopMode::Brake)?;
        thread::sleep(self.config.pause());
        Ok(())
    }
}

/// Coarse homing: drive toward the sensor at one speed, coast, settle and
/// commit the encoder angle.
///
/// The motor is coasted on every exit path. Returns the committed continuous
/// home angle.
pub fn single_speed<M, S, A>(ctx: &mut HomingContext<'_, M, S, A>) -> Result<f64, HomingError>
where
    M: Transport,
    S: ReferenceSensor,
    A: AngleSource,
{
    let result = approach_and_settle(ctx);
    if result.is_err() {
        let _ = ctx.motor.stop(StopMode::Coast);
    }
    result
}

/// Precise homing: fast approach, back off until the sensor releases, then a
/// slow re-approach whose contact point becomes the home reference.
///
/// Every phase is bounded by `approach_timeout_s`. The motor is braked on
/// every exit path.
pub fn three_phase<M, S, A>(ctx: &mut HomingContext<'_, M, S, A>) -> Result<f64, HomingError>
where
    M: Transport,
    S: ReferenceSensor,
    A: AngleSource,
{
    let result = approach_release_contact(ctx);
    if result.is_err() {
        let _ = ctx.motor.stop(StopMode::Brake);
    }
    result
}

fn approach_and_settle<M, S, A>(ctx: &mut HomingContext<'_, M, S, A>) -> Result<f64, HomingError>
where
    M: Transport,
    S: ReferenceSensor,
    A: AngleSource,
{
    ctx.motor.drive(ctx.config.direction, ctx.config.speed)?;
    ctx.wait_for_sensor(true, ctx.config.timeout(), HomingPhase::Approach)?;
    ctx.motor.stop(StopMode::Coast)?;
    thread::sleep(ctx.config.settle());
    ctx.commit()
}

fn approach_release_contact<M, S, A>(
    ctx: &mut HomingContext<'_, M, S, A>,
) -> Result<f64, HomingError>
where
    M: Transport,
    S: ReferenceSensor,
    A: AngleSource,
{
    let toward = ctx.config.direction;
    let timeout = ctx.config.approach_timeout();

    ctx.motor.drive(toward, ctx.config.fast_speed)?;
    ctx.wait_for_sensor(true, timeout, HomingPhase::Approach)?;
    ctx.brake_and_pause()?;

    // Zero the tracker before backing off; the contact angle is committed
    // against fresh unwrap history.
    ctx.tracker.reset();
    ctx.motor.drive(toward.reversed(), ctx.config.slow_speed)?;
    ctx.wait_for_sensor(false, timeout, HomingPhase::Release)?;
    ctx.brake_and_pause()?;

    ctx.motor.drive(toward, ctx.config.slow_speed)?;
    ctx.wait_for_sensor(true, timeout, HomingPhase::Contact)?;
    ctx.motor.stop(StopMode::Brake)?;
    ctx.commit()
}

/// Run the procedure named by `strategy`, logging the result.
pub fn run_strategy<M, S, A>(
    strategy: HomingStrategy,
    ctx: &mut HomingContext<'_, M, S, A>,
) -> Result<f64, HomingError>
where
    M: Transport,
    S: ReferenceSensor,
    A: AngleSource,
{
    info!(?strategy, direction = ctx.config.direction.as_str(), "homing started");
    let result = match strategy {
        HomingStrategy::SingleSpeed => single_speed(ctx),
        HomingStrategy::ThreePhase => three_phase(ctx),
    };
    match &result {
        Ok(home) => info!(home_deg = *home, "homing succeeded"),
        Err(HomingError::Cancelled) => info!("homing cancelled"),
        Err(e) => warn!(error = %e, "homing failed"),
    }
    result
}
