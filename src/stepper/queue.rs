//! Stepper command queue and worker.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use tracing::{debug, info, warn};

use crate::config::StepperConfig;
use crate::error::{MotorError, StepperError};
use crate::motion::Direction;
use crate::motor::StepperDriver;
use crate::shared::Shared;

use super::command::StepCommand;

#[derive(Default)]
struct QueueState {
    /// Bumped by every stop; moves from an older epoch are skipped.
    epoch: AtomicU64,
    stops_observed: AtomicU64,
    accepted: AtomicU64,
    finished: AtomicU64,
    busy: AtomicBool,
    shut_down: AtomicBool,
}

impl QueueState {
    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }
}

/// Serializes open-loop stepper moves on a worker thread.
///
/// Enqueueing never blocks. Exactly one command executes at a time, in FIFO
/// order. The enable line is shared with the worker so `stop()` can drop it
/// from the caller's thread immediately.
pub struct StepCommandQueue<ENA>
where
    ENA: OutputPin + Send + 'static,
{
    tx: Option<Sender<StepCommand>>,
    rx: Receiver<StepCommand>,
    enable: Shared<ENA>,
    state: Arc<QueueState>,
    worker: Option<JoinHandle<()>>,
    config: StepperConfig,
}

impl<ENA> StepCommandQueue<ENA>
where
    ENA: OutputPin + Send + 'static,
{
    pub(crate) fn spawn<PUL, DIR, DELAY>(
        driver: StepperDriver<PUL, DIR, DELAY>,
        enable: ENA,
        config: StepperConfig,
    ) -> io::Result<Self>
    where
        PUL: OutputPin + Send + 'static,
        DIR: OutputPin + Send + 'static,
        DELAY: DelayNs + Send + 'static,
    {
        let (tx, rx) = crossbeam_channel::unbounded();
        let enable = Shared::new(enable);
        let state = Arc::new(QueueState::default());

        let worker = {
            let rx = rx.clone();
            let enable = enable.clone();
            let state = Arc::clone(&state);
            thread::Builder::new()
                .name("stepper-queue".into())
                .spawn(move || work(driver, &enable, &rx, &state, &config))?
        };

        Ok(Self {
            tx: Some(tx),
            rx,
            enable,
            state,
            worker: Some(worker),
            config,
        })
    }

    /// Limits and timing in use.
    pub fn config(&self) -> &StepperConfig {
        &self.config
    }

    /// Queue a move. `steps` is clamped to `[1, max_steps]` and `delay_s` to
    /// `[min_delay_s, max_delay_s]`.
    pub fn move_steps(&self, direction: Direction, steps: i64, delay_s: f32) -> Result<(), StepperError> {
        let tx = self.sender()?;
        let command = StepCommand::Move {
            direction,
            steps: self.config.clamp_steps(steps),
            half_period: self.config.clamp_delay(delay_s),
            epoch: self.state.epoch(),
        };
        self.send(tx, command)?;
        debug!(?command, "stepper move queued");
        Ok(())
    }

    /// Queue a move named by text (`"forward"` or `"backward"`).
    ///
    /// Invalid direction text is rejected before anything is queued.
    pub fn submit(&self, direction: &str, steps: i64, delay_s: f32) -> Result<(), StepperError> {
        let direction: Direction = direction.parse()?;
        self.move_steps(direction, steps, delay_s)
    }

    /// Best-effort stop.
    ///
    /// The in-flight move stops before its next pulse, queued moves are
    /// discarded, the driver is disabled and a stop marker is queued.
    pub fn stop(&self) {
        let epoch = self.state.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        let dropped = self.drain();
        if let Err(e) = set_enabled(&self.enable, false) {
            warn!(error = %e, "failed to disable stepper driver");
        }
        if let Ok(tx) = self.sender() {
            let _ = self.send(tx, StepCommand::Stop);
        }
        info!(epoch, dropped, "stepper stop requested");
    }

    /// Stop the worker permanently and disable the driver.
    ///
    /// Idempotent. The worker drops the pulse and direction pins on exit.
    pub fn shutdown(&mut self) {
        let Some(tx) = self.tx.take() else {
            return;
        };
        self.state.shut_down.store(true, Ordering::Release);
        self.state.epoch.fetch_add(1, Ordering::AcqRel);
        self.drain();
        drop(tx);

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("stepper worker panicked");
            }
        }
        if let Err(e) = set_enabled(&self.enable, false) {
            warn!(error = %e, "failed to disable stepper driver");
        }
        info!("stepper queue shut down");
    }

    /// Commands waiting to start.
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Whether a move is executing.
    pub fn is_busy(&self) -> bool {
        self.state.busy.load(Ordering::Acquire)
    }

    /// Number of `stop()` calls so far.
    pub fn stops_requested(&self) -> u64 {
        self.state.epoch()
    }

    /// Number of stop markers the worker has executed.
    pub fn stops_observed(&self) -> u64 {
        self.state.stops_observed.load(Ordering::Acquire)
    }

    /// Whether `shutdown()` has run.
    pub fn is_shut_down(&self) -> bool {
        self.state.shut_down.load(Ordering::Acquire)
    }

    /// Block until every accepted command has finished or been discarded.
    ///
    /// Returns `false` on timeout.
    pub fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let accepted = self.state.accepted.load(Ordering::Acquire);
            if self.state.finished.load(Ordering::Acquire) >= accepted {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            thread::sleep(Duration::from_millis(1));
        }
    }

    fn sender(&self) -> Result<&Sender<StepCommand>, StepperError> {
        match &self.tx {
            Some(tx) if !self.is_shut_down() => Ok(tx),
            _ => Err(StepperError::ShutDown),
        }
    }

    fn send(&self, tx: &Sender<StepCommand>, command: StepCommand) -> Result<(), StepperError> {
        self.state.accepted.fetch_add(1, Ordering::AcqRel);
        tx.send(command).map_err(|_| {
            self.state.finished.fetch_add(1, Ordering::AcqRel);
            StepperError::ShutDown
        })
    }

    fn drain(&self) -> usize {
        let dropped = self.rx.try_iter().count();
        self.state.finished.fetch_add(dropped as u64, Ordering::AcqRel);
        dropped
    }
}

impl<ENA> Drop for StepCommandQueue<ENA>
where
    ENA: OutputPin + Send + 'static,
{
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn set_enabled<ENA: OutputPin>(enable: &Shared<ENA>, on: bool) -> Result<(), MotorError> {
    enable
        .with(|pin| if on { pin.set_high() } else { pin.set_low() })
        .map_err(|_| MotorError::PinError)
}

fn work<PUL, DIR, DELAY, ENA>(
    mut driver: StepperDriver<PUL, DIR, DELAY>,
    enable: &Shared<ENA>,
    rx: &Receiver<StepCommand>,
    state: &QueueState,
    config: &StepperConfig,
) where
    PUL: OutputPin,
    DIR: OutputPin,
    DELAY: DelayNs,
    ENA: OutputPin,
{
    for command in rx.iter() {
        if command.is_stale(state.epoch()) {
            debug!(?command, "skipping move cancelled by stop");
        } else {
            match command {
                StepCommand::Move {
                    direction,
                    steps,
                    half_period,
                    epoch,
                } => {
                    state.busy.store(true, Ordering::Release);
                    let keep_going = || state.epoch() == epoch;
                    match execute_move(&mut driver, enable, config, direction, steps, half_period, keep_going) {
                        Ok(emitted) if emitted < steps => {
                            info!(emitted, steps, "stepper move interrupted")
                        }
                        Ok(emitted) => debug!(emitted, direction = direction.as_str(), "stepper move done"),
                        Err(e) => warn!(error = %e, "stepper move failed"),
                    }
                    let _ = set_enabled(enable, false);
                    state.busy.store(false, Ordering::Release);
                }
                StepCommand::Stop => {
                    if let Err(e) = set_enabled(enable, false) {
                        warn!(error = %e, "failed to disable stepper driver");
                    }
                    state.stops_observed.fetch_add(1, Ordering::AcqRel);
                }
            }
        }
        state.finished.fetch_add(1, Ordering::AcqRel);
    }

    let _ = set_enabled(enable, false);
    debug!("stepper worker exited");
}

fn execute_move<PUL, DIR, DELAY, ENA, F>(
    driver: &mut StepperDriver<PUL, DIR, DELAY>,
    enable: &Shared<ENA>,
    config: &StepperConfig,
    direction: Direction,
    steps: u32,
    half_period: Duration,
    keep_going: F,
) -> Result<u32, MotorError>
where
    PUL: OutputPin,
    DIR: OutputPin,
    DELAY: DelayNs,
    ENA: OutputPin,
    F: FnMut() -> bool,
{
    set_enabled(enable, true)?;
    driver.wait(config.enable_settle());
    if driver.set_direction(direction)? {
        driver.wait(config.enable_settle());
    }
    driver.run(steps, half_period, keep_going)
}
