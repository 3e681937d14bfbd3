//! Background homing session.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::error;

use crate::config::HomingConfig;
use crate::error::HomingError;
use crate::motor::{ReferenceSensor, StopMode, Transport};
use crate::position::PositionTracker;
use crate::telemetry::AngleSource;

use super::outcome::{HomingOutcome, HomingState, HomingStatus};
use super::procedure::{run_strategy, HomingContext};

#[derive(Default)]
struct Progress {
    running: bool,
    last: Option<HomingOutcome>,
}

#[derive(Default)]
struct SessionState {
    progress: Mutex<Progress>,
    finished: Condvar,
    cancel: AtomicBool,
}

impl SessionState {
    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Asynchronous, cancelable homing.
///
/// At most one run is in flight per session. The procedure runs on its own
/// thread with cloned hardware handles; the caller only ever sees status
/// records.
pub struct HomingSession<M, S, A> {
    motor: M,
    sensor: S,
    source: A,
    tracker: Arc<PositionTracker>,
    config: HomingConfig,
    state: Arc<SessionState>,
}

impl<M, S, A> HomingSession<M, S, A>
where
    M: Transport + Clone + Send + 'static,
    S: ReferenceSensor + Clone + Send + 'static,
    A: AngleSource + Clone + Send + 'static,
{
    /// Create an idle session.
    pub fn new(
        motor: M,
        sensor: S,
        source: A,
        tracker: Arc<PositionTracker>,
        config: HomingConfig,
    ) -> Self {
        Self {
            motor,
            sensor,
            source,
            tracker,
            config,
            state: Arc::new(SessionState::default()),
        }
    }

    /// Homing parameters in use.
    pub fn config(&self) -> &HomingConfig {
        &self.config
    }

    /// Launch a run. Returns `false` without side effects if one is already
    /// running; otherwise clears the previous outcome and returns `true`
    /// immediately.
    pub fn start(&self) -> bool {
        let mut progress = self.state.lock();
        if progress.running {
            return false;
        }
        self.state.cancel.store(false, Ordering::Release);
        progress.running = true;
        let previous = progress.last.take();

        let mut motor = self.motor.clone();
        let mut sensor = self.sensor.clone();
        let source = self.source.clone();
        let tracker = Arc::clone(&self.tracker);
        let config = self.config;
        let state = Arc::clone(&self.state);

        let spawned = thread::Builder::new()
            .name("homing".into())
            .spawn(move || {
                let started = Instant::now();
                let result = panic::catch_unwind(AssertUnwindSafe(|| {
                    let mut ctx = HomingContext {
                        motor: &mut motor,
                        sensor: &mut sensor,
                        source: &source,
                        tracker: &tracker,
                        config: &config,
                        cancel: &state.cancel,
                    };
                    run_strategy(config.strategy, &mut ctx)
                }))
                .unwrap_or_else(|_| {
                    error!("homing procedure panicked, stopping motor");
                    let _ = motor.stop(StopMode::Coast);
                    Err(HomingError::Panicked)
                });

                let outcome = HomingOutcome::from_result(result, started.elapsed());
                let mut progress = state.lock();
                progress.running = false;
                progress.last = Some(outcome);
                state.finished.notify_all();
            });

        if let Err(e) = spawned {
            error!(error = %e, "failed to spawn homing thread");
            progress.running = false;
            progress.last = previous;
            return false;
        }
        true
    }

    /// Request cancellation. Returns `false` if no run is in progress.
    ///
    /// The run observes the request at its next poll.
    pub fn cancel(&self) -> bool {
        let progress = self.state.lock();
        if !progress.running {
            return false;
        }
        self.state.cancel.store(true, Ordering::Release);
        true
    }

    /// Current status.
    pub fn status(&self) -> HomingStatus {
        let progress = self.state.lock();
        let state = if progress.running {
            HomingState::Running
        } else {
            progress
                .last
                .as_ref()
                .map(|o| o.state)
                .unwrap_or(HomingState::Idle)
        };
        HomingStatus {
            running: progress.running,
            state,
            last_result: progress.last.clone(),
        }
    }

    /// Whether a run is in progress.
    pub fn is_running(&self) -> bool {
        self.state.lock().running
    }

    /// Block until the current run finishes or `timeout` elapses.
    ///
    /// Returns the last completed outcome, or `None` if a run is still in
    /// progress or none has ever completed.
    pub fn wait(&self, timeout: Duration) -> Option<HomingOutcome> {
        let progress = self.state.lock();
        let (progress, _) = self
            .state
            .finished
            .wait_timeout_while(progress, timeout, |p| p.running)
            .unwrap_or_else(PoisonError::into_inner);
        if progress.running {
            None
        } else {
            progress.last.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HomingStrategy, TransportConfig};
    use crate::error::MotorError;
    use crate::shared::Shared;
    use crate::telemetry::TelemetrySnapshot;

    #[derive(Default)]
    struct Rig {
        driving: bool,
        sensor_active: bool,
        stops: u32,
        panic_on_drive: bool,
    }

    impl Transport for Rig {
        fn forward(&mut self, _speed: f32) -> Result<(), MotorError> {
            self.backward(0.0)
        }

        fn backward(&mut self, _speed: f32) -> Result<(), MotorError> {
            if self.panic_on_drive {
                panic!("driver fault");
            }
            self.driving = true;
            Ok(())
        }

        fn stop(&mut self, _mode: StopMode) -> Result<(), MotorError> {
            self.driving = false;
            self.stops += 1;
            Ok(())
        }
    }

    impl ReferenceSensor for Rig {
        fn is_active(&mut self) -> Result<bool, MotorError> {
            Ok(self.sensor_active)
        }
    }

    #[derive(Clone)]
    struct Encoder(f32);

    impl AngleSource for Encoder {
        fn latest(&self) -> TelemetrySnapshot {
            TelemetrySnapshot {
                angle_deg: Some(self.0),
                ok: true,
                ..TelemetrySnapshot::default()
            }
        }
    }

    fn session(rig: &Shared<Rig>, timeout_s: f32) -> HomingSession<Shared<Rig>, Shared<Rig>, Encoder> {
        HomingSession::new(
            rig.clone(),
            rig.clone(),
            Encoder(90.0),
            Arc::new(PositionTracker::new(TransportConfig::default())),
            HomingConfig {
                strategy: HomingStrategy::SingleSpeed,
                timeout_s,
                settle_s: 0.0,
                poll_interval_ms: 1,
                ..HomingConfig::default()
            },
        )
    }

    #[test]
    fn test_idle_status() {
        let rig = Shared::new(Rig::default());
        let homing = session(&rig, 1.0);
        let status = homing.status();
        assert!(!status.running);
        assert_eq!(status.state, HomingState::Idle);
        assert_eq!(status.last_result, None);
        assert!(!homing.cancel());
        assert_eq!(homing.wait(Duration::ZERO), None);
    }

    #[test]
    fn test_second_start_is_rejected() {
        let rig = Shared::new(Rig::default());
        let homing = session(&rig, 5.0);
        assert!(homing.start());
        assert!(!homing.start());
        assert_eq!(homing.status().state, HomingState::Running);

        rig.with(|r| r.sensor_active = true);
        let outcome = homing.wait(Duration::from_secs(2)).unwrap();
        assert!(outcome.succeeded());
        assert_eq!(outcome.home_reference_deg, Some(90.0));
        assert!(!rig.with(|r| r.driving));
        assert_eq!(homing.status().state, HomingState::Succeeded);
    }

    #[test]
    fn test_cancel_yields_cancelled() {
        let rig = Shared::new(Rig::default());
        let homing = session(&rig, 5.0);
        assert!(homing.start());
        assert!(homing.cancel());
        let outcome = homing.wait(Duration::from_secs(2)).unwrap();
        assert!(outcome.cancelled());
        assert_eq!(outcome.error, Some(HomingError::Cancelled));
        assert!(!rig.with(|r| r.driving));
        assert!(!homing.cancel());
    }

    #[test]
    fn test_panic_is_contained() {
        let rig = Shared::new(Rig {
            panic_on_drive: true,
            ..Rig::default()
        });
        let homing = session(&rig, 1.0);
        assert!(homing.start());
        let outcome = homing.wait(Duration::from_secs(2)).unwrap();
        assert_eq!(outcome.state, HomingState::Failed);
        assert_eq!(outcome.error, Some(HomingError::Panicked));
        assert!(rig.with(|r| r.stops) >= 1);

        // The session is usable again.
        rig.with(|r| {
            r.panic_on_drive = false;
            r.sensor_active = true;
        });
        assert!(homing.start());
        assert!(homing.wait(Duration::from_secs(2)).unwrap().succeeded());
    }

    #[test]
    fn test_start_clears_previous_outcome() {
        let rig = Shared::new(Rig::default());
        let homing = session(&rig, 5.0);
        assert!(homing.start());
        assert!(homing.cancel());
        assert!(homing.wait(Duration::from_secs(2)).unwrap().cancelled());
        assert_eq!(homing.status().state, HomingState::Cancelled);

        assert!(homing.start());
        let status = homing.status();
        assert!(status.running);
        assert_eq!(status.state, HomingState::Running);
        assert_eq!(status.last_result, None);

        rig.with(|r| r.sensor_active = true);
        assert!(homing.wait(Duration::from_secs(2)).unwrap().succeeded());
        assert!(homing.status().last_result.unwrap().succeeded());
    }
}
