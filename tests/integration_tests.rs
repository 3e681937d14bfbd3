//! Integration tests for transport-motion.
//!
//! These tests drive the threaded components against a simulated belt,
//! encoder and end-stop (see `common`).

mod common;

use std::io::{self, BufReader, Cursor, Read};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use common::{pulses, LogPin, PinLog, SimBelt};
use transport_motion::config::{
    HomingConfig, HomingStrategy, StepperConfig, TelemetryConfig, TransportConfig, TravelConfig,
};
use transport_motion::error::{HomingError, HomingPhase, Leg, TravelError};
use transport_motion::stepper::ThreadDelay;
use transport_motion::telemetry::LinkSource;
use transport_motion::{
    parse_config, AngleSource, AxisController, Direction, HomingSession, HomingState, PositionTracker,
    StepCommandQueueBuilder, StopMode, Stations, TelemetryLink,
};

// =============================================================================
// Fixtures
// =============================================================================

fn travel_config() -> TravelConfig {
    TravelConfig {
        loop_interval_ms: 0,
        retry_interval_ms: 1,
        station_dwell_s: 0.0,
        timeout_s: 5.0,
        ..TravelConfig::default()
    }
}

fn homing_config() -> HomingConfig {
    HomingConfig {
        settle_s: 0.0,
        pause_s: 0.0,
        poll_interval_ms: 1,
        ..HomingConfig::default()
    }
}

fn tracker() -> Arc<PositionTracker> {
    Arc::new(PositionTracker::new(TransportConfig::default()))
}

fn axis(belt: &SimBelt, tracker: &Arc<PositionTracker>) -> AxisController<SimBelt, SimBelt, SimBelt> {
    AxisController::new(
        belt.clone(),
        belt.clone(),
        belt.clone(),
        Arc::clone(tracker),
        travel_config(),
        homing_config(),
    )
}

fn homing_session(
    belt: &SimBelt,
    tracker: &Arc<PositionTracker>,
    config: HomingConfig,
) -> HomingSession<SimBelt, SimBelt, SimBelt> {
    HomingSession::new(belt.clone(), belt.clone(), belt.clone(), Arc::clone(tracker), config)
}

// =============================================================================
// Closed-loop travel
// =============================================================================

#[test]
fn test_three_phase_home_then_goto_converges() {
    let belt = SimBelt::at(25.0);
    let tracker = tracker();
    let mut axis = axis(&belt, &tracker);

    axis.home().expect("homing should succeed");
    assert!(tracker.is_homed());
    assert_eq!(belt.position_mm(), 0.0);
    assert_eq!(belt.with(|b| b.last_stop), Some(StopMode::Brake));
    assert!(axis.current_position_mm().unwrap().abs() < 0.01);

    let final_mm = axis
        .goto_position_mm(100.0, 0.6, 2.0, 10.0, 5.0)
        .expect("travel should arrive");
    assert!((final_mm - 100.0).abs() <= 2.0, "final {final_mm}");
    assert!(!belt.is_driving());
    assert_eq!(belt.with(|b| b.last_stop), Some(StopMode::Coast));

    // The reported position tracks the belt across encoder wraps.
    let reported = axis.current_position_mm().unwrap() as f64;
    assert!((reported - belt.position_mm()).abs() < 0.01);
}

#[test]
fn test_goto_back_through_several_wraps() {
    let belt = SimBelt::at(0.0);
    let tracker = tracker();
    let mut axis = axis(&belt, &tracker);
    axis.home().unwrap();

    axis.goto(300.0).unwrap();
    let final_mm = axis.goto(5.0).unwrap();
    assert!((final_mm - 5.0).abs() <= 2.0);
    assert!((belt.position_mm() - 5.0).abs() <= 2.0);
}

#[test]
fn test_stalled_motor_times_out_and_brakes() {
    let belt = SimBelt::at(0.0);
    let tracker = tracker();
    let mut axis = axis(&belt, &tracker);
    axis.home().unwrap();
    belt.with(|b| b.step_mm = 0.0);

    let started = Instant::now();
    let result = axis.goto_position_mm(100.0, 0.6, 2.0, 10.0, 0.1);
    assert!(started.elapsed() >= Duration::from_millis(100));
    match result {
        Err(TravelError::Timeout { target_mm, last_mm }) => {
            assert_eq!(target_mm, 100.0);
            assert!(last_mm.unwrap().abs() < 0.01);
        }
        other => panic!("expected timeout, got {other:?}"),
    }
    assert!(!belt.is_driving());
    assert_eq!(belt.with(|b| b.last_stop), Some(StopMode::Brake));
}

#[test]
fn test_lost_encoder_is_reported_without_moving() {
    let belt = SimBelt::at(0.0);
    let tracker = tracker();
    let mut axis = axis(&belt, &tracker);
    axis.home().unwrap();
    belt.with(|b| b.encoder_online = false);

    assert_eq!(axis.goto(50.0), Err(TravelError::NoPosition));
    assert_eq!(belt.position_mm(), 0.0);
}

// =============================================================================
// Station moves
// =============================================================================

const STATIONS: &str = r#"
[[stations]]
id = 1
name = "Intake"
position_mm = 40.0
side = "L"

[[stations]]
id = 2
name = "Packing"
position_mm = 150.0
side = "R"
"#;

#[test]
fn test_station_move_from_config() {
    let config = parse_config(STATIONS).expect("config should parse");
    let stations = Stations::from_config(&config.stations).unwrap();

    let belt = SimBelt::at(10.0);
    let tracker = tracker();
    let mut axis = axis(&belt, &tracker);
    axis.home().unwrap();

    axis.move_between_station_ids(1, 2, 0.5, &stations).unwrap();
    assert!((belt.position_mm() - 150.0).abs() <= 2.0);
    assert!(!belt.is_driving());

    assert_eq!(
        axis.move_between_station_ids(2, 3, 0.5, &stations),
        Err(TravelError::UnknownStation(3))
    );
    assert!((belt.position_mm() - 150.0).abs() <= 2.0);
}

#[test]
fn test_station_leg_timeout_names_the_leg() {
    let config = parse_config(STATIONS).unwrap();
    let stations = Stations::from_config(&config.stations).unwrap();

    let belt = SimBelt::at(0.0);
    let tracker = tracker();
    let mut axis = AxisController::new(
        belt.clone(),
        belt.clone(),
        belt.clone(),
        Arc::clone(&tracker),
        TravelConfig {
            timeout_s: 0.05,
            ..travel_config()
        },
        homing_config(),
    );
    axis.home().unwrap();
    belt.with(|b| b.step_mm = 0.0);

    assert_eq!(
        axis.move_between_station_ids(1, 2, 0.5, &stations),
        Err(TravelError::LegTimeout {
            leg: Leg::Pickup,
            station: 1
        })
    );
    assert!(!belt.is_driving());
}

// =============================================================================
// Background homing
// =============================================================================

#[test]
fn test_homing_start_twice_then_succeed() {
    let belt = SimBelt::at(60.0);
    let tracker = tracker();
    let homing = homing_session(&belt, &tracker, homing_config());

    assert!(homing.start());
    assert!(!homing.start());

    let outcome = homing.wait(Duration::from_secs(5)).expect("run should finish");
    assert_eq!(outcome.state, HomingState::Succeeded);
    assert!(tracker.is_homed());
    assert!(!belt.is_driving());
    assert_eq!(belt.with(|b| b.last_stop), Some(StopMode::Coast));

    // Stationary encoder right after homing reads zero.
    let mut axis = axis(&belt, &tracker);
    assert_eq!(axis.current_position_mm(), Some(0.0));
    assert!(axis.goto(30.0).is_ok());
}

#[test]
fn test_homing_cancel_is_not_success() {
    let belt = SimBelt::at(60.0);
    belt.with(|b| b.sensor_working = false);
    let tracker = tracker();
    let homing = homing_session(&belt, &tracker, homing_config());

    assert!(homing.start());
    thread::sleep(Duration::from_millis(10));
    assert!(homing.cancel());

    let outcome = homing.wait(Duration::from_secs(5)).unwrap();
    assert!(outcome.cancelled());
    assert_eq!(outcome.error, Some(HomingError::Cancelled));
    assert_eq!(homing.status().state, HomingState::Cancelled);
    assert!(!tracker.is_homed());
    assert!(!belt.is_driving());
}

#[test]
fn test_homing_timeout_is_bounded() {
    let belt = SimBelt::at(60.0);
    belt.with(|b| b.sensor_working = false);
    let tracker = tracker();
    let homing = homing_session(
        &belt,
        &tracker,
        HomingConfig {
            timeout_s: 0.2,
            ..homing_config()
        },
    );

    assert!(homing.start());
    let outcome = homing.wait(Duration::from_secs(5)).expect("run must terminate");
    assert_eq!(outcome.state, HomingState::Failed);
    assert!(outcome.elapsed >= Duration::from_millis(200));
    assert!(matches!(
        outcome.error,
        Some(HomingError::Timeout {
            phase: HomingPhase::Approach,
            ..
        })
    ));
    assert!(!belt.is_driving());
    assert!(!homing.status().running);
}

#[test]
fn test_session_can_run_three_phase() {
    let belt = SimBelt::at(30.0);
    let tracker = tracker();
    let homing = homing_session(
        &belt,
        &tracker,
        HomingConfig {
            strategy: HomingStrategy::ThreePhase,
            ..homing_config()
        },
    );

    assert!(homing.start());
    let outcome = homing.wait(Duration::from_secs(5)).unwrap();
    assert!(outcome.succeeded());
    assert_eq!(belt.position_mm(), 0.0);
    assert_eq!(belt.with(|b| b.last_stop), Some(StopMode::Brake));
}

// =============================================================================
// Telemetry link feeding the tracker
// =============================================================================

/// Plays back one script, then reports read timeouts until stopped.
struct ScriptSource(Option<&'static str>);

struct Stall(Cursor<&'static [u8]>);

impl Read for Stall {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self.0.read(buf)? {
            0 => {
                thread::sleep(Duration::from_millis(1));
                Err(io::ErrorKind::TimedOut.into())
            }
            n => Ok(n),
        }
    }
}

impl LinkSource for ScriptSource {
    type Reader = BufReader<Stall>;

    fn find_port(&mut self) -> Option<String> {
        Some("/dev/ttyACM0".into())
    }

    fn open(&mut self, _port: &str) -> io::Result<Self::Reader> {
        match self.0.take() {
            Some(script) => Ok(BufReader::new(Stall(Cursor::new(script.as_bytes())))),
            None => Err(io::ErrorKind::NotFound.into()),
        }
    }
}

#[test]
fn test_link_unwraps_while_nobody_queries() {
    let tracker = tracker();
    let link = TelemetryLink::new(
        ScriptSource(Some("300.0,1\n350.0,2\n\n10.0,3\nbad line\n40.0,4\n")),
        TelemetryConfig {
            open_settle_ms: 0,
            reconnect_backoff_ms: 5,
            ..TelemetryConfig::default()
        },
    )
    .with_tracker(Arc::clone(&tracker));
    link.start();

    let deadline = Instant::now() + Duration::from_secs(2);
    while tracker.snapshot().angle.last_raw() != Some(40.0) && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(2));
    }
    link.stop();

    assert_eq!(tracker.continuous_deg(), Some(400.0));
    assert_eq!(tracker.snapshot().angle.turns(), 1);
    let snap = link.latest();
    assert!(snap.ok);
    assert_eq!(snap.aux_raw, Some(4));
    assert_eq!(snap.port.as_deref(), Some("/dev/ttyACM0"));
}

// =============================================================================
// Stepper queue
// =============================================================================

fn stepper(log: &PinLog) -> transport_motion::StepCommandQueue<LogPin> {
    StepCommandQueueBuilder::new()
        .pulse_pin(LogPin("PUL", log.clone()))
        .dir_pin(LogPin("DIR", log.clone()))
        .enable_pin(LogPin("ENA", log.clone()))
        .delay(ThreadDelay)
        .stepper_config(StepperConfig {
            enable_settle_ms: 0,
            ..Default::default()
        })
        .build()
        .expect("queue should build")
}

#[test]
fn test_step_queue_runs_moves_in_order() {
    let log = PinLog::default();
    let queue = stepper(&log);
    queue.move_steps(Direction::Forward, 100, 0.0001).unwrap();
    queue.submit("backward", 50, 0.0001).unwrap();
    assert!(queue.wait_idle(Duration::from_secs(10)));

    let log = log.lock().unwrap().clone();
    let backward_starts = log.iter().position(|&e| e == ("DIR", true)).unwrap();
    let before = &log[..backward_starts];
    let after = &log[backward_starts..];
    assert_eq!(before.iter().filter(|&&e| e == ("PUL", true)).count(), 100);
    assert_eq!(after.iter().filter(|&&e| e == ("PUL", true)).count(), 50);
    assert_eq!(before.last(), Some(&("ENA", true)));
}

#[test]
fn test_step_queue_stop_is_prompt() {
    let log = PinLog::default();
    let queue = stepper(&log);
    queue.move_steps(Direction::Forward, 10_000, 0.0001).unwrap();
    queue.move_steps(Direction::Backward, 500, 0.0001).unwrap();

    let deadline = Instant::now() + Duration::from_secs(2);
    while pulses(&log) < 20 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(1));
    }
    queue.stop();
    let at_stop = pulses(&log);
    assert!(queue.wait_idle(Duration::from_secs(2)));

    assert!(pulses(&log) <= at_stop + 1);
    assert!(pulses(&log) < 10_000);
    assert!(!log.lock().unwrap().contains(&("DIR", true)));
    assert_eq!(queue.pending(), 0);
    assert_eq!(queue.stops_requested(), queue.stops_observed());

    // The queue keeps working after a stop.
    queue.move_steps(Direction::Backward, 3, 0.0001).unwrap();
    assert!(queue.wait_idle(Duration::from_secs(2)));
    assert!(log.lock().unwrap().contains(&("DIR", true)));
}

#[test]
fn test_shared_lock_recovers_after_panic() {
    let counter = transport_motion::Shared::new(0u32);
    let clone = counter.clone();
    let _ = thread::spawn(move || {
        clone.with(|c| {
            *c += 1;
            if *c > 0 {
                panic!("worker died holding the lock");
            }
        })
    })
    .join();
    assert_eq!(counter.with(|c| *c), 1);
}
