//! Closed-loop axis controller.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{secs, HomingConfig, TravelConfig};
use crate::error::{HomingError, Leg, TravelError};
use crate::homing::{three_phase, HomingContext};
use crate::motion::{SpeedSelector, TravelCommand};
use crate::motor::{ReferenceSensor, StopMode, Transport};
use crate::position::PositionTracker;
use crate::telemetry::AngleSource;

use super::stations::StationTable;

/// Drives the transport to millimetre targets using encoder feedback.
///
/// Travel runs on the caller's thread and blocks until arrival, timeout or a
/// hardware fault. Callers must not drive the same motor from elsewhere while
/// a travel or homing call is in progress.
pub struct AxisController<M, S, A> {
    motor: M,
    sensor: S,
    source: A,
    tracker: Arc<PositionTracker>,
    travel: TravelConfig,
    homing: HomingConfig,
}

impl<M, S, A> AxisController<M, S, A>
where
    M: Transport,
    S: ReferenceSensor,
    A: AngleSource,
{
    /// Create a controller over shared hardware handles.
    pub fn new(
        motor: M,
        sensor: S,
        source: A,
        tracker: Arc<PositionTracker>,
        travel: TravelConfig,
        homing: HomingConfig,
    ) -> Self {
        Self {
            motor,
            sensor,
            source,
            tracker,
            travel,
            homing,
        }
    }

    /// Tracker this controller reads and homes.
    pub fn tracker(&self) -> &Arc<PositionTracker> {
        &self.tracker
    }

    /// Travel defaults.
    pub fn travel_config(&self) -> &TravelConfig {
        &self.travel
    }

    /// Current position in millimetres, or `None` without a valid sample.
    ///
    /// Reads `0.0` while the axis is unhomed.
    pub fn current_position_mm(&self) -> Option<f32> {
        let clamp = self.tracker.config().clamp_min_zero;
        self.source
            .angle_deg()
            .map(|angle| self.tracker.position_mm(angle, clamp))
    }

    /// Stop the motor directly.
    pub fn stop(&mut self, mode: StopMode) -> Result<(), TravelError> {
        self.motor.stop(mode).map_err(TravelError::from)
    }

    /// Travel to `target_mm` with the configured defaults.
    pub fn goto(&mut self, target_mm: f32) -> Result<f32, TravelError> {
        let t = self.travel;
        self.goto_position_mm(target_mm, t.speed, t.tolerance_mm, t.slow_zone_mm, t.timeout_s)
    }

    /// Travel to `target_mm`, returning the final position on arrival.
    ///
    /// Arrival coasts the motor. A timeout brakes it and returns
    /// [`TravelError::Timeout`]. Refuses to move an unhomed axis.
    pub fn goto_position_mm(
        &mut self,
        target_mm: f32,
        speed: f32,
        tolerance_mm: f32,
        slow_zone_mm: f32,
        timeout_s: f32,
    ) -> Result<f32, TravelError> {
        if !self.tracker.is_homed() {
            return Err(TravelError::NotHomed);
        }
        let selector = SpeedSelector::new(speed, tolerance_mm, slow_zone_mm, self.travel.slow_speed);

        info!(target_mm, speed, tolerance_mm, "travel started");
        let result = self.travel_loop(target_mm, &selector, timeout_s);
        match &result {
            Ok(final_mm) => info!(target_mm, final_mm = *final_mm, "travel arrived"),
            Err(e) => {
                let _ = self.motor.stop(StopMode::Brake);
                warn!(target_mm, error = %e, "travel failed");
            }
        }
        result
    }

    fn travel_loop(
        &mut self,
        target_mm: f32,
        selector: &SpeedSelector,
        timeout_s: f32,
    ) -> Result<f32, TravelError> {
        let started = Instant::now();
        let timeout = secs(timeout_s);

        let mut last_mm = self.current_position_mm();
        if last_mm.is_none() {
            thread::sleep(self.travel.retry_interval());
            last_mm = self.current_position_mm();
        }
        if last_mm.is_none() {
            return Err(TravelError::NoPosition);
        }

        loop {
            let pause = match self.current_position_mm() {
                Some(position) => {
                    last_mm = Some(position);
                    match selector.command(target_mm - position) {
                        TravelCommand::Arrived => {
                            self.motor.stop(StopMode::Coast)?;
                            return Ok(position);
                        }
                        TravelCommand::Drive { direction, speed } => {
                            self.motor.drive(direction, speed.value())?;
                        }
                    }
                    self.travel.loop_interval()
                }
                None => {
                    debug!("encoder reading unavailable, retrying");
                    self.travel.retry_interval()
                }
            };

            if started.elapsed() >= timeout {
                return Err(TravelError::Timeout { target_mm, last_mm });
            }
            thread::sleep(pause);
        }
    }

    /// Run the three-phase homing procedure on the caller's thread.
    ///
    /// Returns the committed continuous home angle.
    pub fn home(&mut self) -> Result<f64, HomingError> {
        let never = AtomicBool::new(false);
        let mut ctx = HomingContext {
            motor: &mut self.motor,
            sensor: &mut self.sensor,
            source: &self.source,
            tracker: &self.tracker,
            config: &self.homing,
            cancel: &never,
        };
        info!("three-phase homing started");
        let result = three_phase(&mut ctx);
        match &result {
            Ok(home) => info!(home_deg = *home, "three-phase homing succeeded"),
            Err(e) => warn!(error = %e, "three-phase homing failed"),
        }
        result
    }

    /// Travel to the pickup station, dwell, then travel to the dropoff
    /// station.
    ///
    /// Both ids are resolved before the motor moves.
    pub fn move_between_station_ids<T: StationTable + ?Sized>(
        &mut self,
        pickup_id: u32,
        dropoff_id: u32,
        speed: f32,
        stations: &T,
    ) -> Result<(), TravelError> {
        let pickup_mm = stations
            .position_mm(pickup_id)
            .ok_or(TravelError::UnknownStation(pickup_id))?;
        let dropoff_mm = stations
            .position_mm(dropoff_id)
            .ok_or(TravelError::UnknownStation(dropoff_id))?;

        info!(pickup_id, dropoff_id, "station move started");
        self.leg(Leg::Pickup, pickup_id, pickup_mm, speed)?;
        thread::sleep(self.travel.station_dwell());
        self.leg(Leg::Dropoff, dropoff_id, dropoff_mm, speed)?;
        Ok(())
    }

    fn leg(&mut self, leg: Leg, station: u32, target_mm: f32, speed: f32) -> Result<f32, TravelError> {
        let t = self.travel;
        self.goto_position_mm(target_mm, speed, t.tolerance_mm, t.slow_zone_mm, t.timeout_s)
            .map_err(|e| match e {
                TravelError::Timeout { .. } => TravelError::LegTimeout { leg, station },
                other => other,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TransportConfig;
    use crate::error::MotorError;
    use crate::motion::Direction;
    use crate::telemetry::TelemetrySnapshot;
    use std::cell::Cell;
    use std::collections::BTreeMap;

    /// Motor whose position advances one millimetre per encoder read in the
    /// commanded direction.
    #[derive(Default)]
    struct Belt {
        position_mm: Cell<f32>,
        heading: Cell<Option<Direction>>,
        sensor_dead: bool,
    }

    impl Transport for &Belt {
        fn forward(&mut self, _speed: f32) -> Result<(), MotorError> {
            self.heading.set(Some(Direction::Forward));
            Ok(())
        }

        fn backward(&mut self, _speed: f32) -> Result<(), MotorError> {
            self.heading.set(Some(Direction::Backward));
            Ok(())
        }

        fn stop(&mut self, _mode: StopMode) -> Result<(), MotorError> {
            self.heading.set(None);
            Ok(())
        }
    }

    impl ReferenceSensor for &Belt {
        fn is_active(&mut self) -> Result<bool, MotorError> {
            Ok(self.position_mm.get() <= 0.0)
        }
    }

    impl AngleSource for &Belt {
        fn latest(&self) -> TelemetrySnapshot {
            if self.sensor_dead {
                return TelemetrySnapshot::default();
            }
            let step = match self.heading.get() {
                Some(d) => d.sign() as f32,
                None => 0.0,
            };
            let mm = self.position_mm.get() + step;
            self.position_mm.set(mm);
            let turns = mm as f64 / 90.0;
            let angle = (turns * 360.0).rem_euclid(360.0) as f32;
            TelemetrySnapshot {
                angle_deg: Some(angle),
                ok: true,
                ..TelemetrySnapshot::default()
            }
        }
    }

    fn travel() -> TravelConfig {
        TravelConfig {
            loop_interval_ms: 0,
            retry_interval_ms: 0,
            station_dwell_s: 0.0,
            timeout_s: 2.0,
            ..TravelConfig::default()
        }
    }

    fn controller(belt: &Belt) -> AxisController<&Belt, &Belt, &Belt> {
        let tracker = Arc::new(PositionTracker::new(TransportConfig::new(90.0)));
        AxisController::new(belt, belt, belt, tracker, travel(), HomingConfig::default())
    }

    #[test]
    fn test_unhomed_axis_refuses_travel() {
        let belt = Belt::default();
        let mut axis = controller(&belt);
        assert_eq!(axis.goto(50.0), Err(TravelError::NotHomed));
        assert_eq!(belt.heading.get(), None);
    }

    #[test]
    fn test_goto_converges() {
        let belt = Belt::default();
        let mut axis = controller(&belt);
        axis.tracker().set_home(0.0);

        let final_mm = axis.goto(60.0).unwrap();
        assert!((final_mm - 60.0).abs() <= 2.0);
        assert_eq!(belt.heading.get(), None);

        let final_mm = axis.goto(10.0).unwrap();
        assert!((final_mm - 10.0).abs() <= 2.0);
    }

    #[test]
    fn test_no_position_at_start() {
        let belt = Belt {
            sensor_dead: true,
            ..Belt::default()
        };
        let mut axis = controller(&belt);
        axis.tracker().set_home(0.0);
        assert_eq!(axis.goto(10.0), Err(TravelError::NoPosition));
        assert_eq!(axis.current_position_mm(), None);
        assert_eq!(belt.heading.get(), None);
    }

    #[test]
    fn test_unknown_station_rejected_before_motion() {
        let belt = Belt::default();
        let mut axis = controller(&belt);
        axis.tracker().set_home(0.0);
        let table = BTreeMap::from([(1, 30.0)]);
        assert_eq!(
            axis.move_between_station_ids(1, 9, 0.5, &table),
            Err(TravelError::UnknownStation(9))
        );
        assert_eq!(belt.position_mm.get(), 0.0);
    }

    #[test]
    fn test_station_move_visits_both_legs() {
        let belt = Belt::default();
        let mut axis = controller(&belt);
        axis.tracker().set_home(0.0);
        let table = BTreeMap::from([(1, 30.0), (2, 80.0)]);
        axis.move_between_station_ids(1, 2, 0.5, &table).unwrap();
        assert!((belt.position_mm.get() - 80.0).abs() <= 3.0);
    }

    #[test]
    fn test_timeout_maps_to_leg() {
        let belt = Belt::default();
        let mut axis = controller(&belt);
        axis.tracker().set_home(0.0);
        axis.travel.timeout_s = 0.0;
        let table = BTreeMap::from([(1, 30.0), (2, 80.0)]);
        assert_eq!(
            axis.move_between_station_ids(1, 2, 0.5, &table),
            Err(TravelError::LegTimeout {
                leg: Leg::Pickup,
                station: 1
            })
        );
        assert_eq!(belt.heading.get(), None);
    }
}
