//! Example: A complete transport cycle against simulated hardware.
//!
//! This example demonstrates how to:
//! - Wire an H-bridge driver and end-stop through embedded-hal pins
//! - Feed encoder telemetry into a shared position tracker
//! - Home in the background, then travel to positions and between stations
//! - Queue open-loop moves on a stepper
//!
//! The belt, bridge, end-stop and encoder are simulated in-process.
//!
//! Run with: `cargo run --example scripted_transport`

use std::convert::Infallible;
use std::io::{self, BufReader, Read};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use embedded_hal::pwm::SetDutyCycle;
use transport_motion::stepper::ThreadDelay;
use transport_motion::telemetry::LinkSource;
use transport_motion::{
    parse_config, AngleSource, AxisController, Direction, EndStop, HomingSession, MotorDriver,
    PositionTracker, Result, Shared, StepCommandQueueBuilder, Stations, TelemetryLink,
};

const CONFIG: &str = r#"
[transport]
mm_per_rev = 90.19

[homing]
strategy = "single_speed"
direction = "backward"
speed = 0.4
timeout_s = 10.0
settle_s = 0.1

[travel]
speed = 0.6
slow_speed = 0.25
tolerance_mm = 2.0
slow_zone_mm = 15.0
loop_interval_ms = 20
station_dwell_s = 0.3

[telemetry]
open_settle_ms = 50
reconnect_backoff_ms = 200

[stepper]
enable_settle_ms = 1

[[stations]]
id = 1
name = "Intake"
position_mm = 60.0
side = "L"

[[stations]]
id = 2
name = "Packing"
position_mm = 240.0
side = "R"
"#;

/// Full-duty belt speed.
const MAX_SPEED_MM_S: f32 = 200.0;
/// Hard end of travel behind the end-stop.
const BELT_END_MM: f32 = -5.0;

// =============================================================================
// Simulated belt
// =============================================================================

#[derive(Debug, Default)]
struct Belt {
    position_mm: f32,
    r_duty: f32,
    l_duty: f32,
    enabled: bool,
}

type SimBelt = Arc<Mutex<Belt>>;

fn step_physics(belt: &SimBelt, dt: Duration) {
    let mut b = belt.lock().unwrap();
    if b.enabled {
        let velocity = (b.r_duty - b.l_duty) * MAX_SPEED_MM_S;
        b.position_mm = (b.position_mm + velocity * dt.as_secs_f32()).max(BELT_END_MM);
    }
}

fn encoder_angle(belt: &SimBelt, mm_per_rev: f32) -> f32 {
    let position = belt.lock().unwrap().position_mm;
    (position / mm_per_rev * 360.0 + 123.0).rem_euclid(360.0)
}

/// One H-bridge enable line.
struct EnablePin(SimBelt);

impl ErrorType for EnablePin {
    type Error = Infallible;
}

impl OutputPin for EnablePin {
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        self.0.lock().unwrap().enabled = false;
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        self.0.lock().unwrap().enabled = true;
        Ok(())
    }
}

/// One H-bridge PWM channel; `forward` selects RPWM.
struct PwmChannel {
    belt: SimBelt,
    forward: bool,
}

impl embedded_hal::pwm::ErrorType for PwmChannel {
    type Error = Infallible;
}

impl SetDutyCycle for PwmChannel {
    fn max_duty_cycle(&self) -> u16 {
        1000
    }

    fn set_duty_cycle(&mut self, duty: u16) -> core::result::Result<(), Infallible> {
        let fraction = duty as f32 / 1000.0;
        let mut b = self.belt.lock().unwrap();
        if self.forward {
            b.r_duty = fraction;
        } else {
            b.l_duty = fraction;
        }
        Ok(())
    }
}

/// Inductive end-stop pulling the line low at or behind home.
struct EndStopPin(SimBelt);

impl ErrorType for EndStopPin {
    type Error = Infallible;
}

impl InputPin for EndStopPin {
    fn is_high(&mut self) -> core::result::Result<bool, Infallible> {
        Ok(self.0.lock().unwrap().position_mm > 0.0)
    }

    fn is_low(&mut self) -> core::result::Result<bool, Infallible> {
        self.is_high().map(|high| !high)
    }
}

/// Encoder board streaming `<angle>,<pot>` lines every 5 ms.
struct EncoderBoard {
    belt: SimBelt,
    mm_per_rev: f32,
}

struct EncoderStream {
    belt: SimBelt,
    mm_per_rev: f32,
}

impl Read for EncoderStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        thread::sleep(Duration::from_millis(5));
        let angle = encoder_angle(&self.belt, self.mm_per_rev);
        let pot = (angle / 360.0 * 4095.0) as u32;
        let line = format!("{angle:.3},{pot}\n");
        let n = line.len().min(buf.len());
        buf[..n].copy_from_slice(&line.as_bytes()[..n]);
        Ok(n)
    }
}

impl LinkSource for EncoderBoard {
    type Reader = BufReader<EncoderStream>;

    fn find_port(&mut self) -> Option<String> {
        Some("sim://encoder".into())
    }

    fn open(&mut self, _port: &str) -> io::Result<Self::Reader> {
        Ok(BufReader::new(EncoderStream {
            belt: Arc::clone(&self.belt),
            mm_per_rev: self.mm_per_rev,
        }))
    }
}

/// Stepper output pin counting rising edges.
struct CountingPin(Arc<AtomicU32>);

impl ErrorType for CountingPin {
    type Error = Infallible;
}

impl OutputPin for CountingPin {
    fn set_low(&mut self) -> core::result::Result<(), Infallible> {
        Ok(())
    }

    fn set_high(&mut self) -> core::result::Result<(), Infallible> {
        self.0.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// =============================================================================
// Cycle
// =============================================================================

fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let config = parse_config(CONFIG)?;
    let stations = Stations::from_config(&config.stations)?;
    let mm_per_rev = config.transport.mm_per_rev;

    let belt: SimBelt = Arc::new(Mutex::new(Belt {
        position_mm: 75.0,
        ..Belt::default()
    }));
    let running = Arc::new(AtomicBool::new(true));
    let physics = {
        let belt = Arc::clone(&belt);
        let running = Arc::clone(&running);
        thread::spawn(move || {
            let mut last = Instant::now();
            while running.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(2));
                let now = Instant::now();
                step_physics(&belt, now - last);
                last = now;
            }
        })
    };

    let motor = Shared::new(MotorDriver::new(
        EnablePin(Arc::clone(&belt)),
        EnablePin(Arc::clone(&belt)),
        PwmChannel {
            belt: Arc::clone(&belt),
            forward: true,
        },
        PwmChannel {
            belt: Arc::clone(&belt),
            forward: false,
        },
    ));
    let sensor = Shared::new(EndStop::active_low(EndStopPin(Arc::clone(&belt))));

    let tracker = Arc::new(PositionTracker::new(config.transport));
    let link = TelemetryLink::new(
        EncoderBoard {
            belt: Arc::clone(&belt),
            mm_per_rev,
        },
        config.telemetry.clone(),
    )
    .with_tracker(Arc::clone(&tracker));
    link.start();

    while link.latest().angle().is_none() {
        thread::sleep(Duration::from_millis(10));
    }
    println!("Encoder online: {:?}", link.latest().angle());

    // Background homing
    let homing = HomingSession::new(
        motor.clone(),
        sensor.clone(),
        link.clone(),
        Arc::clone(&tracker),
        config.homing,
    );
    homing.start();
    let outcome = homing.wait(Duration::from_secs(15));
    println!("Homing outcome: {:?}", outcome);

    // Closed-loop travel
    let mut axis = AxisController::new(motor, sensor, link.clone(), Arc::clone(&tracker), config.travel, config.homing);
    let arrived = axis.goto(120.0)?;
    println!(
        "Arrived at {:.1} mm (belt at {:.1} mm)",
        arrived,
        belt.lock().unwrap().position_mm
    );

    axis.move_between_station_ids(1, 2, config.travel.speed, &stations)?;
    println!("Station move done at {:?} mm", axis.current_position_mm());

    // Open-loop stepper
    let pulses = Arc::new(AtomicU32::new(0));
    let mut stepper = StepCommandQueueBuilder::new()
        .pulse_pin(CountingPin(Arc::clone(&pulses)))
        .dir_pin(CountingPin(Arc::new(AtomicU32::new(0))))
        .enable_pin(CountingPin(Arc::new(AtomicU32::new(0))))
        .delay(ThreadDelay)
        .from_config(&config)
        .build()?;
    stepper.move_steps(Direction::Forward, 400, 0.0005)?;
    stepper.submit("backward", 200, 0.0005)?;
    stepper.wait_idle(Duration::from_secs(5));
    println!("Stepper emitted {} pulses", pulses.load(Ordering::Relaxed));
    stepper.shutdown();

    link.stop();
    running.store(false, Ordering::Relaxed);
    let _ = physics.join();

    println!("\n=== Cycle complete ===");
    Ok(())
}
