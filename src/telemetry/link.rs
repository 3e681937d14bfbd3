//! Reconnecting telemetry read loop.

use std::io::{self, BufRead, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant, SystemTime};

use tracing::{debug, error, info, warn};

use crate::config::TelemetryConfig;
use crate::position::PositionTracker;

use super::protocol::parse_line;
use super::snapshot::{AngleSource, TelemetrySnapshot};

/// Error text published when no device is present.
pub const NO_PORT: &str = "no serial port found";
/// Error text published for a malformed line.
pub const PARSE_ERROR: &str = "parse error";
/// Error text published when the device closes the stream.
pub const DEVICE_CLOSED: &str = "device closed";

/// Longest pending line before it is dropped as a parse error.
const MAX_LINE_BYTES: usize = 256;

/// Longest single sleep while waiting, so `stop()` is noticed promptly.
const SLEEP_SLICE: Duration = Duration::from_millis(20);

/// Where telemetry lines come from.
pub trait LinkSource: Send + 'static {
    /// Line reader for an open connection.
    type Reader: BufRead;

    /// Find a device to connect to.
    fn find_port(&mut self) -> Option<String>;

    /// Open the device. Read timeouts must surface as `TimedOut` or
    /// `WouldBlock` errors.
    fn open(&mut self, port: &str) -> io::Result<Self::Reader>;
}

struct Inner<S> {
    snapshot: Mutex<TelemetrySnapshot>,
    stop: AtomicBool,
    source: Mutex<Option<S>>,
    worker: Mutex<Option<JoinHandle<Option<S>>>>,
}

impl<S> Inner<S> {
    fn update(&self, f: impl FnOnce(&mut TelemetrySnapshot)) {
        let mut snap = self.snapshot.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut snap);
    }

    fn stopped(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    fn sleep(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        while !self.stopped() {
            let now = Instant::now();
            if now >= deadline {
                break;
            }
            thread::sleep((deadline - now).min(SLEEP_SLICE));
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Background telemetry link.
///
/// Cloning yields another handle to the same link.
pub struct TelemetryLink<S> {
    inner: Arc<Inner<S>>,
    config: TelemetryConfig,
    tracker: Option<Arc<PositionTracker>>,
}

impl<S> Clone for TelemetryLink<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            config: self.config.clone(),
            tracker: self.tracker.clone(),
        }
    }
}

impl<S: LinkSource> TelemetryLink<S> {
    /// Create a stopped link.
    pub fn new(source: S, config: TelemetryConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                snapshot: Mutex::new(TelemetrySnapshot::default()),
                stop: AtomicBool::new(false),
                source: Mutex::new(Some(source)),
                worker: Mutex::new(None),
            }),
            config,
            tracker: None,
        }
    }

    /// Feed every parsed angle into `tracker` as it arrives.
    ///
    /// Takes effect on the next `start()`.
    pub fn with_tracker(mut self, tracker: Arc<PositionTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Launch the background loop. Does nothing if it is already running.
    pub fn start(&self) {
        let mut worker = lock(&self.inner.worker);
        if let Some(handle) = worker.as_ref() {
            if !handle.is_finished() {
                return;
            }
        }
        if let Some(handle) = worker.take() {
            self.reclaim(handle);
        }

        let Some(source) = lock(&self.inner.source).take() else {
            error!("telemetry source lost, link cannot restart");
            return;
        };

        self.inner.stop.store(false, Ordering::Release);
        let inner = Arc::clone(&self.inner);
        let config = self.config.clone();
        let tracker = self.tracker.clone();
        let spawned = thread::Builder::new()
            .name("telemetry-link".into())
            .spawn(move || run(&inner, source, &config, tracker.as_deref()));

        match spawned {
            Ok(handle) => *worker = Some(handle),
            Err(e) => error!(error = %e, "failed to spawn telemetry thread"),
        }
    }

    /// Stop the loop and wait for it to exit.
    ///
    /// Returns within one read timeout or sleep slice.
    pub fn stop(&self) {
        self.inner.stop.store(true, Ordering::Release);
        let handle = lock(&self.inner.worker).take();
        if let Some(handle) = handle {
            self.reclaim(handle);
        }
    }

    /// Whether the background loop is alive.
    pub fn is_running(&self) -> bool {
        lock(&self.inner.worker)
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }

    fn reclaim(&self, handle: JoinHandle<Option<S>>) {
        match handle.join() {
            Ok(source) => *lock(&self.inner.source) = source,
            Err(_) => error!("telemetry thread panicked"),
        }
    }
}

impl<S> AngleSource for TelemetryLink<S> {
    fn latest(&self) -> TelemetrySnapshot {
        lock(&self.inner.snapshot).clone()
    }
}

fn run<S: LinkSource>(
    inner: &Inner<S>,
    mut source: S,
    config: &TelemetryConfig,
    tracker: Option<&PositionTracker>,
) -> Option<S> {
    while !inner.stopped() {
        let Some(port) = source.find_port() else {
            inner.update(|s| {
                s.ok = false;
                s.error = Some(NO_PORT.into());
                s.port = None;
            });
            debug!("no telemetry port found");
            inner.sleep(config.reconnect_backoff());
            continue;
        };

        inner.update(|s| {
            s.port = Some(port.clone());
            s.error = None;
        });

        if let Err(e) = session(inner, &mut source, &port, config, tracker) {
            warn!(port = %port, error = %e, "telemetry link lost");
            inner.update(|s| {
                s.ok = false;
                s.error = Some(e.to_string());
            });
            inner.sleep(config.reconnect_backoff());
        }
    }
    Some(source)
}

fn session<S: LinkSource>(
    inner: &Inner<S>,
    source: &mut S,
    port: &str,
    config: &TelemetryConfig,
    tracker: Option<&PositionTracker>,
) -> io::Result<()> {
    let mut reader = source.open(port)?;
    info!(port = %port, "telemetry link connected");

    // The board resets on open; anything it prints before the settle window
    // ends is thrown away.
    let settle_until = Instant::now() + config.open_settle();
    let mut buf = Vec::with_capacity(64);

    while !inner.stopped() {
        let room = MAX_LINE_BYTES.saturating_sub(buf.len()) as u64;
        match reader.by_ref().take(room).read_until(b'\n', &mut buf) {
            Ok(0) => return Err(io::Error::new(io::ErrorKind::UnexpectedEof, DEVICE_CLOSED)),
            Ok(_) => {}
            Err(e) if is_timeout(&e) => continue,
            Err(e) => return Err(e),
        }

        if Instant::now() < settle_until {
            buf.clear();
            continue;
        }

        if buf.len() >= MAX_LINE_BYTES && buf.last() != Some(&b'\n') {
            debug!(port = %port, bytes = buf.len(), "telemetry line too long");
            inner.update(|s| {
                s.ok = false;
                s.error = Some(PARSE_ERROR.into());
            });
            buf.clear();
            continue;
        }

        let text = String::from_utf8_lossy(&buf);
        let line = text.trim();
        if !line.is_empty() {
            publish(inner, line, tracker);
        }
        buf.clear();
    }

    Ok(())
}

fn publish<S>(inner: &Inner<S>, line: &str, tracker: Option<&PositionTracker>) {
    match parse_line(line) {
        Ok(reading) => {
            if let Some(tracker) = tracker {
                tracker.ingest(reading.angle_deg);
            }
            inner.update(|s| {
                s.angle_deg = Some(reading.angle_deg);
                s.aux_raw = Some(reading.aux_raw);
                s.timestamp = Some(SystemTime::now());
                s.ok = true;
                s.last_line = Some(line.to_owned());
                s.error = None;
            });
        }
        Err(e) => {
            debug!(line = %line, reason = %e, "telemetry parse error");
            inner.update(|s| {
                s.ok = false;
                s.last_line = Some(line.to_owned());
                s.error = Some(PARSE_ERROR.into());
            });
        }
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
    )
}
