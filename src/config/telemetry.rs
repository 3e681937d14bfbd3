//! Telemetry serial link settings.

use core::time::Duration;

use heapless::{String, Vec};
use serde::Deserialize;

use crate::error::truncated;

/// Maximum number of port patterns scanned by the link.
pub const MAX_PORT_PATTERNS: usize = 4;

/// Serial link discovery and timing.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    /// Device path patterns, `*` matching any suffix (e.g. `/dev/ttyACM*`).
    pub port_patterns: Vec<String<32>, MAX_PORT_PATTERNS>,

    /// Serial baud rate.
    pub baud_rate: u32,

    /// Read timeout in milliseconds; a timeout is not an error.
    pub read_timeout_ms: u32,

    /// Input discarded after opening while the device resets, in milliseconds.
    pub open_settle_ms: u32,

    /// Sleep before rescanning after a failure, in milliseconds.
    pub reconnect_backoff_ms: u32,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        let mut port_patterns = Vec::new();
        for pattern in ["/dev/ttyACM*", "/dev/ttyUSB*"] {
            let _ = port_patterns.push(truncated(pattern));
        }
        Self {
            port_patterns,
            baud_rate: 115_200,
            read_timeout_ms: 1000,
            open_settle_ms: 1500,
            reconnect_backoff_ms: 1000,
        }
    }
}

impl TelemetryConfig {
    /// Serial read timeout.
    #[inline]
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms as u64)
    }

    /// Settle window after opening the port.
    #[inline]
    pub fn open_settle(&self) -> Duration {
        Duration::from_millis(self.open_settle_ms as u64)
    }

    /// Backoff before reconnecting.
    #[inline]
    pub fn reconnect_backoff(&self) -> Duration {
        Duration::from_millis(self.reconnect_backoff_ms as u64)
    }

    /// Check a device path against the configured glob patterns.
    ///
    /// Patterns that are not valid globs never match.
    #[cfg(feature = "std")]
    pub fn matches_port(&self, path: &str) -> bool {
        self.port_patterns
            .iter()
            .filter_map(|p| glob::Pattern::new(p.as_str()).ok())
            .any(|p| p.matches(path))
    }
}
