//! Serial device discovery and opening.

use std::io::{self, BufReader};

use glob::glob;
use serialport::SerialPort;
use tracing::{debug, info, warn};

use crate::config::TelemetryConfig;

use super::link::LinkSource;

/// Real serial telemetry source.
///
/// Ports are found by expanding each configured glob pattern, so no udev
/// support is needed.
#[derive(Debug, Clone)]
pub struct SerialSource {
    config: TelemetryConfig,
}

impl SerialSource {
    /// Create a source that scans `config.port_patterns`.
    pub fn new(config: TelemetryConfig) -> Self {
        Self { config }
    }

    /// Every matching device path, in pattern order and sorted within each pattern.
    pub fn candidates(&self) -> Vec<String> {
        expand(self.config.port_patterns.iter().map(|p| p.as_str()))
    }
}

fn expand<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    let mut found = Vec::new();
    for pattern in patterns {
        let entries = match glob(pattern) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(pattern = %pattern, error = %e, "invalid port pattern");
                continue;
            }
        };
        let mut matches = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) => matches.push(path.to_string_lossy().into_owned()),
                Err(e) => debug!(error = %e, "unreadable port path"),
            }
        }
        matches.sort();
        for path in matches {
            if !found.contains(&path) {
                found.push(path);
            }
        }
    }
    found
}

impl LinkSource for SerialSource {
    type Reader = BufReader<Box<dyn SerialPort>>;

    fn find_port(&mut self) -> Option<String> {
        let port = self.candidates().into_iter().next();
        if let Some(port) = &port {
            debug!(port = %port, "telemetry port candidate");
        }
        port
    }

    fn open(&mut self, port: &str) -> io::Result<Self::Reader> {
        info!(port = %port, baud = self.config.baud_rate, "opening telemetry port");
        let serial = serialport::new(port, self.config.baud_rate)
            .timeout(self.config.read_timeout())
            .open()
            .map_err(io::Error::from)?;
        Ok(BufReader::new(serial))
    }
}
