//! System configuration - root configuration structure.

use heapless::Vec;
use serde::Deserialize;

use super::homing::HomingConfig;
use super::station::StationConfig;
use super::stepper::StepperConfig;
use super::telemetry::TelemetryConfig;
use super::transport::TransportConfig;
use super::travel::TravelConfig;

/// Maximum number of stations in the configuration.
pub const MAX_STATIONS: usize = 64;

/// Root configuration structure from TOML.
///
/// Every section is optional; missing sections take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SystemConfig {
    /// Encoder-to-belt calibration.
    #[serde(default)]
    pub transport: TransportConfig,

    /// Homing parameters.
    #[serde(default)]
    pub homing: HomingConfig,

    /// Closed-loop travel defaults.
    #[serde(default)]
    pub travel: TravelConfig,

    /// Telemetry serial link.
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Stepper limits.
    #[serde(default)]
    pub stepper: StepperConfig,

    /// Station table.
    #[serde(default)]
    pub stations: Vec<StationConfig, MAX_STATIONS>,
}

impl SystemConfig {
    /// Get a station by id.
    pub fn station(&self, id: u32) -> Option<&StationConfig> {
        self.stations.iter().find(|s| s.id == id)
    }

    /// List all station ids in configuration order.
    pub fn station_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.stations.iter().map(|s| s.id)
    }
}
