//! Station table.

use std::collections::BTreeMap;

use crate::config::StationConfig;
use crate::error::ConfigError;

/// Keyed lookup of station positions.
///
/// A missing id is reported as `None`; callers never substitute a default.
pub trait StationTable {
    /// Position of station `id` in millimetres from home.
    fn position_mm(&self, id: u32) -> Option<f32>;
}

impl StationTable for BTreeMap<u32, f32> {
    fn position_mm(&self, id: u32) -> Option<f32> {
        self.get(&id).copied()
    }
}

impl<T: StationTable + ?Sized> StationTable for &T {
    fn position_mm(&self, id: u32) -> Option<f32> {
        (**self).position_mm(id)
    }
}

/// In-memory station table keyed by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stations {
    entries: BTreeMap<u32, StationConfig>,
}

impl Stations {
    /// Empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configured stations, rejecting duplicate ids.
    pub fn from_config<'a>(
        stations: impl IntoIterator<Item = &'a StationConfig>,
    ) -> Result<Self, ConfigError> {
        let mut table = Self::new();
        for station in stations {
            table.add(station.clone())?;
        }
        Ok(table)
    }

    /// Look up a station.
    pub fn get(&self, id: u32) -> Option<&StationConfig> {
        self.entries.get(&id)
    }

    /// Insert a new station. An existing id is an error and is left untouched.
    pub fn add(&mut self, station: StationConfig) -> Result<(), ConfigError> {
        if self.entries.contains_key(&station.id) {
            return Err(ConfigError::DuplicateStation(station.id));
        }
        self.entries.insert(station.id, station);
        Ok(())
    }

    /// Remove a station, returning whether it existed.
    pub fn remove(&mut self, id: u32) -> bool {
        self.entries.remove(&id).is_some()
    }

    /// Stations in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &StationConfig> + '_ {
        self.entries.values()
    }

    /// Number of stations.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl StationTable for Stations {
    fn position_mm(&self, id: u32) -> Option<f32> {
        self.get(id).map(|s| s.position_mm)
    }
}
