//! Station table entries.

use heapless::String;
use serde::Deserialize;

use crate::error::{truncated, ConfigError};

/// Side of the belt a station serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Side {
    /// Left (`L`).
    Left,
    /// Right (`R`).
    Right,
}

impl Side {
    /// Parse `L`/`R`, case-insensitive.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        match text.trim() {
            "L" | "l" => Ok(Side::Left),
            "R" | "r" => Ok(Side::Right),
            other => Err(ConfigError::InvalidSide(truncated(other))),
        }
    }

    /// Single-letter code.
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
        }
    }
}

impl<'de> Deserialize<'de> for Side {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use core::fmt::Write;
        let text = String::<8>::deserialize(deserializer)?;
        Side::parse(text.as_str()).map_err(|e| {
            let mut buf = String::<128>::new();
            let _ = write!(buf, "{}", e);
            serde::de::Error::custom(buf.as_str())
        })
    }
}

/// One station of the station table.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StationConfig {
    /// Unique station id.
    pub id: u32,

    /// Display name.
    #[serde(default)]
    pub name: String<32>,

    /// Position relative to home in millimetres.
    pub position_mm: f32,

    /// Side of the belt.
    pub side: Side,
}
