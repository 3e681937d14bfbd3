//! Line protocol: `<angle_deg>,<aux_raw>`.

use core::fmt;

/// One parsed telemetry line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    /// Encoder angle in degrees.
    pub angle_deg: f32,
    /// Auxiliary raw value (potentiometer ADC count).
    pub aux_raw: u32,
}

/// Why a line was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// No `,` delimiter.
    MissingDelimiter,
    /// Angle field is not a finite number.
    BadAngle,
    /// Aux field is not a non-negative integer.
    BadAux,
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MissingDelimiter => write!(f, "missing ',' delimiter"),
            ParseError::BadAngle => write!(f, "angle is not a finite number"),
            ParseError::BadAux => write!(f, "aux value is not a non-negative integer"),
        }
    }
}

impl std::error::Error for ParseError {}

/// Parse one trimmed line. Only the first `,` splits; the rest belongs to
/// the aux field.
pub fn parse_line(line: &str) -> Result<Reading, ParseError> {
    let (angle, aux) = line.split_once(',').ok_or(ParseError::MissingDelimiter)?;

    let angle_deg: f32 = angle.trim().parse().map_err(|_| ParseError::BadAngle)?;
    if !angle_deg.is_finite() {
        return Err(ParseError::BadAngle);
    }

    let aux_raw: u32 = aux.trim().parse().map_err(|_| ParseError::BadAux)?;

    Ok(Reading { angle_deg, aux_raw })
}
