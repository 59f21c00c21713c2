//! Physical units with type safety.
//!
//! These newtypes provide compile-time unit checking to prevent
//! mixing incompatible quantities, plus the frequency unit ladder
//! (Hz, kHz, MHz, GHz) used by every interchange format.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error for a unit string outside the recognized set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown unit '{unit}' (expected one of Hz, kHz, MHz, GHz)")]
pub struct UnitError {
    pub unit: String,
}

/// Frequency in Hertz.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Hertz(pub f64);

impl Hertz {
    #[inline]
    pub fn from_ghz(ghz: f64) -> Self {
        Self(ghz * 1e9)
    }

    #[inline]
    pub fn as_ghz(&self) -> f64 {
        self.0 * 1e-9
    }

    /// Express this frequency in `unit`.
    #[inline]
    pub fn in_unit(&self, unit: FrequencyUnit) -> f64 {
        FrequencyUnit::Hz.convert(self.0, unit)
    }
}

/// Impedance in Ohms.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct Ohms(pub f64);

impl Ohms {
    /// Standard 50 ohm reference impedance.
    pub const Z0_50: Self = Self(50.0);
}

/// Frequency unit on the power-of-1000 ladder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum FrequencyUnit {
    #[default]
    #[serde(rename = "Hz", alias = "hz", alias = "HZ")]
    Hz,
    #[serde(rename = "kHz", alias = "khz", alias = "KHZ")]
    KHz,
    #[serde(rename = "MHz", alias = "mhz", alias = "MHZ")]
    MHz,
    #[serde(rename = "GHz", alias = "ghz", alias = "GHZ")]
    GHz,
}

impl FrequencyUnit {
    pub const ALL: [FrequencyUnit; 4] = [Self::Hz, Self::KHz, Self::MHz, Self::GHz];

    /// Exponent of 1000 relative to Hz.
    #[inline]
    fn rung(self) -> i32 {
        match self {
            Self::Hz => 0,
            Self::KHz => 1,
            Self::MHz => 2,
            Self::GHz => 3,
        }
    }

    /// Canonical spelling (`Hz`, `kHz`, `MHz`, `GHz`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hz => "Hz",
            Self::KHz => "kHz",
            Self::MHz => "MHz",
            Self::GHz => "GHz",
        }
    }

    /// Convert a value expressed in `self` into `to`.
    ///
    /// The scale factor is an exact power of 1000, applied with a single
    /// multiplication (up the ladder to finer units) or division (to coarser
    /// units), so the only error is one IEEE-754 rounding. A round trip
    /// `A -> B -> A` reproduces the input exactly only when the value is
    /// representable in both units.
    #[inline]
    pub fn convert(self, value: f64, to: FrequencyUnit) -> f64 {
        let steps = self.rung() - to.rung();
        match steps.cmp(&0) {
            std::cmp::Ordering::Equal => value,
            std::cmp::Ordering::Greater => value * POWERS_OF_1000[steps as usize],
            std::cmp::Ordering::Less => value / POWERS_OF_1000[(-steps) as usize],
        }
    }

    /// Convert every element of `values` from `self` into `to`.
    pub fn convert_slice(self, values: &[f64], to: FrequencyUnit) -> Vec<f64> {
        values.iter().map(|&v| self.convert(v, to)).collect()
    }
}

const POWERS_OF_1000: [f64; 4] = [1.0, 1e3, 1e6, 1e9];

impl fmt::Display for FrequencyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FrequencyUnit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|u| u.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnitError {
                unit: s.to_string(),
            })
    }
}

/// Convert a value between two unit names.
///
/// Fails with [`UnitError`] if either name is outside the recognized set.
pub fn convert(value: f64, from_unit: &str, to_unit: &str) -> Result<f64, UnitError> {
    let from: FrequencyUnit = from_unit.parse()?;
    let to: FrequencyUnit = to_unit.parse()?;
    Ok(from.convert(value, to))
}

/// Array form of [`convert`]; the output has the same length as the input.
pub fn convert_slice(values: &[f64], from_unit: &str, to_unit: &str) -> Result<Vec<f64>, UnitError> {
    let from: FrequencyUnit = from_unit.parse()?;
    let to: FrequencyUnit = to_unit.parse()?;
    Ok(from.convert_slice(values, to))
}
