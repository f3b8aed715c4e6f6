//! Playback speed values
//!
//! Speeds travel as strings (`"0.75"`, `"1.0"`, `"1.50"`) between the host,
//! the preference store and the speed menu. [`Speed`] keeps them as integer
//! hundredths so comparison and snapping are exact.

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::PlayerError;

/// A playback speed in hundredths (`1.25` is `125`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Speed(u32);

/// Preferred replacement for a requested speed that is not supported
const SNAP_TABLE: [(u32, u32); 5] = [(25, 75), (50, 75), (75, 50), (125, 150), (200, 150)];

impl Speed {
    pub const NORMAL: Speed = Speed(100);

    pub const fn from_hundredths(hundredths: u32) -> Self {
        Speed(hundredths)
    }

    /// Speed from a multiplier; non-finite or non-positive values are rejected
    pub fn from_f64(value: f64) -> Option<Self> {
        if value.is_finite() && value > 0.0 {
            let hundredths = (value * 100.0).round();
            (hundredths >= 1.0 && hundredths <= f64::from(u32::MAX)).then_some(Speed(hundredths as u32))
        } else {
            None
        }
    }

    /// Parse the string form; anything non-numeric yields `None`
    pub fn parse(value: &str) -> Option<Self> {
        value.trim().parse::<f64>().ok().and_then(Self::from_f64)
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.0) / 100.0
    }

    pub fn hundredths(&self) -> u32 {
        self.0
    }

    /// Map `requested` onto one of `supported`.
    ///
    /// An exact match wins. Otherwise the fixed replacement table is
    /// consulted, then the numerically nearest supported speed is taken
    /// with ties going to the slower one. `None` only when `supported` is
    /// empty.
    pub fn snap(supported: &[Speed], requested: Speed) -> Option<Speed> {
        if supported.contains(&requested) {
            return Some(requested);
        }

        let preferred = SNAP_TABLE
            .iter()
            .find(|(from, _)| *from == requested.0)
            .map(|(_, to)| Speed(*to))
            .filter(|to| supported.contains(to));
        if preferred.is_some() {
            return preferred;
        }

        supported
            .iter()
            .copied()
            .min_by_key(|s| (s.0.abs_diff(requested.0), s.0))
    }
}

impl Default for Speed {
    fn default() -> Self {
        Speed::NORMAL
    }
}

impl fmt::Display for Speed {
    /// Two decimals, collapsing `.00` to `.0`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / 100;
        let frac = self.0 % 100;
        if frac == 0 {
            write!(f, "{}.0", whole)
        } else {
            write!(f, "{}.{:02}", whole, frac)
        }
    }
}

impl FromStr for Speed {
    type Err = PlayerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Speed::parse(s).ok_or_else(|| PlayerError::InvalidInput(format!("Invalid speed '{}'", s)))
    }
}

impl Serialize for Speed {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Speed {
    /// Accepts either the string form or a bare number
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct SpeedVisitor;

        impl<'de> Visitor<'de> for SpeedVisitor {
            type Value = Speed;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a playback speed as a number or numeric string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Speed, E> {
                Speed::parse(v).ok_or_else(|| E::custom(format!("invalid speed '{}'", v)))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<Speed, E> {
                Speed::from_f64(v).ok_or_else(|| E::custom(format!("invalid speed {}", v)))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Speed, E> {
                self.visit_f64(v as f64)
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Speed, E> {
                self.visit_f64(v as f64)
            }
        }

        deserializer.deserialize_any(SpeedVisitor)
    }
}
