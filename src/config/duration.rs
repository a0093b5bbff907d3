//! Duration strings
//!
//! Config values like `ping_interval` and per-engine `timeout` are written as
//! duration strings: one or more integer/unit groups concatenated together,
//! e.g. `15m`, `8s`, `250ms`, `1h30m`. Units are `ns`, `us`, `µs`, `ms`,
//! `s`, `m`, `h`. Anything else is rejected at config load.

use serde::de::{self, Deserialize, Deserializer};
use std::fmt;
use std::time::Duration;

/// Wrapper around [`Duration`] that deserializes from a duration string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConfDuration(pub Duration);

impl ConfDuration {
    pub fn get(self) -> Duration {
        self.0
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }
}

impl From<Duration> for ConfDuration {
    fn from(d: Duration) -> Self {
        Self(d)
    }
}

impl fmt::Display for ConfDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.0)
    }
}

impl<'de> Deserialize<'de> for ConfDuration {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        parse_duration(&s).map(ConfDuration).map_err(de::Error::custom)
    }
}

/// Parses a duration string.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    if s.is_empty() {
        return Err("empty duration".into());
    }

    let mut total: u128 = 0; // nanoseconds
    let mut rest = s;

    while !rest.is_empty() {
        let digits = rest.len() - rest.trim_start_matches(|c: char| c.is_ascii_digit()).len();
        if digits == 0 {
            return Err(format!("invalid duration {s:?}: expected a number"));
        }

        let value: u64 = rest[..digits]
            .parse()
            .map_err(|_| format!("invalid duration {s:?}: number out of range"))?;
        rest = &rest[digits..];

        let (unit_nanos, len): (u128, usize) = if rest.starts_with("ns") {
            (1, 2)
        } else if rest.starts_with("us") {
            (1_000, 2)
        } else if rest.starts_with("µs") {
            (1_000, "µs".len())
        } else if rest.starts_with("ms") {
            (1_000_000, 2)
        } else if rest.starts_with('s') {
            (1_000_000_000, 1)
        } else if rest.starts_with('m') {
            (60 * 1_000_000_000, 1)
        } else if rest.starts_with('h') {
            (3600 * 1_000_000_000, 1)
        } else {
            return Err(format!("invalid duration {s:?}: unknown unit"));
        };
        rest = &rest[len..];

        total = total
            .checked_add(unit_nanos * value as u128)
            .filter(|&n| n <= u64::MAX as u128)
            .ok_or_else(|| format!("invalid duration {s:?}: overflow"))?;
    }

    Ok(Duration::new(
        (total / 1_000_000_000) as u64,
        (total % 1_000_000_000) as u32,
    ))
}
