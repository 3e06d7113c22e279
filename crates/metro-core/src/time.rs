//! Wall-clock time primitives for auction scheduling
//!
//! All scheduling is done in whole Unix seconds. Day boundaries are UTC
//! midnights, i.e. multiples of [`SECONDS_PER_DAY`].

use crate::{MetroError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds in one auction day
pub const SECONDS_PER_DAY: u64 = 86_400;

/// Unix timestamp in seconds
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct UnixTime(pub u64);

impl UnixTime {
    /// Construct from seconds since the epoch
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs)
    }

    /// Seconds since the epoch
    pub const fn secs(self) -> u64 {
        self.0
    }

    /// Add seconds, failing on overflow
    pub fn checked_add_secs(self, secs: u64) -> Result<Self> {
        self.0
            .checked_add(secs)
            .map(Self)
            .ok_or_else(|| MetroError::overflow("timestamp addition"))
    }

    /// Add whole days, failing on overflow
    pub fn checked_add_days(self, days: u64) -> Result<Self> {
        let secs = days
            .checked_mul(SECONDS_PER_DAY)
            .ok_or_else(|| MetroError::overflow("day span"))?;
        self.checked_add_secs(secs)
    }

    /// Seconds elapsed since `earlier`, or zero if `earlier` is in the future
    pub fn saturating_since(self, earlier: UnixTime) -> u64 {
        self.0.saturating_sub(earlier.0)
    }

    /// Index of the UTC day containing this instant
    pub const fn day_index(self) -> u64 {
        self.0 / SECONDS_PER_DAY
    }

    /// Round up to the next midnight boundary; midnights map to themselves.
    ///
    /// `T + 7d + 3h` becomes `T + 8d` when `T` is itself a midnight.
    pub fn ceil_to_day(self) -> Result<Self> {
        let days = self.0.div_ceil(SECONDS_PER_DAY);
        days
            .checked_mul(SECONDS_PER_DAY)
            .map(Self)
            .ok_or_else(|| MetroError::overflow("day rounding"))
    }
}

impl fmt::Display for UnixTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: u64 = 1_700_006_400; // a UTC midnight

    #[test]
    fn test_ceil_to_day() {
        assert_eq!(T % SECONDS_PER_DAY, 0);
        let end = UnixTime(T + 7 * SECONDS_PER_DAY + 3 * 3600);
        assert_eq!(end.ceil_to_day().unwrap(), UnixTime(T + 8 * SECONDS_PER_DAY));

        let midnight = UnixTime(T + 7 * SECONDS_PER_DAY);
        assert_eq!(midnight.ceil_to_day().unwrap(), midnight);

        let one_past = UnixTime(T + 1);
        assert_eq!(one_past.ceil_to_day().unwrap(), UnixTime(T + SECONDS_PER_DAY));
    }

    #[test]
    fn test_checked_arithmetic() {
        assert!(UnixTime(u64::MAX).checked_add_secs(1).is_err());
        assert!(UnixTime(0).checked_add_days(u64::MAX).is_err());
        assert_eq!(
            UnixTime(10).checked_add_days(1).unwrap(),
            UnixTime(10 + SECONDS_PER_DAY)
        );
    }

    #[test]
    fn test_saturating_since() {
        assert_eq!(UnixTime(100).saturating_since(UnixTime(40)), 60);
        assert_eq!(UnixTime(40).saturating_since(UnixTime(100)), 0);
    }
}
