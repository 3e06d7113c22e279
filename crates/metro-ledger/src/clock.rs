//! Clock handlers: the real wall clock and a manually driven one

use metro_core::{ClockEffects, UnixTime};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// Operating-system wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl ClockEffects for SystemClock {
    fn now(&self) -> UnixTime {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        UnixTime(secs)
    }
}

/// Clock that only moves when told to.
///
/// Clones share the same instant, so one handle can drive the auction and the
/// porter of a ledger together.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Start at `start`
    pub fn new(start: UnixTime) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start.secs())),
        }
    }

    /// Jump to an absolute instant
    pub fn set(&self, at: UnixTime) {
        self.now.store(at.secs(), Ordering::SeqCst);
    }

    /// Move forward by `secs`
    pub fn advance(&self, secs: u64) {
        let _ = self
            .now
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |t| {
                Some(t.saturating_add(secs))
            });
    }

    /// Move forward by whole days
    pub fn advance_days(&self, days: u64) {
        self.advance(days.saturating_mul(metro_core::SECONDS_PER_DAY));
    }
}

impl ClockEffects for ManualClock {
    fn now(&self) -> UnixTime {
        UnixTime(self.now.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(UnixTime(1_000));
        let other = clock.clone();
        clock.advance(60);
        assert_eq!(other.now(), UnixTime(1_060));
        other.advance_days(1);
        assert_eq!(clock.now(), UnixTime(1_060 + 86_400));
        clock.set(UnixTime(5));
        assert_eq!(other.now(), UnixTime(5));
    }

    #[test]
    fn test_system_clock_is_after_2020() {
        assert!(SystemClock.now() > UnixTime(1_577_836_800));
    }
}
