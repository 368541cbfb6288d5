//! Clock abstraction for determinism.

use chrono::{DateTime, TimeDelta, Utc};

/// Abstraction over system time for deterministic behavior.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;

    /// Returns the instant `days` whole days before [`Clock::now`].
    ///
    /// Saturates at [`DateTime::MIN_UTC`] when the offset reaches past the
    /// representable range.
    fn days_ago(&self, days: u32) -> DateTime<Utc> {
        TimeDelta::try_days(i64::from(days))
            .and_then(|offset| self.now().checked_sub_signed(offset))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    struct Frozen(DateTime<Utc>);

    impl Clock for Frozen {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn test_days_ago_subtracts_whole_days() {
        let clock = Frozen(Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0).unwrap());

        assert_eq!(
            clock.days_ago(30),
            Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(clock.days_ago(0), clock.now());
    }

    #[test]
    fn test_days_ago_saturates_beyond_representable_range() {
        let clock = Frozen(Utc.with_ymd_and_hms(2026, 3, 31, 12, 0, 0).unwrap());

        assert_eq!(clock.days_ago(u32::MAX), DateTime::<Utc>::MIN_UTC);
    }
}
