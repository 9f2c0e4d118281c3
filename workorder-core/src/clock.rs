//! Wall-clock source, injectable for deterministic order numbers.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};
use std::sync::Arc;

/// Source of the current time.
pub trait Clock: Send + Sync {
    /// Current local date and time (order numbers, document stamps).
    fn now_local(&self) -> NaiveDateTime;

    /// Current instant in UTC (history timestamps).
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current local date.
    fn today(&self) -> NaiveDate {
        self.now_local().date()
    }
}

/// Shared clock handle.
pub type SharedClock = Arc<dyn Clock>;

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_local(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at one instant; local time equals UTC.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl FixedClock {
    /// Freeze at the given local date and time.
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        let time = NaiveDate::from_ymd_opt(year, month, day)
            .and_then(|d| d.and_hms_opt(hour, minute, 0))
            .unwrap_or_default();
        FixedClock(time)
    }
}

impl Clock for FixedClock {
    fn now_local(&self) -> NaiveDateTime {
        self.0
    }

    fn now_utc(&self) -> DateTime<Utc> {
        Utc.from_utc_datetime(&self.0)
    }
}

/// Default shared clock.
pub fn system() -> SharedClock {
    Arc::new(SystemClock)
}

/// Format an order number, `WO-YYYYMMDD-HHMM`.
pub fn order_number_at(time: NaiveDateTime) -> String {
    time.format("WO-%Y%m%d-%H%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_format() {
        let clock = FixedClock::at(2024, 3, 7, 9, 5);
        insta::assert_snapshot!(order_number_at(clock.now_local()), @"WO-20240307-0905");
    }

    #[test]
    fn test_fixed_clock_today() {
        let clock = FixedClock::at(2024, 12, 31, 23, 59);
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 12, 31).unwrap());
    }
}
