//! Weekday eligibility in the school's time zone.
//!
//! The gate is a pure function of an explicit `(instant, time zone)` pair.
//! Converting before testing the weekday matters: the serving host and the
//! school can sit in different zones, and taking the host's weekday would
//! silently shift the day boundary and with it the one-session-per-day key.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

#[derive(Debug, Clone)]
pub struct CalendarGate {
    tz: Tz,
    /// Indexed by `Weekday::num_days_from_monday()`.
    work_days: [bool; 7],
}

impl CalendarGate {
    /// Builds a gate for the given zone and working-day set (1 = Monday ..
    /// 7 = Sunday, as configured). Out-of-range day numbers are ignored.
    pub fn new(tz: Tz, work_days: &[u8]) -> Self {
        let mut days = [false; 7];
        for &d in work_days {
            if (1..=7).contains(&d) {
                days[(d - 1) as usize] = true;
            }
        }
        Self { tz, work_days: days }
    }

    /// The default Monday-to-Friday school week.
    pub fn weekdays(tz: Tz) -> Self {
        Self::new(tz, &[1, 2, 3, 4, 5])
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Whether the instant falls on a working day, judged in the school's
    /// zone.
    pub fn is_eligible(&self, instant: DateTime<Utc>) -> bool {
        let local = instant.with_timezone(&self.tz);
        self.work_days[local.weekday().num_days_from_monday() as usize]
    }

    /// The calendar day a session at this instant belongs to. Every date
    /// that reaches the session store comes through here.
    pub fn local_date(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Local wall-clock time for lateness classification.
    pub fn local_datetime(&self, instant: DateTime<Utc>) -> NaiveDateTime {
        instant.with_timezone(&self.tz).naive_local()
    }
}
