//! Work-schedule bookkeeping: lateness classification against the configured
//! start time and grace period. Classification never blocks a check-in; it
//! only annotates the stored session.

use chrono::{NaiveDateTime, NaiveTime};
use db::models::attendance_session::Arrival;

#[derive(Debug, Clone, Copy)]
pub struct WorkSchedule {
    start: NaiveTime,
    end: NaiveTime,
    grace_minutes: u32,
}

impl WorkSchedule {
    pub fn new(start: NaiveTime, end: NaiveTime, grace_minutes: u32) -> Self {
        Self {
            start,
            end,
            grace_minutes,
        }
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    /// Classifies a local check-in time.
    ///
    /// Late means more than `grace_minutes` past the scheduled start; the
    /// minute count is measured from the start itself, not from the end of
    /// the grace window.
    pub fn classify_check_in(&self, local: NaiveDateTime) -> (Arrival, i32) {
        let scheduled = local.date().and_time(self.start);
        let minutes_past = (local - scheduled).num_minutes();
        if minutes_past > self.grace_minutes as i64 {
            (Arrival::Late, minutes_past as i32)
        } else {
            (Arrival::OnTime, 0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn schedule() -> WorkSchedule {
        WorkSchedule::new(
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
            15,
        )
    }

    fn monday_at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 8)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn early_and_on_time_arrivals_are_not_late() {
        assert_eq!(schedule().classify_check_in(monday_at(7, 45)), (Arrival::OnTime, 0));
        assert_eq!(schedule().classify_check_in(monday_at(8, 0)), (Arrival::OnTime, 0));
    }

    #[test]
    fn grace_period_boundary() {
        // Exactly start + grace is still on time; one minute past is late,
        // counted from the scheduled start.
        assert_eq!(schedule().classify_check_in(monday_at(8, 15)), (Arrival::OnTime, 0));
        assert_eq!(schedule().classify_check_in(monday_at(8, 16)), (Arrival::Late, 16));
        assert_eq!(schedule().classify_check_in(monday_at(9, 30)), (Arrival::Late, 90));
    }
}
