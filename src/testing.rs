//! Builders shared by unit tests.

use chrono::NaiveDate;
use ulid::Ulid;

use crate::model::*;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Appointment with fixer `F1` on the hour.
pub fn appt(
    requester: &str,
    day: NaiveDate,
    hour: u32,
    state: ScheduleState,
    by_fixer: bool,
) -> Appointment {
    Appointment {
        id: Ulid::new(),
        fixer_id: "F1".into(),
        requester_id: requester.into(),
        starting_time: day.and_hms_opt(hour, 0, 0).unwrap(),
        schedule_state: state,
        cancelled_by_fixer: by_fixer,
    }
}

pub fn booked(requester: &str, day: NaiveDate, hour: u32) -> Appointment {
    appt(requester, day, hour, ScheduleState::Booked, false)
}
