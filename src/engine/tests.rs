use std::sync::Arc;

use chrono::{NaiveDate, Weekday};

use super::*;
use crate::model::*;
use crate::testing::{appt, booked, date};

fn view(appointments: Vec<Appointment>) -> LedgerView {
    view_with_template(AvailabilityTemplate::new(), appointments)
}

fn view_with_template(
    template: AvailabilityTemplate,
    appointments: Vec<Appointment>,
) -> LedgerView {
    let window = LedgerWindow::for_day(date(2025, 3, 1));
    LedgerView {
        template: Arc::new(template),
        ledger: SixMonthLedger::new(window, appointments),
        template_error: None,
    }
}

// ── is_hour_booked_fixer / is_hour_booked ────────────────

#[test]
fn booked_slot_classified_for_owner_and_others() {
    let d = date(2025, 3, 10);
    let v = view(vec![booked("R1", d, 14)]);

    assert_eq!(v.is_hour_booked(d, 14, "R1"), BookingStatus::Mine);
    assert_eq!(v.is_hour_booked(d, 14, "R2"), BookingStatus::Other);
    assert!(v.is_hour_booked_fixer(d, 14));
}

#[test]
fn booked_only_at_its_own_slot() {
    let d = date(2025, 3, 10);
    let v = view(vec![booked("R1", d, 14)]);

    for hour in 0..24 {
        if hour == 14 {
            continue;
        }
        assert!(!v.is_hour_booked_fixer(d, hour), "hour {hour}");
        assert_eq!(v.is_hour_booked(d, hour, "R1"), BookingStatus::NotBooked);
    }
    assert!(!v.is_hour_booked_fixer(date(2025, 3, 11), 14));
    assert!(!v.is_hour_booked_fixer(date(2025, 4, 10), 14));
}

#[test]
fn fixer_cancelled_slot_is_not_booked() {
    let d = date(2025, 3, 10);
    let v = view(vec![appt("R1", d, 14, ScheduleState::Cancelled, true)]);

    assert_eq!(v.is_canceled(d, 14, "R1"), CancelStatus::Fixer);
    assert!(!v.is_hour_booked_fixer(d, 14));
    assert_eq!(v.is_hour_booked(d, 14, "R1"), BookingStatus::NotBooked);
}

#[test]
fn booked_state_with_fixer_flag_is_not_active() {
    // the flag alone withdraws the booking
    let d = date(2025, 3, 10);
    let v = view(vec![appt("R1", d, 14, ScheduleState::Booked, true)]);
    assert!(!v.is_hour_booked_fixer(d, 14));
    assert_eq!(v.is_canceled(d, 14, "R1"), CancelStatus::Fixer);
}

#[test]
fn requester_cancelled_slot_is_not_booked() {
    let d = date(2025, 3, 10);
    let v = view(vec![appt("R1", d, 9, ScheduleState::Cancelled, false)]);
    assert!(!v.is_hour_booked_fixer(d, 9));
    assert_eq!(v.is_hour_booked(d, 9, "R2"), BookingStatus::NotBooked);
}

#[test]
fn rebooking_after_cancellation_is_found() {
    // an inactive appointment ahead of the active one does not hide it
    let d = date(2025, 3, 10);
    let v = view(vec![
        appt("R1", d, 9, ScheduleState::Cancelled, false),
        booked("R2", d, 9),
    ]);
    assert_eq!(v.is_hour_booked(d, 9, "R2"), BookingStatus::Mine);
    assert_eq!(v.is_hour_booked(d, 9, "R1"), BookingStatus::Other);
}

#[test]
fn duplicate_active_first_match_wins() {
    let d = date(2025, 3, 10);
    let v = view(vec![booked("R1", d, 14), booked("R2", d, 14)]);

    assert_eq!(v.ledger.violations().len(), 1);
    assert_eq!(v.is_hour_booked(d, 14, "R1"), BookingStatus::Mine);
    assert_eq!(v.is_hour_booked(d, 14, "R2"), BookingStatus::Other);
}

#[test]
fn exactly_one_booking_status_per_slot() {
    let d = date(2025, 3, 10);
    let v = view(vec![
        booked("R1", d, 9),
        booked("R2", d, 10),
        appt("R1", d, 11, ScheduleState::Cancelled, true),
    ]);
    for hour in 0..24 {
        for requester in ["R1", "R2", "R3"] {
            let status = v.is_hour_booked(d, hour, requester);
            let active_mine = v
                .ledger
                .at(Slot::new(d, hour))
                .iter()
                .any(|a| a.is_active() && a.requester_id == requester);
            assert_eq!(status == BookingStatus::Mine, active_mine, "{hour} {requester}");
            assert_eq!(
                status == BookingStatus::NotBooked,
                !v.is_hour_booked_fixer(d, hour)
            );
        }
    }
}

// ── is_enabled ───────────────────────────────────────────

#[test]
fn enabled_follows_weekday_template() {
    let monday = date(2025, 3, 10);
    let tuesday = date(2025, 3, 11);
    let v = view_with_template(
        AvailabilityTemplate::new().with_hours(Weekday::Mon, [9, 10, 11]),
        vec![],
    );

    assert!(v.is_enabled(monday, 10));
    assert!(!v.is_enabled(monday, 12));
    assert!(!v.is_enabled(tuesday, 10));
    // every Monday, not just one
    assert!(v.is_enabled(date(2025, 6, 2), 9));
}

#[test]
fn enabled_rejects_out_of_range_hours() {
    let v = view_with_template(
        AvailabilityTemplate::new().with_hours(Weekday::Mon, 0..24),
        vec![],
    );
    assert!(v.is_enabled(date(2025, 3, 10), 23));
    assert!(!v.is_enabled(date(2025, 3, 10), 24));
    assert!(!v.is_enabled(date(2025, 3, 10), 255));
}

#[test]
fn default_view_is_conservative() {
    let v = LedgerView::default();
    let d = date(2025, 3, 10);
    for hour in 0..24 {
        assert!(!v.is_enabled(d, hour));
        assert!(!v.is_hour_booked_fixer(d, hour));
        assert_eq!(v.is_canceled(d, hour, "R1"), CancelStatus::NotCancel);
        assert_eq!(v.slot_state(d, hour, "R1"), SlotState::Disabled);
    }
}

// ── is_canceled ──────────────────────────────────────────

#[test]
fn cancel_status_all_combinations() {
    let d = date(2025, 3, 10);
    let cases = [
        // (owner, state, by_fixer, expected for R1)
        ("R1", ScheduleState::Booked, true, CancelStatus::Fixer),
        ("R1", ScheduleState::Cancelled, true, CancelStatus::Fixer),
        ("R1", ScheduleState::Cancelled, false, CancelStatus::Requester),
        ("R1", ScheduleState::Booked, false, CancelStatus::NotCancel),
        ("R2", ScheduleState::Booked, true, CancelStatus::OtherFixer),
        ("R2", ScheduleState::Cancelled, true, CancelStatus::OtherFixer),
        ("R2", ScheduleState::Cancelled, false, CancelStatus::OtherRequester),
        ("R2", ScheduleState::Booked, false, CancelStatus::NotCancel),
    ];
    for (owner, state, by_fixer, expected) in cases {
        let a = appt(owner, d, 14, state, by_fixer);
        assert_eq!(cancel_status(&a, "R1"), expected, "{owner} {state:?} {by_fixer}");
        let v = view(vec![a]);
        assert_eq!(v.is_canceled(d, 14, "R1"), expected);
    }
}

#[test]
fn cancel_status_empty_slot() {
    let v = view(vec![]);
    assert_eq!(v.is_canceled(date(2025, 3, 10), 14, "R1"), CancelStatus::NotCancel);
}

#[test]
fn cancel_status_uses_first_appointment_regardless_of_state() {
    let d = date(2025, 3, 10);
    let v = view(vec![
        appt("R1", d, 14, ScheduleState::Cancelled, false),
        booked("R2", d, 14),
    ]);
    assert_eq!(v.is_canceled(d, 14, "R1"), CancelStatus::Requester);
    assert_eq!(v.is_canceled(d, 14, "R2"), CancelStatus::OtherRequester);
}

#[test]
fn classification_is_idempotent() {
    let d = date(2025, 3, 10);
    let v = view_with_template(
        AvailabilityTemplate::new().with_hours(Weekday::Mon, [9, 14]),
        vec![booked("R1", d, 14), appt("R2", d, 9, ScheduleState::Cancelled, true)],
    );
    for hour in 0..24 {
        assert_eq!(v.is_hour_booked(d, hour, "R1"), v.is_hour_booked(d, hour, "R1"));
        assert_eq!(v.is_canceled(d, hour, "R1"), v.is_canceled(d, hour, "R1"));
        assert_eq!(v.is_enabled(d, hour), v.is_enabled(d, hour));
        assert_eq!(v.is_hour_booked_fixer(d, hour), v.is_hour_booked_fixer(d, hour));
    }
}

// ── slot_state ───────────────────────────────────────────

#[test]
fn slot_state_precedence() {
    let d = date(2025, 3, 10);
    let v = view_with_template(
        AvailabilityTemplate::new().with_hours(Weekday::Mon, [9, 10, 11, 12]),
        vec![
            booked("R1", d, 9),
            booked("R2", d, 10),
            appt("R1", d, 11, ScheduleState::Cancelled, true),
            // booked outside the template still reads as booked
            booked("R2", d, 15),
        ],
    );
    assert_eq!(v.slot_state(d, 9, "R1"), SlotState::BookedByMe);
    assert_eq!(v.slot_state(d, 10, "R1"), SlotState::BookedByOther);
    assert_eq!(v.slot_state(d, 11, "R1"), SlotState::Cancelled(CancelStatus::Fixer));
    assert_eq!(v.slot_state(d, 12, "R1"), SlotState::Free);
    assert_eq!(v.slot_state(d, 13, "R1"), SlotState::Disabled);
    assert_eq!(v.slot_state(d, 15, "R1"), SlotState::BookedByOther);
}

// ── DaySnapshot predicates ───────────────────────────────

fn snapshot(day: NaiveDate) -> DaySnapshot {
    DaySnapshot {
        day: Some(day),
        booked_by_me: [9].into_iter().collect(),
        occupied_by_others: [10].into_iter().collect(),
        cancelled_by_fixer: [11].into_iter().collect(),
        cancelled_by_requester: [12].into_iter().collect(),
    }
}

#[test]
fn day_predicates_are_membership() {
    let d = date(2025, 3, 10);
    let s = snapshot(d);
    assert!(s.is_hour_booked(d, 9));
    assert!(s.is_occupied_by_other(d, 10));
    assert!(s.is_cancelled_by_fixer(d, 11));
    assert!(s.is_cancelled_by_requester(d, 12));
    assert!(!s.is_hour_booked(d, 10));
    assert!(!s.is_occupied_by_other(d, 9));
    assert!(s.overlaps().is_empty());
}

#[test]
fn day_disabled_composite_rule() {
    let d = date(2025, 3, 10);
    let s = snapshot(d);
    assert!(!s.is_disabled(d, 9)); // own booking stays interactive
    assert!(s.is_disabled(d, 10)); // occupied by others
    assert!(s.is_disabled(d, 11)); // cancelled by fixer
    assert!(!s.is_disabled(d, 12)); // own cancellation may be rebooked
    assert!(!s.is_disabled(d, 13));
}

#[test]
fn day_predicates_for_other_day() {
    let d = date(2025, 3, 10);
    let other = date(2025, 3, 11);
    let s = snapshot(d);
    for hour in 0..24 {
        assert!(s.is_disabled(other, hour));
        assert!(!s.is_hour_booked(other, hour));
        assert!(!s.is_occupied_by_other(other, hour));
        assert!(!s.is_cancelled_by_fixer(other, hour));
        assert!(!s.is_cancelled_by_requester(other, hour));
    }
}

#[test]
fn default_snapshot_disables_everything() {
    let s = DaySnapshot::default();
    let d = date(2025, 3, 10);
    assert!((0..24).all(|h| s.is_disabled(d, h)));
    let empty = DaySnapshot::for_day(d);
    assert!((0..24).all(|h| !empty.is_disabled(d, h)));
}

#[test]
fn snapshot_overlap_reported() {
    let d = date(2025, 3, 10);
    let mut s = snapshot(d);
    s.cancelled_by_fixer.insert(10);
    assert_eq!(s.overlaps(), vec![("occupied_by_others", "cancelled_by_fixer")]);
}
