use std::sync::Arc;

use chrono::NaiveDate;

use crate::model::*;

use super::{CalendarError, SixMonthLedger};

/// Everything the wide-window classification functions read: the fixer's
/// template and ledger, as published by one ledger cycle.
#[derive(Debug, Clone, Default)]
pub struct LedgerView {
    pub template: Arc<AvailabilityTemplate>,
    pub ledger: SixMonthLedger,
    /// Set when the template could not be loaded and every hour reads as disabled.
    pub template_error: Option<CalendarError>,
}

impl LedgerView {
    /// An active appointment occupies the slot.
    pub fn is_hour_booked_fixer(&self, day: NaiveDate, hour: Hour) -> bool {
        self.first_active(day, hour).is_some()
    }

    pub fn is_hour_booked(&self, day: NaiveDate, hour: Hour, requester: &str) -> BookingStatus {
        match self.first_active(day, hour) {
            None => BookingStatus::NotBooked,
            Some(a) if a.requester_id == requester => BookingStatus::Mine,
            Some(_) => BookingStatus::Other,
        }
    }

    /// Template membership for `day`'s weekday. Closed world.
    pub fn is_enabled(&self, day: NaiveDate, hour: Hour) -> bool {
        self.template.is_enabled(day, hour)
    }

    pub fn is_canceled(&self, day: NaiveDate, hour: Hour, requester: &str) -> CancelStatus {
        self.ledger
            .at(Slot::new(day, hour))
            .first()
            .map_or(CancelStatus::NotCancel, |a| cancel_status(a, requester))
    }

    /// Booking wins over cancellation, cancellation over enabledness.
    pub fn slot_state(&self, day: NaiveDate, hour: Hour, requester: &str) -> SlotState {
        match self.is_hour_booked(day, hour, requester) {
            BookingStatus::Mine => return SlotState::BookedByMe,
            BookingStatus::Other => return SlotState::BookedByOther,
            BookingStatus::NotBooked => {}
        }
        match self.is_canceled(day, hour, requester) {
            CancelStatus::NotCancel => {}
            status => return SlotState::Cancelled(status),
        }
        if self.is_enabled(day, hour) {
            SlotState::Free
        } else {
            SlotState::Disabled
        }
    }

    fn first_active(&self, day: NaiveDate, hour: Hour) -> Option<&Appointment> {
        self.ledger
            .at(Slot::new(day, hour))
            .iter()
            .find(|a| a.is_active())
    }
}

/// Ownership first, then attribution. The fixer flag outranks the state.
pub fn cancel_status(appointment: &Appointment, requester: &str) -> CancelStatus {
    let mine = appointment.requester_id == requester;
    match (mine, appointment.cancelled_by_fixer, appointment.schedule_state) {
        (true, true, _) => CancelStatus::Fixer,
        (true, false, ScheduleState::Cancelled) => CancelStatus::Requester,
        (false, true, _) => CancelStatus::OtherFixer,
        (false, false, ScheduleState::Cancelled) => CancelStatus::OtherRequester,
        (_, false, ScheduleState::Booked) => CancelStatus::NotCancel,
    }
}
