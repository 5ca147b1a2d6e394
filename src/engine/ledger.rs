use chrono::{Datelike, Months, NaiveDate};
use tracing::warn;
use ulid::Ulid;

use crate::limits::LEDGER_WINDOW_MONTHS;
use crate::model::*;
use crate::observability::INVARIANT_VIOLATIONS_TOTAL;

/// Half-open day range `[anchor, end)` covered by one ledger fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LedgerWindow {
    pub anchor: NaiveDate,
    pub end: NaiveDate,
}

impl LedgerWindow {
    pub fn starting(anchor: NaiveDate) -> Self {
        let end = anchor
            .checked_add_months(Months::new(LEDGER_WINDOW_MONTHS))
            .unwrap_or(NaiveDate::MAX);
        Self { anchor, end }
    }

    /// Window anchored at the first day of `day`'s month.
    pub fn for_day(day: NaiveDate) -> Self {
        Self::starting(day.with_day(1).unwrap_or(day))
    }

    pub fn contains(&self, day: NaiveDate) -> bool {
        self.anchor <= day && day < self.end
    }
}

/// More than one active appointment found in one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvariantViolation {
    pub slot: Slot,
    /// Active appointments in fetch order; the first one is used.
    pub appointments: Vec<Ulid>,
}

/// Appointments of one fixer over a window, indexed by slot.
#[derive(Debug, Clone, Default)]
pub struct SixMonthLedger {
    window: Option<LedgerWindow>,
    /// Sorted by slot; equal slots keep fetch order.
    appointments: Vec<Appointment>,
    violations: Vec<InvariantViolation>,
}

impl SixMonthLedger {
    pub fn new(window: LedgerWindow, mut appointments: Vec<Appointment>) -> Self {
        // stable: first match stays the first fetched
        appointments.sort_by_key(Appointment::slot);
        let violations = find_violations(&appointments);
        for v in &violations {
            warn!(
                slot = %v.slot,
                count = v.appointments.len(),
                "multiple active appointments in one slot; using the first"
            );
            metrics::counter!(INVARIANT_VIOLATIONS_TOTAL).increment(1);
        }
        Self {
            window: Some(window),
            appointments,
            violations,
        }
    }

    pub fn window(&self) -> Option<LedgerWindow> {
        self.window
    }

    pub fn len(&self) -> usize {
        self.appointments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.appointments.is_empty()
    }

    pub fn violations(&self) -> &[InvariantViolation] {
        &self.violations
    }

    /// All appointments in `slot`, fetch order.
    pub fn at(&self, slot: Slot) -> &[Appointment] {
        let lo = self.appointments.partition_point(|a| a.slot() < slot);
        let hi = lo + self.appointments[lo..].partition_point(|a| a.slot() == slot);
        &self.appointments[lo..hi]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Appointment> {
        self.appointments.iter()
    }
}

fn find_violations(sorted: &[Appointment]) -> Vec<InvariantViolation> {
    let mut out = Vec::new();
    for group in sorted.chunk_by(|a, b| a.slot() == b.slot()) {
        let active: Vec<Ulid> = group.iter().filter(|a| a.is_active()).map(|a| a.id).collect();
        if active.len() > 1 {
            out.push(InvariantViolation {
                slot: group[0].slot(),
                appointments: active,
            });
        }
    }
    out
}
