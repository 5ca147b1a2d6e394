//! Reconciliation engine: pure classification over already-fetched data.

mod classify;
mod day;
mod error;
mod ledger;
#[cfg(test)]
mod tests;

pub use classify::{cancel_status, LedgerView};
pub use error::CalendarError;
pub use ledger::{InvariantViolation, LedgerWindow, SixMonthLedger};
