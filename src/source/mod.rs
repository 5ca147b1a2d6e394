mod http;
mod memory;

pub use http::HttpSource;
pub use memory::InMemorySource;

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::*;

/// Transport-level failure talking to the backing store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    Unreachable(String),
    Status { code: u16, endpoint: Endpoint },
    Decode(String),
    LimitExceeded(&'static str),
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceError::Unreachable(e) => write!(f, "source unreachable: {e}"),
            SourceError::Status { code, endpoint } => {
                write!(f, "{} returned status {code}", endpoint.label())
            }
            SourceError::Decode(e) => write!(f, "malformed response: {e}"),
            SourceError::LimitExceeded(msg) => write!(f, "limit exceeded: {msg}"),
        }
    }
}

impl std::error::Error for SourceError {}

/// The four independently fetched parts of a day snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DaySlice {
    BookedByRequester,
    BookedByOthers,
    FixerCancellations,
    RequesterCancellations,
}

impl DaySlice {
    pub const ALL: [DaySlice; 4] = [
        DaySlice::BookedByRequester,
        DaySlice::BookedByOthers,
        DaySlice::FixerCancellations,
        DaySlice::RequesterCancellations,
    ];

    /// Path segment used by the HTTP backend.
    pub fn path(&self) -> &'static str {
        match self {
            DaySlice::BookedByRequester => "booked-by-requester",
            DaySlice::BookedByOthers => "booked-by-others",
            DaySlice::FixerCancellations => "fixer-cancellations",
            DaySlice::RequesterCancellations => "requester-cancellations",
        }
    }
}

/// Every remote read the calendar performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Template,
    Ledger,
    Day(DaySlice),
}

impl Endpoint {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Endpoint::Template => "template",
            Endpoint::Ledger => "ledger",
            Endpoint::Day(DaySlice::BookedByRequester) => "booked_by_requester",
            Endpoint::Day(DaySlice::BookedByOthers) => "booked_by_others",
            Endpoint::Day(DaySlice::FixerCancellations) => "fixer_cancellations",
            Endpoint::Day(DaySlice::RequesterCancellations) => "requester_cancellations",
        }
    }
}

/// Remote read API the calendar consumes. Implementations must be
/// side-effect free; every call may be issued again for the same key.
#[async_trait]
pub trait CalendarSource: Send + Sync + 'static {
    async fn get_template(&self, fixer: &str) -> Result<AvailabilityTemplate, SourceError>;

    /// All appointments of `fixer` in the six-month window starting at `anchor`.
    async fn fetch_six_month_ledger(
        &self,
        fixer: &str,
        anchor: NaiveDate,
    ) -> Result<Vec<Appointment>, SourceError>;

    async fn get_booked_by_requester(
        &self,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError>;

    async fn get_booked_by_others(
        &self,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError>;

    async fn get_fixer_cancellations(
        &self,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError>;

    async fn get_requester_cancellations(
        &self,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError>;

    /// Dispatch to the slice-specific call.
    async fn get_day_slice(
        &self,
        slice: DaySlice,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError> {
        match slice {
            DaySlice::BookedByRequester => {
                self.get_booked_by_requester(fixer, requester, day).await
            }
            DaySlice::BookedByOthers => self.get_booked_by_others(fixer, requester, day).await,
            DaySlice::FixerCancellations => {
                self.get_fixer_cancellations(fixer, requester, day).await
            }
            DaySlice::RequesterCancellations => {
                self.get_requester_cancellations(fixer, requester, day).await
            }
        }
    }
}
