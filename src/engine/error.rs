use chrono::NaiveDate;

use crate::model::UserId;
use crate::source::{DaySlice, SourceError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarError {
    /// Availability template unreachable.
    Fetch { fixer: UserId, source: SourceError },
    /// Six-month appointment ledger unreachable.
    Ledger {
        fixer: UserId,
        anchor: NaiveDate,
        source: SourceError,
    },
    /// One or more of the four day-scoped queries failed.
    DaySnapshot {
        day: NaiveDate,
        failed: Vec<(DaySlice, SourceError)>,
    },
}

impl CalendarError {
    /// Slices that failed in a day snapshot cycle; empty for other errors.
    pub fn failed_slices(&self) -> Vec<DaySlice> {
        match self {
            CalendarError::DaySnapshot { failed, .. } => failed.iter().map(|(s, _)| *s).collect(),
            _ => Vec::new(),
        }
    }
}

impl std::fmt::Display for CalendarError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CalendarError::Fetch { fixer, source } => {
                write!(f, "availability template for {fixer}: {source}")
            }
            CalendarError::Ledger {
                fixer,
                anchor,
                source,
            } => write!(f, "appointment ledger for {fixer} from {anchor}: {source}"),
            CalendarError::DaySnapshot { day, failed } => {
                write!(f, "day snapshot for {day}: {} of 4 queries failed", failed.len())?;
                for (slice, e) in failed {
                    write!(f, "; {}: {e}", slice.path())?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for CalendarError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CalendarError::Fetch { source, .. } | CalendarError::Ledger { source, .. } => {
                Some(source)
            }
            CalendarError::DaySnapshot { failed, .. } => {
                failed.first().map(|(_, e)| e as &(dyn std::error::Error + 'static))
            }
        }
    }
}
