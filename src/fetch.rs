use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use futures::future::join4;
use tracing::{debug, warn};

use crate::controller::CycleFetch;
use crate::engine::{CalendarError, LedgerView, LedgerWindow, SixMonthLedger};
use crate::model::*;
use crate::source::{CalendarSource, DaySlice};
use crate::templates::TemplateStore;

// ── Ledger cycle ────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LedgerKey {
    pub fixer: UserId,
    pub window: LedgerWindow,
}

/// Loads template and six-month ledger concurrently. A template failure
/// does not fail the cycle: the view gets an empty template instead.
pub struct LedgerFetch<S> {
    source: Arc<S>,
    templates: Arc<TemplateStore>,
}

impl<S: CalendarSource> LedgerFetch<S> {
    pub fn new(source: Arc<S>, templates: Arc<TemplateStore>) -> Self {
        Self { source, templates }
    }
}

#[async_trait]
impl<S: CalendarSource> CycleFetch for LedgerFetch<S> {
    type Key = LedgerKey;
    type Data = LedgerView;

    fn name(&self) -> &'static str {
        "ledger"
    }

    async fn fetch(&self, key: &LedgerKey) -> Result<LedgerView, CalendarError> {
        let (template, appointments) = tokio::join!(
            self.templates.get_template(self.source.as_ref(), &key.fixer),
            self.source
                .fetch_six_month_ledger(&key.fixer, key.window.anchor),
        );
        let appointments = appointments.map_err(|source| CalendarError::Ledger {
            fixer: key.fixer.clone(),
            anchor: key.window.anchor,
            source,
        })?;
        let (template, template_error) = match template {
            Ok(t) => (t, None),
            Err(e) => {
                warn!(fixer = %key.fixer, "{e}; treating every hour as disabled");
                (Arc::new(AvailabilityTemplate::new()), Some(e))
            }
        };
        debug!(
            fixer = %key.fixer,
            anchor = %key.window.anchor,
            appointments = appointments.len(),
            "ledger loaded"
        );
        Ok(LedgerView {
            template,
            ledger: SixMonthLedger::new(key.window, appointments),
            template_error,
        })
    }
}

// ── Day cycle ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DayKey {
    pub fixer: UserId,
    pub requester: UserId,
    pub day: NaiveDate,
}

pub struct DayFetch<S> {
    source: Arc<S>,
}

impl<S: CalendarSource> DayFetch<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl<S: CalendarSource> CycleFetch for DayFetch<S> {
    type Key = DayKey;
    type Data = DaySnapshot;

    fn name(&self) -> &'static str {
        "day"
    }

    async fn fetch(&self, key: &DayKey) -> Result<DaySnapshot, CalendarError> {
        fetch_day_snapshot(self.source.as_ref(), key).await
    }
}

/// Issue the four day-scoped queries concurrently and wait for all of them.
/// The snapshot is built only if every query succeeded.
pub async fn fetch_day_snapshot<S: CalendarSource + ?Sized>(
    source: &S,
    key: &DayKey,
) -> Result<DaySnapshot, CalendarError> {
    let (fixer, requester, day) = (key.fixer.as_str(), key.requester.as_str(), key.day);
    let (mine, others, by_fixer, by_requester) = join4(
        source.get_booked_by_requester(fixer, requester, day),
        source.get_booked_by_others(fixer, requester, day),
        source.get_fixer_cancellations(fixer, requester, day),
        source.get_requester_cancellations(fixer, requester, day),
    )
    .await;

    let results = [
        (DaySlice::BookedByRequester, mine),
        (DaySlice::BookedByOthers, others),
        (DaySlice::FixerCancellations, by_fixer),
        (DaySlice::RequesterCancellations, by_requester),
    ];
    let mut sets = [HourSet::EMPTY; 4];
    let mut failed = Vec::new();
    for (i, (slice, result)) in results.into_iter().enumerate() {
        match result {
            Ok(hours) => sets[i] = hours,
            Err(e) => {
                warn!(%day, slice = slice.path(), "day query failed: {e}");
                failed.push((slice, e));
            }
        }
    }
    if !failed.is_empty() {
        return Err(CalendarError::DaySnapshot { day, failed });
    }

    let [booked_by_me, occupied_by_others, cancelled_by_fixer, cancelled_by_requester] = sets;
    let snapshot = DaySnapshot {
        day: Some(day),
        booked_by_me,
        occupied_by_others,
        cancelled_by_fixer,
        cancelled_by_requester,
    };
    for (a, b) in snapshot.overlaps() {
        warn!(%day, "day sets {a} and {b} share hours");
    }
    Ok(snapshot)
}
