use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::NaiveDate;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::controller::{Controller, LoadStatus, Published};
use crate::engine::{CalendarError, LedgerView, LedgerWindow};
use crate::fetch::{DayFetch, DayKey, LedgerFetch, LedgerKey};
use crate::limits::MIN_POLL_INTERVAL_SECS;
use crate::model::*;
use crate::poll::{run_poller, Refresh};
use crate::source::CalendarSource;
use crate::templates::TemplateStore;

/// Inputs a calendar view is mounted with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarKey {
    pub fixer: UserId,
    /// `None` for the fixer's own view: no day-scoped cycle runs.
    pub requester: Option<UserId>,
    pub selected_day: NaiveDate,
}

pub type LedgerState = Published<LedgerKey, LedgerView>;
pub type DayState = Published<DayKey, DaySnapshot>;

struct Inner<S: CalendarSource> {
    templates: Arc<TemplateStore>,
    ledger: Controller<LedgerFetch<S>>,
    day: Controller<DayFetch<S>>,
    key: Mutex<Option<CalendarKey>>,
}

impl<S: CalendarSource> Inner<S> {
    fn key(&self) -> Option<CalendarKey> {
        self.key.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Bring both controllers in line with `key`, dispatching only what changed.
    fn sync(&self, key: &CalendarKey) {
        let ledger_key = match self.ledger.key() {
            // navigation inside the cached window keeps the ledger
            Some(k) if k.fixer == key.fixer && k.window.contains(key.selected_day) => k,
            _ => LedgerKey {
                fixer: key.fixer.clone(),
                window: LedgerWindow::for_day(key.selected_day),
            },
        };
        self.ledger.dispatch_if_changed(ledger_key);

        match &key.requester {
            Some(requester) => {
                self.day.dispatch_if_changed(DayKey {
                    fixer: key.fixer.clone(),
                    requester: requester.clone(),
                    day: key.selected_day,
                });
            }
            None => self.day.reset(),
        }
    }

    /// Store `key` and dispatch for it under the key lock, so concurrent
    /// input changes dispatch in the same order they were stored.
    fn mount(&self, key: CalendarKey) {
        let mut guard = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        self.sync(&key);
        *guard = Some(key);
    }

    fn update(&self, change: impl FnOnce(&mut CalendarKey)) -> bool {
        let mut guard = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(key) = guard.as_mut() else {
            return false;
        };
        change(key);
        self.sync(key);
        true
    }

    fn refetch_all(&self) {
        let guard = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(key) = guard.as_ref() {
            self.templates.invalidate(&key.fixer);
        }
        self.ledger.refetch();
        self.day.refetch();
    }

    fn refetch_hour(&self) -> bool {
        let _guard = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        self.day.refetch().is_some()
    }
}

impl<S: CalendarSource> Refresh for Inner<S> {
    fn refresh(&self) -> bool {
        self.refetch_hour()
    }
}

/// One mounted calendar view: a ledger cycle for the six-month window and a
/// day cycle for the selected day, both re-dispatched on input changes.
///
/// Classification reads the latest published views and never waits.
pub struct Calendar<S: CalendarSource> {
    inner: Arc<Inner<S>>,
    poller: Mutex<Option<CancellationToken>>,
}

impl<S: CalendarSource> Calendar<S> {
    pub fn new(source: Arc<S>) -> Self {
        Self::with_templates(source, Arc::new(TemplateStore::new()))
    }

    /// Share a template cache between views.
    pub fn with_templates(source: Arc<S>, templates: Arc<TemplateStore>) -> Self {
        let inner = Inner {
            ledger: Controller::new(LedgerFetch::new(source.clone(), templates.clone())),
            day: Controller::new(DayFetch::new(source)),
            templates,
            key: Mutex::new(None),
        };
        Self {
            inner: Arc::new(inner),
            poller: Mutex::new(None),
        }
    }

    // ── Inputs ───────────────────────────────────────────────

    /// Set all inputs and start both cycles.
    /// Must be called within a Tokio runtime, as must every input change below.
    pub fn mount(&self, key: CalendarKey) {
        debug!(fixer = %key.fixer, day = %key.selected_day, "calendar mounted");
        self.inner.mount(key);
    }

    /// Returns false if the calendar is not mounted.
    pub fn select_day(&self, day: NaiveDate) -> bool {
        self.inner.update(|k| k.selected_day = day)
    }

    pub fn set_fixer(&self, fixer: &str) -> bool {
        self.inner.update(|k| k.fixer = fixer.to_string())
    }

    pub fn set_requester(&self, requester: Option<&str>) -> bool {
        self.inner.update(|k| k.requester = requester.map(str::to_string))
    }

    pub fn key(&self) -> Option<CalendarKey> {
        self.inner.key()
    }

    // ── Refresh ──────────────────────────────────────────────

    /// Reload template, ledger and day for the current key.
    /// Must be called within a Tokio runtime, as must `refetch_hour`.
    pub fn refetch_all(&self) {
        self.inner.refetch_all();
    }

    /// Reload only the selected day's hour sets.
    pub fn refetch_hour(&self) -> bool {
        self.inner.refetch_hour()
    }

    /// Periodically call `refetch_hour` until stopped or dropped.
    /// Must be called within a Tokio runtime.
    pub fn start_polling(&self, period: Duration) {
        let period = period.max(Duration::from_secs(MIN_POLL_INTERVAL_SECS));
        let token = CancellationToken::new();
        let previous = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }
        info!("polling every {}s", period.as_secs());
        tokio::spawn(run_poller(Arc::downgrade(&self.inner), period, token));
    }

    pub fn stop_polling(&self) {
        if let Some(token) = self.poller.lock().unwrap_or_else(PoisonError::into_inner).take() {
            token.cancel();
        }
    }

    // ── State ────────────────────────────────────────────────

    pub fn loading(&self) -> bool {
        self.inner.ledger.loading() || self.inner.day.loading()
    }

    pub fn ledger_status(&self) -> LoadStatus {
        self.inner.ledger.status()
    }

    pub fn day_status(&self) -> LoadStatus {
        self.inner.day.status()
    }

    /// Errors of the last settled cycles, ledger first.
    pub fn errors(&self) -> Vec<CalendarError> {
        let mut out = Vec::new();
        let ledger = self.inner.ledger.current();
        out.extend(ledger.error);
        out.extend(ledger.data.template_error.clone());
        out.extend(self.inner.day.error());
        out
    }

    pub fn ledger_view(&self) -> Arc<LedgerView> {
        self.inner.ledger.data()
    }

    /// Day-detail view; read its predicates directly.
    pub fn day_view(&self) -> Arc<DaySnapshot> {
        self.inner.day.data()
    }

    pub fn subscribe_ledger(&self) -> watch::Receiver<LedgerState> {
        self.inner.ledger.subscribe()
    }

    pub fn subscribe_day(&self) -> watch::Receiver<DayState> {
        self.inner.day.subscribe()
    }

    /// Wait until neither cycle is loading.
    pub async fn wait_settled(&self) {
        let mut ledger = self.inner.ledger.subscribe();
        let mut day = self.inner.day.subscribe();
        while self.loading() {
            let _ = ledger.wait_for(|p| !p.loading()).await;
            let _ = day.wait_for(|p| !p.loading()).await;
        }
    }

    // ── Classification ───────────────────────────────────────

    pub fn is_hour_booked_fixer(&self, day: NaiveDate, hour: Hour) -> bool {
        self.ledger_view().is_hour_booked_fixer(day, hour)
    }

    pub fn is_hour_booked(&self, day: NaiveDate, hour: Hour, requester: &str) -> BookingStatus {
        self.ledger_view().is_hour_booked(day, hour, requester)
    }

    pub fn is_enabled(&self, day: NaiveDate, hour: Hour) -> bool {
        self.ledger_view().is_enabled(day, hour)
    }

    pub fn is_canceled(&self, day: NaiveDate, hour: Hour, requester: &str) -> CancelStatus {
        self.ledger_view().is_canceled(day, hour, requester)
    }

    pub fn slot_state(&self, day: NaiveDate, hour: Hour, requester: &str) -> SlotState {
        self.ledger_view().slot_state(day, hour, requester)
    }
}

impl<S: CalendarSource> Drop for Calendar<S> {
    fn drop(&mut self) {
        self.stop_polling();
    }
}
