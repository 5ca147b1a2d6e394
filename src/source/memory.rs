use std::time::Duration;

use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use dashmap::{DashMap, DashSet};

use crate::limits::LEDGER_WINDOW_MONTHS;
use crate::model::*;

use super::{CalendarSource, DaySlice, Endpoint, SourceError};

/// Source backed by in-process maps. Day slices are derived from the stored
/// appointments the same way the backend derives them.
pub struct InMemorySource {
    templates: DashMap<UserId, AvailabilityTemplate>,
    appointments: DashMap<UserId, Vec<Appointment>>,
    failing: DashSet<Endpoint>,
    latency: DashMap<Endpoint, Duration>,
    day_latency: DashMap<NaiveDate, Duration>,
    calls: DashMap<Endpoint, usize>,
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySource {
    pub fn new() -> Self {
        Self {
            templates: DashMap::new(),
            appointments: DashMap::new(),
            failing: DashSet::new(),
            latency: DashMap::new(),
            day_latency: DashMap::new(),
            calls: DashMap::new(),
        }
    }

    // ── Data ─────────────────────────────────────────────────

    pub fn set_template(&self, fixer: &str, template: AvailabilityTemplate) {
        self.templates.insert(fixer.to_string(), template);
    }

    /// Append an appointment; fetch order is insertion order.
    pub fn add_appointment(&self, appointment: Appointment) {
        self.appointments
            .entry(appointment.fixer_id.clone())
            .or_default()
            .push(appointment);
    }

    pub fn clear_appointments(&self, fixer: &str) {
        self.appointments.remove(fixer);
    }

    // ── Fault and latency injection ──────────────────────────

    pub fn fail(&self, endpoint: Endpoint) {
        self.failing.insert(endpoint);
    }

    pub fn heal(&self, endpoint: Endpoint) {
        self.failing.remove(&endpoint);
    }

    pub fn set_latency(&self, endpoint: Endpoint, latency: Duration) {
        self.latency.insert(endpoint, latency);
    }

    /// Extra latency for every day-scoped call on `day`.
    pub fn set_day_latency(&self, day: NaiveDate, latency: Duration) {
        self.day_latency.insert(day, latency);
    }

    /// Number of calls made to `endpoint` so far.
    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.calls.get(&endpoint).map(|e| *e.value()).unwrap_or(0)
    }

    async fn enter(&self, endpoint: Endpoint, day: Option<NaiveDate>) -> Result<(), SourceError> {
        *self.calls.entry(endpoint).or_default() += 1;
        let mut wait = self.latency.get(&endpoint).map(|e| *e.value()).unwrap_or_default();
        if let Some(day) = day
            && let Some(extra) = self.day_latency.get(&day)
        {
            wait += *extra.value();
        }
        if !wait.is_zero() {
            tokio::time::sleep(wait).await;
        }
        if self.failing.contains(&endpoint) {
            return Err(SourceError::Unreachable(format!("{} unavailable", endpoint.label())));
        }
        Ok(())
    }

    fn hours_matching(
        &self,
        fixer: &str,
        day: NaiveDate,
        pred: impl Fn(&Appointment) -> bool,
    ) -> HourSet {
        self.appointments
            .get(fixer)
            .map(|list| {
                list.iter()
                    .filter(|a| a.starting_time.date() == day && pred(a))
                    .map(|a| a.slot().hour)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn slice(&self, slice: DaySlice, fixer: &str, requester: &str, day: NaiveDate) -> HourSet {
        match slice {
            DaySlice::BookedByRequester => {
                self.hours_matching(fixer, day, |a| a.requester_id == requester && a.is_active())
            }
            DaySlice::BookedByOthers => {
                self.hours_matching(fixer, day, |a| a.requester_id != requester && a.is_active())
            }
            DaySlice::FixerCancellations => self.hours_matching(fixer, day, |a| {
                a.requester_id == requester && a.cancelled_by_fixer
            }),
            DaySlice::RequesterCancellations => self.hours_matching(fixer, day, |a| {
                a.requester_id == requester
                    && !a.cancelled_by_fixer
                    && a.schedule_state == ScheduleState::Cancelled
            }),
        }
    }
}

#[async_trait]
impl CalendarSource for InMemorySource {
    async fn get_template(&self, fixer: &str) -> Result<AvailabilityTemplate, SourceError> {
        self.enter(Endpoint::Template, None).await?;
        Ok(self
            .templates
            .get(fixer)
            .map(|e| e.value().clone())
            .unwrap_or_default())
    }

    async fn fetch_six_month_ledger(
        &self,
        fixer: &str,
        anchor: NaiveDate,
    ) -> Result<Vec<Appointment>, SourceError> {
        self.enter(Endpoint::Ledger, None).await?;
        let end = anchor
            .checked_add_months(Months::new(LEDGER_WINDOW_MONTHS))
            .unwrap_or(NaiveDate::MAX);
        Ok(self
            .appointments
            .get(fixer)
            .map(|list| {
                list.iter()
                    .filter(|a| {
                        let day = a.starting_time.date();
                        anchor <= day && day < end
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_booked_by_requester(
        &self,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError> {
        self.get_day_slice(DaySlice::BookedByRequester, fixer, requester, day)
            .await
    }

    async fn get_booked_by_others(
        &self,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError> {
        self.get_day_slice(DaySlice::BookedByOthers, fixer, requester, day)
            .await
    }

    async fn get_fixer_cancellations(
        &self,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError> {
        self.get_day_slice(DaySlice::FixerCancellations, fixer, requester, day)
            .await
    }

    async fn get_requester_cancellations(
        &self,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError> {
        self.get_day_slice(DaySlice::RequesterCancellations, fixer, requester, day)
            .await
    }

    async fn get_day_slice(
        &self,
        slice: DaySlice,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError> {
        self.enter(Endpoint::Day(slice), Some(day)).await?;
        Ok(self.slice(slice, fixer, requester, day))
    }
}
