use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Url;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::limits::*;
use crate::model::*;
use crate::observability::SOURCE_REQUESTS_TOTAL;

use super::{CalendarSource, DaySlice, Endpoint, SourceError};

/// JSON-over-HTTP backend.
///
/// Routes, relative to the base URL (ids are percent-encoded path segments):
/// - `GET fixers/{fixer}/availability`
/// - `GET fixers/{fixer}/appointments?from={date}&months=6`
/// - `GET fixers/{fixer}/days/{date}/{slice}?requester={id}`
pub struct HttpSource {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSource {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, SourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SourceError::Unreachable(e.to_string()))?;
        let invalid = |why: String| SourceError::Unreachable(format!("invalid base URL: {why}"));
        let base_url = Url::parse(base_url).map_err(|e| invalid(format!("{base_url:?}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(invalid(base_url.to_string()));
        }
        Ok(Self { client, base_url })
    }

    /// Base URL with `segments` appended, each one percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        segments: &[&str],
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = self.url(segments);
        debug!(endpoint = endpoint.label(), %url, "GET");
        let result = self.send(endpoint, url, query).await;
        let status = if result.is_ok() { "ok" } else { "error" };
        metrics::counter!(SOURCE_REQUESTS_TOTAL, "endpoint" => endpoint.label(), "status" => status)
            .increment(1);
        result
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: Endpoint,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| SourceError::Unreachable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                code: status.as_u16(),
                endpoint,
            });
        }
        resp.json::<T>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))
    }

    async fn day_slice(
        &self,
        slice: DaySlice,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError> {
        let day = day.to_string();
        self.get_json(
            Endpoint::Day(slice),
            &["fixers", fixer, "days", &day, slice.path()],
            &[("requester", requester.to_string())],
        )
        .await
    }
}

#[async_trait]
impl CalendarSource for HttpSource {
    async fn get_template(&self, fixer: &str) -> Result<AvailabilityTemplate, SourceError> {
        self.get_json(Endpoint::Template, &["fixers", fixer, "availability"], &[])
            .await
    }

    async fn fetch_six_month_ledger(
        &self,
        fixer: &str,
        anchor: NaiveDate,
    ) -> Result<Vec<Appointment>, SourceError> {
        let appointments: Vec<Appointment> = self
            .get_json(
                Endpoint::Ledger,
                &["fixers", fixer, "appointments"],
                &[
                    ("from", anchor.to_string()),
                    ("months", LEDGER_WINDOW_MONTHS.to_string()),
                ],
            )
            .await?;
        if appointments.len() > MAX_LEDGER_APPOINTMENTS {
            return Err(SourceError::LimitExceeded("ledger response too large"));
        }
        Ok(appointments)
    }

    async fn get_booked_by_requester(
        &self,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError> {
        self.day_slice(DaySlice::BookedByRequester, fixer, requester, day)
            .await
    }

    async fn get_booked_by_others(
        &self,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError> {
        self.day_slice(DaySlice::BookedByOthers, fixer, requester, day)
            .await
    }

    async fn get_fixer_cancellations(
        &self,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError> {
        self.day_slice(DaySlice::FixerCancellations, fixer, requester, day)
            .await
    }

    async fn get_requester_cancellations(
        &self,
        fixer: &str,
        requester: &str,
        day: NaiveDate,
    ) -> Result<HourSet, SourceError> {
        self.day_slice(DaySlice::RequesterCancellations, fixer, requester, day)
            .await
    }
}
