use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike, Weekday};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use ulid::Ulid;

use crate::limits::HOURS_PER_DAY;

/// Identity of a fixer or requester as issued by the backend.
pub type UserId = String;

/// Hour of day, `0..24`.
pub type Hour = u8;

/// One bookable hour on a calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Slot {
    pub day: NaiveDate,
    pub hour: Hour,
}

impl Slot {
    pub fn new(day: NaiveDate, hour: Hour) -> Self {
        Self { day, hour }
    }

    /// Slot of a timestamp, truncated to the hour.
    pub fn of(time: &NaiveDateTime) -> Self {
        Self {
            day: time.date(),
            hour: time.hour() as Hour,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:02}:00", self.day, self.hour)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleState {
    Booked,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Ulid,
    pub fixer_id: UserId,
    pub requester_id: UserId,
    pub starting_time: NaiveDateTime,
    pub schedule_state: ScheduleState,
    /// Attribution of a cancellation; independent of `schedule_state`.
    #[serde(default)]
    pub cancelled_by_fixer: bool,
}

impl Appointment {
    pub fn slot(&self) -> Slot {
        Slot::of(&self.starting_time)
    }

    /// Booked and not withdrawn by the fixer.
    pub fn is_active(&self) -> bool {
        self.schedule_state == ScheduleState::Booked && !self.cancelled_by_fixer
    }
}

// ── Hour sets ───────────────────────────────────────────────────

/// Set of hours within one day, one bit per hour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct HourSet(u32);

impl HourSet {
    pub const EMPTY: HourSet = HourSet(0);

    pub fn insert(&mut self, hour: Hour) -> bool {
        if hour >= HOURS_PER_DAY {
            return false;
        }
        let bit = 1u32 << hour;
        let fresh = self.0 & bit == 0;
        self.0 |= bit;
        fresh
    }

    pub fn contains(&self, hour: Hour) -> bool {
        hour < HOURS_PER_DAY && self.0 & (1u32 << hour) != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn intersects(&self, other: &HourSet) -> bool {
        self.0 & other.0 != 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Hour> + use<> {
        let bits = self.0;
        (0..HOURS_PER_DAY).filter(move |h| bits & (1u32 << *h) != 0)
    }
}

impl FromIterator<Hour> for HourSet {
    fn from_iter<I: IntoIterator<Item = Hour>>(iter: I) -> Self {
        let mut set = HourSet::EMPTY;
        for h in iter {
            set.insert(h);
        }
        set
    }
}

impl Serialize for HourSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter())
    }
}

impl<'de> Deserialize<'de> for HourSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hours = Vec::<Hour>::deserialize(deserializer)?;
        if let Some(bad) = hours.iter().find(|h| **h >= HOURS_PER_DAY) {
            return Err(serde::de::Error::custom(format!("hour out of range: {bad}")));
        }
        Ok(hours.into_iter().collect())
    }
}

// ── Availability template ───────────────────────────────────────

/// A fixer's recurring weekly schedule: enabled hours per weekday.
/// Anything not listed is disabled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AvailabilityTemplate {
    /// Indexed by `Weekday::num_days_from_monday()`.
    days: [HourSet; 7],
}

impl AvailabilityTemplate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hours(mut self, weekday: Weekday, hours: impl IntoIterator<Item = Hour>) -> Self {
        self.set_hours(weekday, hours.into_iter().collect());
        self
    }

    pub fn set_hours(&mut self, weekday: Weekday, hours: HourSet) {
        self.days[weekday.num_days_from_monday() as usize] = hours;
    }

    pub fn hours(&self, weekday: Weekday) -> HourSet {
        self.days[weekday.num_days_from_monday() as usize]
    }

    pub fn is_enabled(&self, day: NaiveDate, hour: Hour) -> bool {
        self.hours(day.weekday()).contains(hour)
    }

    pub fn is_empty(&self) -> bool {
        self.days.iter().all(HourSet::is_empty)
    }
}

impl Serialize for AvailabilityTemplate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            WEEKDAYS
                .iter()
                .map(|w| (weekday_name(*w), self.hours(*w)))
                .filter(|(_, hours)| !hours.is_empty()),
        )
    }
}

impl<'de> Deserialize<'de> for AvailabilityTemplate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, HourSet>::deserialize(deserializer)?;
        let mut template = AvailabilityTemplate::new();
        for (name, hours) in raw {
            let weekday = Weekday::from_str(&name)
                .map_err(|_| serde::de::Error::custom(format!("unknown weekday: {name}")))?;
            template.set_hours(weekday, hours);
        }
        Ok(template)
    }
}

const WEEKDAYS: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

// ── Day snapshot ────────────────────────────────────────────────

/// Booking/cancellation status of one day, decomposed into four hour sets.
/// The default snapshot belongs to no day.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaySnapshot {
    pub day: Option<NaiveDate>,
    pub booked_by_me: HourSet,
    pub occupied_by_others: HourSet,
    pub cancelled_by_fixer: HourSet,
    pub cancelled_by_requester: HourSet,
}

// ── Classification results ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    /// Booked by the requester asking.
    Mine,
    /// Booked by another requester.
    Other,
    NotBooked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CancelStatus {
    /// The asking requester's appointment, cancelled by the fixer.
    Fixer,
    /// The asking requester's appointment, cancelled by them.
    Requester,
    OtherFixer,
    OtherRequester,
    NotCancel,
}

/// Folded per-cell state for grid consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotState {
    Disabled,
    Free,
    BookedByMe,
    BookedByOther,
    Cancelled(CancelStatus),
}
