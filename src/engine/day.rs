use chrono::NaiveDate;

use crate::model::*;

/// Day-detail predicates: plain membership in the snapshot's sets.
/// Every predicate is false for a day other than the snapshot's, except
/// `is_disabled`, which is true.
impl DaySnapshot {
    pub fn for_day(day: NaiveDate) -> Self {
        Self {
            day: Some(day),
            ..Self::default()
        }
    }

    pub fn is_for(&self, day: NaiveDate) -> bool {
        self.day == Some(day)
    }

    pub fn is_hour_booked(&self, day: NaiveDate, hour: Hour) -> bool {
        self.is_for(day) && self.booked_by_me.contains(hour)
    }

    pub fn is_occupied_by_other(&self, day: NaiveDate, hour: Hour) -> bool {
        self.is_for(day) && self.occupied_by_others.contains(hour)
    }

    pub fn is_cancelled_by_fixer(&self, day: NaiveDate, hour: Hour) -> bool {
        self.is_for(day) && self.cancelled_by_fixer.contains(hour)
    }

    pub fn is_cancelled_by_requester(&self, day: NaiveDate, hour: Hour) -> bool {
        self.is_for(day) && self.cancelled_by_requester.contains(hour)
    }

    /// The requester may not interact with this slot.
    pub fn is_disabled(&self, day: NaiveDate, hour: Hour) -> bool {
        !self.is_for(day)
            || self.occupied_by_others.contains(hour)
            || self.cancelled_by_fixer.contains(hour)
    }

    /// Pairs of sets that share an hour. The backend keeps them disjoint.
    pub fn overlaps(&self) -> Vec<(&'static str, &'static str)> {
        let sets = [
            ("booked_by_me", self.booked_by_me),
            ("occupied_by_others", self.occupied_by_others),
            ("cancelled_by_fixer", self.cancelled_by_fixer),
            ("cancelled_by_requester", self.cancelled_by_requester),
        ];
        let mut out = Vec::new();
        for (i, (a, sa)) in sets.iter().enumerate() {
            for (b, sb) in &sets[i + 1..] {
                if sa.intersects(sb) {
                    out.push((*a, *b));
                }
            }
        }
        out
    }
}
