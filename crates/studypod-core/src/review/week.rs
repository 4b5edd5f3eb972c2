use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// ISO-8601 week identifier (`2025-W23`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WeekKey {
    pub year: i32,
    pub week: u32,
}

impl WeekKey {
    /// Week containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        let iso = date.iso_week();
        Self {
            year: iso.year(),
            week: iso.week(),
        }
    }

    /// Monday of this week.
    pub fn start(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Mon)
    }

    /// Sunday of this week.
    pub fn end(&self) -> Option<NaiveDate> {
        NaiveDate::from_isoywd_opt(self.year, self.week, Weekday::Sun)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        WeekKey::of(date) == *self
    }

    /// The week before this one.
    pub fn previous(&self) -> Option<Self> {
        self.start()
            .and_then(|monday| monday.checked_sub_signed(Duration::days(7)))
            .map(WeekKey::of)
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.year, self.week)
    }
}

impl FromStr for WeekKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidValue {
            field: "week".into(),
            message: format!("expected YYYY-Www, got '{s}'"),
        };
        let (year, week) = s.trim().split_once("-W").ok_or_else(invalid)?;
        let key = WeekKey {
            year: year.parse().map_err(|_| invalid())?,
            week: week.parse().map_err(|_| invalid())?,
        };
        // Rejects week 53 in 52-week years as well as 0 and >53
        key.start().ok_or_else(invalid)?;
        Ok(key)
    }
}
