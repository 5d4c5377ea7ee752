//! Calendar periods (year-month) and dividend event dates.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveDateTime};

use crate::error::Error;

/// A calendar month, the bucket key for forecasts and the ledger.
///
/// Orders chronologically. Displays as `YYYY-MM`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Period {
    year: i32,
    month: u32,
}

impl Period {
    /// Create a period. `month` is 1-based; years are limited to 1..=9999.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=9999).contains(&year) && (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    /// The period containing `date`.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    #[inline]
    pub fn year(&self) -> i32 {
        self.year
    }

    #[inline]
    pub fn month(&self) -> u32 {
        self.month
    }

    /// Months since year 0. Deterministic and collision-free across years,
    /// so storage collaborators can derive a slot from it.
    pub fn ordinal(&self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month - 1)
    }

    /// Inverse of [`ordinal`](Self::ordinal).
    pub fn from_ordinal(ordinal: i64) -> Option<Self> {
        let year = i32::try_from(ordinal.div_euclid(12)).ok()?;
        let month = u32::try_from(ordinal.rem_euclid(12)).ok()? + 1;
        Self::new(year, month)
    }

    /// The following month.
    pub fn next(&self) -> Option<Self> {
        Self::from_ordinal(self.ordinal() + 1)
    }

    /// First day of the month.
    pub fn first_day(&self) -> NaiveDate {
        // year and month are range-checked on construction
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or_default()
    }

    /// Parse a period label (`2026-11`, `2026/11`) or any date
    /// [`EventDate::parse`] understands.
    pub fn parse(s: &str) -> Option<Self> {
        EventDate::parse(s).map(|d| d.period())
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Period::parse(s).ok_or_else(|| Error::InvalidPeriod(s.to_string()))
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Period {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Period {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
        Period::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid period: {raw:?}")))
    }
}

/// A dividend event date: either an exact day or only a month.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventDate {
    Day(NaiveDate),
    Month(Period),
}

const DAY_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"];

impl EventDate {
    /// Parse a date cell. Accepts full dates (`2026-11-15`, `2026/11/15`,
    /// `15.11.2026`), timestamps (`2026-11-15T09:00:00Z`,
    /// `2026-11-15 09:00:00`) and month labels (`2026-11`, `2026/11`).
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        for fmt in DAY_FORMATS {
            if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
                return Some(EventDate::Day(d));
            }
        }
        if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(s) {
            return Some(EventDate::Day(dt.date_naive()));
        }
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
            return Some(EventDate::Day(dt.date()));
        }

        parse_month_label(s).map(EventDate::Month)
    }

    /// The month this event falls in.
    pub fn period(&self) -> Period {
        match self {
            EventDate::Day(d) => Period::of(*d),
            EventDate::Month(p) => *p,
        }
    }

    /// True if the event is at or after `as_of`. A month-only date counts
    /// when it is the month of `as_of` or later.
    pub fn is_on_or_after(&self, as_of: NaiveDate) -> bool {
        match self {
            EventDate::Day(d) => *d >= as_of,
            EventDate::Month(p) => *p >= Period::of(as_of),
        }
    }
}

impl fmt::Display for EventDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventDate::Day(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            EventDate::Month(p) => write!(f, "{p}"),
        }
    }
}

fn parse_month_label(s: &str) -> Option<Period> {
    let (year, month) = s.split_once(['-', '/'])?;
    if year.len() != 4 || month.is_empty() || month.len() > 2 {
        return None;
    }
    if !year.bytes().all(|b| b.is_ascii_digit()) || !month.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Period::new(year.parse().ok()?, month.parse().ok()?)
}
