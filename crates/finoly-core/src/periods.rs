//! Named time periods to absolute date ranges
//!
//! Maps phrases like "this week" or "last month" (and bare years such as
//! "2023") to an inclusive range anchored at the moment of the call. Arithmetic
//! happens in local wall-clock time; the serialized instants carry a literal
//! `Z` suffix because the generated query text feeds them to a JavaScript
//! `new Date(...)` consumer that expects exactly that shape.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Serialization format for range boundaries (millisecond precision)
pub const ISO_MILLIS_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Inclusive date range; `start` is at 00:00:00.000 and `end` at 23:59:59.999
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl DateRange {
    /// Range covering whole days from `first` through `last`
    pub fn days(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: first.and_time(start_of_day()),
            end: last.and_time(end_of_day()),
        }
    }

    pub fn start_iso(&self) -> String {
        self.start.format(ISO_MILLIS_FORMAT).to_string()
    }

    pub fn end_iso(&self) -> String {
        self.end.format(ISO_MILLIS_FORMAT).to_string()
    }
}

type PeriodFn = fn(NaiveDate) -> DateRange;

/// Named period vocabulary; adding a phrase means adding a row
const NAMED_PERIODS: &[(&str, PeriodFn)] = &[
    ("today", today),
    ("yesterday", yesterday),
    ("this week", this_week),
    ("last week", last_week),
    ("this month", this_month),
    ("last month", last_month),
    ("this year", this_year),
    ("last year", last_year),
];

/// Phrases understood by [`resolve_period`] besides bare years
pub fn known_periods() -> Vec<&'static str> {
    NAMED_PERIODS.iter().map(|(name, _)| *name).collect()
}

/// Resolve a period phrase against the current local time
///
/// Returns `None` for anything that is neither a known phrase nor an integer year.
pub fn resolve_period(phrase: &str) -> Option<DateRange> {
    resolve_period_at(phrase, Local::now().naive_local())
}

/// Resolve a period phrase against a fixed `now`
pub fn resolve_period_at(phrase: &str, now: NaiveDateTime) -> Option<DateRange> {
    let phrase = phrase.trim().to_ascii_lowercase();
    let today = now.date();

    if let Some((_, period)) = NAMED_PERIODS.iter().find(|(name, _)| *name == phrase) {
        return Some(period(today));
    }

    let year: i32 = phrase.parse().ok()?;
    year_range(year)
}

fn start_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(0, 0, 0, 0).expect("valid midnight")
}

fn end_of_day() -> NaiveTime {
    NaiveTime::from_hms_milli_opt(23, 59, 59, 999).expect("valid end-of-day time")
}

fn today(today: NaiveDate) -> DateRange {
    DateRange::days(today, today)
}

fn yesterday(today: NaiveDate) -> DateRange {
    let day = today - Duration::days(1);
    DateRange::days(day, day)
}

fn this_week(today: NaiveDate) -> DateRange {
    let monday = today - Duration::days(today.weekday().num_days_from_monday() as i64);
    DateRange::days(monday, monday + Duration::days(6))
}

fn last_week(today: NaiveDate) -> DateRange {
    let monday = this_week(today).start.date() - Duration::days(7);
    DateRange::days(monday, monday + Duration::days(6))
}

fn this_month(today: NaiveDate) -> DateRange {
    month_range(today.year(), today.month())
}

fn last_month(today: NaiveDate) -> DateRange {
    if today.month() == 1 {
        month_range(today.year() - 1, 12)
    } else {
        month_range(today.year(), today.month() - 1)
    }
}

fn this_year(today: NaiveDate) -> DateRange {
    // The current year always fits, so the fallback is never taken
    year_range(today.year()).unwrap_or_else(|| DateRange::days(today, today))
}

fn last_year(today: NaiveDate) -> DateRange {
    year_range(today.year() - 1).unwrap_or_else(|| DateRange::days(today, today))
}

/// First through last calendar day of a month (leap years included)
fn month_range(year: i32, month: u32) -> DateRange {
    let first = NaiveDate::from_ymd_opt(year, month, 1).expect("valid first of month");
    let next_first = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next_first
        .and_then(|d| d.pred_opt())
        .unwrap_or(first);
    DateRange::days(first, last)
}

/// Jan 1 through Dec 31; only four-digit-formattable years are accepted
fn year_range(year: i32) -> Option<DateRange> {
    if !(1..=9999).contains(&year) {
        return None;
    }
    Some(DateRange::days(
        NaiveDate::from_ymd_opt(year, 1, 1)?,
        NaiveDate::from_ymd_opt(year, 12, 31)?,
    ))
}
