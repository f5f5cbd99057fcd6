//! Time-period resolution command

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate, NaiveDateTime};

use finoly_core::{known_periods, resolve_period_at};

pub fn cmd_period(phrase: &str, at: Option<&str>) -> Result<()> {
    let now = match at {
        Some(date) => parse_reference_date(date)?,
        None => Local::now().naive_local(),
    };

    println!("{}", describe_period(phrase, now));
    Ok(())
}

/// Midnight of a `YYYY-MM-DD` date
pub fn parse_reference_date(date: &str) -> Result<NaiveDateTime> {
    let day = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", date))?;
    day.and_hms_opt(0, 0, 0)
        .context("Invalid reference date")
}

/// Either the resolved range or the list of phrases we understand
pub fn describe_period(phrase: &str, now: NaiveDateTime) -> String {
    match resolve_period_at(phrase, now) {
        Some(range) => format!(
            "{}\n  start: {}\n  end:   {}",
            phrase.trim(),
            range.start_iso(),
            range.end_iso()
        ),
        None => format!(
            "Unrecognized time period '{}'.\nKnown periods: {}",
            phrase.trim(),
            known_periods().join(", ")
        ),
    }
}
