//! Expense records extracted from model replies
//!
//! The model returns loosely-typed line items. [`normalize_expense`] validates
//! one item and fills in defaults; items without a usable amount or category
//! are dropped rather than reported.

use chrono::{Duration, NaiveDateTime};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Output format for expense dates (e.g. `18/10/26`)
pub const DATE_FORMAT: &str = "%d/%m/%y";

/// Output format for expense times before lowercasing (e.g. `02PM`)
pub const TIME_FORMAT: &str = "%I%p";

/// A validated expense line item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    /// Digits and dots only, never zero (e.g. "50.00")
    pub amount: String,
    /// Lowercased spending category
    pub category: String,
    /// Day/month/2-digit-year
    pub date: String,
    /// Hour plus am/pm, e.g. "10am"
    pub time: String,
}

/// Validate and normalize one extracted item
///
/// Returns `None` when the item is not an object, lacks an amount or category,
/// or the amount has no non-zero digit once currency noise is stripped.
pub fn normalize_expense(item: &Value, now: NaiveDateTime) -> Option<ExpenseRecord> {
    let fields = item.as_object()?;

    let amount = fields.get("amount").filter(|v| is_truthy(v))?;
    let category = fields.get("category").filter(|v| is_truthy(v))?;

    let amount = clean_amount(&value_text(amount))?;

    Some(ExpenseRecord {
        amount,
        category: value_text(category).to_lowercase(),
        date: resolve_date(fields.get("date"), now),
        time: resolve_time(fields.get("time"), now),
    })
}

/// Strip everything except digits and dots; reject amounts that are zero
pub fn clean_amount(raw: &str) -> Option<String> {
    let non_numeric = Regex::new(r"[^\d.]").expect("valid regex");
    let cleaned = non_numeric.replace_all(raw, "").to_string();

    if cleaned.chars().any(|c| matches!(c, '1'..='9')) {
        Some(cleaned)
    } else {
        None
    }
}

fn resolve_date(value: Option<&Value>, now: NaiveDateTime) -> String {
    let Some(value) = value.filter(|v| is_present(v)) else {
        return now.format(DATE_FORMAT).to_string();
    };

    let text = value_text(value);
    match text.to_lowercase().as_str() {
        "today" | "now" => now.format(DATE_FORMAT).to_string(),
        "yesterday" => (now - Duration::days(1)).format(DATE_FORMAT).to_string(),
        "tomorrow" => (now + Duration::days(1)).format(DATE_FORMAT).to_string(),
        _ => text,
    }
}

fn resolve_time(value: Option<&Value>, now: NaiveDateTime) -> String {
    match value.filter(|v| is_present(v)) {
        Some(value) => value_text(value),
        None => now.format(TIME_FORMAT).to_string().to_lowercase(),
    }
}

/// Truthy and not the literal string "null"
fn is_present(value: &Value) -> bool {
    is_truthy(value) && value.as_str() != Some("null")
}

/// JSON truthiness: null, false, 0, "", [] and {} are all empty
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Textual form of a JSON value (strings unquoted)
fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
