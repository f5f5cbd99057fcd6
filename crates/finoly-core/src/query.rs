//! Query text generation for view requests
//!
//! Turns a [`FilterSpec`] into a fluent query-builder expression over the
//! `expense` and `team` tables, e.g.
//!
//! ```text
//! db.select().from(expense).where(and(eq(expense.category, 'food'), gt(expense.amount, 100)));
//! ```
//!
//! The text is handed to a downstream consumer; nothing here executes it.

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::periods::{resolve_period_at, DateRange};

/// Structured description of which expenses a view request wants
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default)]
    pub team: Option<String>,
    #[serde(default)]
    pub time_period: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub amount_range: Option<AmountRange>,
}

impl FilterSpec {
    /// At least one filter is set (blank strings count as unset)
    pub fn is_meaningful(&self) -> bool {
        present(&self.team).is_some()
            || present(&self.time_period).is_some()
            || present(&self.category).is_some()
            || self.amount_range.is_some()
    }
}

/// Comparison operator for amount filters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AmountOperator {
    Gt,
    Lt,
    Gte,
    Lte,
    Between,
}

impl AmountOperator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Between => "between",
        }
    }
}

/// A single bound or a `[low, high]` pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AmountValue {
    Single(f64),
    Pair([f64; 2]),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmountRange {
    pub operator: AmountOperator,
    pub value: AmountValue,
    /// The phrase the filter came from, e.g. "over 100"
    #[serde(default)]
    pub text: Option<String>,
}

impl AmountRange {
    /// Predicate text, or `None` when operator and value do not fit together
    fn predicate(&self) -> Option<String> {
        match (self.operator, self.value) {
            (AmountOperator::Between, AmountValue::Pair([low, high])) => {
                Some(format!("between(expense.amount, {}, {})", low, high))
            }
            (AmountOperator::Between, AmountValue::Single(_)) => None,
            (op, AmountValue::Single(v)) => Some(format!("{}(expense.amount, {})", op.as_str(), v)),
            (_, AmountValue::Pair(_)) => None,
        }
    }

    fn describe(&self) -> String {
        match (self.operator, self.value) {
            (AmountOperator::Between, AmountValue::Pair([low, high])) => {
                format!("with amount between {} and {}", low, high)
            }
            (op, AmountValue::Single(v)) => {
                let word = match op {
                    AmountOperator::Gt => "over",
                    AmountOperator::Lt => "under",
                    AmountOperator::Gte => "at least",
                    AmountOperator::Lte => "at most",
                    AmountOperator::Between => "around",
                };
                format!("with amount {} {}", word, v)
            }
            (_, AmountValue::Pair([low, high])) => {
                format!("with amount between {} and {}", low, high)
            }
        }
    }
}

/// Generated query plus what went into it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryPlan {
    pub query_code: String,
    pub filters: FilterSpec,
    pub explanation: String,
    /// Resolved time-period range, when one was applied
    pub date_range: Option<ResolvedRange>,
}

/// Serialized form of a resolved period as it appears in the query text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRange {
    pub period: String,
    pub start: String,
    pub end: String,
}

/// Build the query text for a filter spec, resolving periods against now
pub fn build_query(filters: &FilterSpec) -> QueryPlan {
    build_query_at(filters, Local::now().naive_local())
}

/// Build the query text with a fixed clock
pub fn build_query_at(filters: &FilterSpec, now: NaiveDateTime) -> QueryPlan {
    let mut query = String::from("db.select().from(expense)");
    let mut predicates: Vec<String> = Vec::new();
    let mut clauses: Vec<String> = Vec::new();
    let mut date_range = None;
    // The date predicate closes the list; the explanation keeps time second
    let mut date_filter = None;

    let team = present(&filters.team);
    if let Some(team) = team {
        query.push_str(".innerJoin(team, eq(expense.teamId, team.teamId))");
        predicates.push(format!("eq(team.name, '{}')", escape(team)));
        clauses.push(format!("for team '{}'", team));
    }

    if let Some(period) = present(&filters.time_period) {
        match resolve_period_at(period, now) {
            Some(range) => {
                date_filter = Some(date_predicate(&range));
                clauses.push(format!(
                    "from {} to {} ({})",
                    range.start.format("%Y-%m-%d"),
                    range.end.format("%Y-%m-%d"),
                    period
                ));
                date_range = Some(ResolvedRange {
                    period: period.to_string(),
                    start: range.start_iso(),
                    end: range.end_iso(),
                });
            }
            None => warn!(period = %period, "Unrecognized time period, omitting date filter"),
        }
    }

    if let Some(category) = present(&filters.category) {
        predicates.push(format!("eq(expense.category, '{}')", escape(category)));
        clauses.push(format!("in category '{}'", category));
    }

    if let Some(ref range) = filters.amount_range {
        match range.predicate() {
            Some(predicate) => {
                predicates.push(predicate);
                clauses.push(range.describe());
            }
            None => warn!(
                operator = range.operator.as_str(),
                "Amount value does not match operator, omitting amount filter"
            ),
        }
    }

    predicates.extend(date_filter);

    match predicates.len() {
        0 => {}
        1 => query.push_str(&format!(".where({})", predicates[0])),
        _ => query.push_str(&format!(".where(and({}))", predicates.join(", "))),
    }
    query.push(';');

    let explanation = if clauses.is_empty() {
        "Showing all expenses (no filters applied)".to_string()
    } else {
        format!("Showing expenses {}", clauses.join(", "))
    };

    QueryPlan {
        query_code: query,
        filters: filters.clone(),
        explanation,
        date_range,
    }
}

fn date_predicate(range: &DateRange) -> String {
    format!(
        "between(expense.date, new Date('{}'), new Date('{}'))",
        range.start_iso(),
        range.end_iso()
    )
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Escape single quotes for embedding in a quoted literal
fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 18)
            .unwrap()
            .and_hms_opt(9, 30, 0)
            .unwrap()
    }

    fn amount(operator: AmountOperator, value: AmountValue) -> Option<AmountRange> {
        Some(AmountRange {
            operator,
            value,
            text: None,
        })
    }

    #[test]
    fn test_no_filters() {
        let plan = build_query_at(&FilterSpec::default(), now());
        assert_eq!(plan.query_code, "db.select().from(expense);");
        assert_eq!(plan.explanation, "Showing all expenses (no filters applied)");
        assert!(plan.date_range.is_none());
    }

    #[test]
    fn test_single_amount_filter() {
        let filters = FilterSpec {
            amount_range: amount(AmountOperator::Gt, AmountValue::Single(100.0)),
            ..Default::default()
        };
        let plan = build_query_at(&filters, now());
        assert_eq!(
            plan.query_code,
            "db.select().from(expense).where(gt(expense.amount, 100));"
        );
        assert_eq!(plan.explanation, "Showing expenses with amount over 100");
    }

    #[test]
    fn test_team_and_month() {
        let filters = FilterSpec {
            team: Some("marketing".into()),
            time_period: Some("this month".into()),
            ..Default::default()
        };
        let plan = build_query_at(&filters, now());
        assert_eq!(
            plan.query_code,
            "db.select().from(expense).innerJoin(team, eq(expense.teamId, team.teamId))\
             .where(and(eq(team.name, 'marketing'), \
             between(expense.date, new Date('2026-10-01T00:00:00.000Z'), new Date('2026-10-31T23:59:59.999Z'))));"
        );
        assert_eq!(
            plan.explanation,
            "Showing expenses for team 'marketing', from 2026-10-01 to 2026-10-31 (this month)"
        );
        let range = plan.date_range.unwrap();
        assert_eq!(range.start, "2026-10-01T00:00:00.000Z");
        assert_eq!(range.end, "2026-10-31T23:59:59.999Z");
    }

    #[test]
    fn test_predicate_order() {
        let filters = FilterSpec {
            team: Some("sales".into()),
            time_period: Some("today".into()),
            category: Some("food".into()),
            amount_range: amount(AmountOperator::Between, AmountValue::Pair([50.0, 200.5])),
        };
        let plan = build_query_at(&filters, now());
        let team = plan.query_code.find("eq(team.name").unwrap();
        let date = plan.query_code.find("between(expense.date").unwrap();
        let category = plan.query_code.find("eq(expense.category").unwrap();
        let amount = plan.query_code.find("between(expense.amount, 50, 200.5)").unwrap();
        assert!(team < category && category < amount && amount < date);
        assert!(plan.explanation.starts_with("Showing expenses for team 'sales', from 2026-10-18"));
        assert!(plan.explanation.ends_with("in category 'food', with amount between 50 and 200.5"));
    }

    #[test]
    fn test_date_predicate_closes_query() {
        let filters = FilterSpec {
            team: Some("sales".into()),
            time_period: Some("today".into()),
            category: Some("food".into()),
            amount_range: amount(AmountOperator::Gt, AmountValue::Single(100.0)),
        };
        let plan = build_query_at(&filters, now());
        assert_eq!(
            plan.query_code,
            "db.select().from(expense).innerJoin(team, eq(expense.teamId, team.teamId))\
             .where(and(eq(team.name, 'sales'), eq(expense.category, 'food'), gt(expense.amount, 100), \
             between(expense.date, new Date('2026-10-18T00:00:00.000Z'), new Date('2026-10-18T23:59:59.999Z'))));"
        );
    }

    #[test]
    fn test_unknown_period_omitted() {
        let filters = FilterSpec {
            time_period: Some("next quarter".into()),
            category: Some("ads".into()),
            ..Default::default()
        };
        let plan = build_query_at(&filters, now());
        assert_eq!(
            plan.query_code,
            "db.select().from(expense).where(eq(expense.category, 'ads'));"
        );
        assert!(plan.date_range.is_none());
        assert!(!plan.explanation.contains("next quarter"));
    }

    #[test]
    fn test_mismatched_amount_omitted() {
        let filters = FilterSpec {
            amount_range: amount(AmountOperator::Between, AmountValue::Single(10.0)),
            ..Default::default()
        };
        let plan = build_query_at(&filters, now());
        assert_eq!(plan.query_code, "db.select().from(expense);");
    }

    #[test]
    fn test_quotes_escaped() {
        let filters = FilterSpec {
            category: Some("kid's toys".into()),
            ..Default::default()
        };
        let plan = build_query_at(&filters, now());
        assert!(plan.query_code.contains(r"eq(expense.category, 'kid\'s toys')"));
    }

    #[test]
    fn test_is_meaningful() {
        assert!(!FilterSpec::default().is_meaningful());
        let blank = FilterSpec {
            team: Some("  ".into()),
            ..Default::default()
        };
        assert!(!blank.is_meaningful());
        let year = FilterSpec {
            time_period: Some("2024".into()),
            ..Default::default()
        };
        assert!(year.is_meaningful());
    }

    #[test]
    fn test_filter_spec_deserialize() {
        let json = r#"{"team": null, "time_period": null, "category": null,
            "amount_range": {"operator": "between", "value": [50, 200], "text": "between 50 and 200"}}"#;
        let spec: FilterSpec = serde_json::from_str(json).unwrap();
        let range = spec.amount_range.unwrap();
        assert_eq!(range.operator, AmountOperator::Between);
        assert_eq!(range.value, AmountValue::Pair([50.0, 200.0]));
        assert_eq!(range.text.as_deref(), Some("between 50 and 200"));
    }
}
