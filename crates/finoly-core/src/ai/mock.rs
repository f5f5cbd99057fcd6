//! Mock backend for testing
//!
//! Answers each task with a deterministic keyword heuristic, so the whole
//! pipeline runs without a model server. Tests can also queue exact replies
//! (or failures) that are handed out before the heuristics kick in.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use regex::Regex;
use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::periods::known_periods;
use crate::prompts::PromptId;

use super::types::ModelReply;
use super::AIBackend;

const ADDITION_VERBS: &[&str] = &["add", "spent", "bought", "purchased", "paid", "spend"];
const VIEW_VERBS: &[&str] = &[
    "show", "view", "see", "list", "check", "history", "summary", "how much", "over", "under",
    "between", "above", "below",
];
/// Lean towards view only when nothing stronger is present
const VIEW_HINTS: &[&str] = &["expenses", "costs", "cost"];

/// Categories the heuristics recognize without an "on <x>" phrase
const KNOWN_CATEGORIES: &[&str] = &[
    "food",
    "groceries",
    "transport",
    "taxi",
    "coffee",
    "rent",
    "utilities",
    "ads",
    "software",
    "travel",
    "entertainment",
    "shopping",
    "fuel",
];

/// One queued answer for [`MockBackend::scripted`]
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Reply(ModelReply),
    /// Fails the call as if the provider were down
    Fail(String),
}

impl ScriptedReply {
    pub fn text(text: &str) -> Self {
        ScriptedReply::Reply(ModelReply::Text(text.to_string()))
    }
}

/// Mock AI backend for testing
#[derive(Clone)]
pub struct MockBackend {
    /// Whether health_check should return true
    pub healthy: bool,
    model: String,
    /// When set, every call fails with this message, script or not
    outage: Option<String>,
    script: Arc<Mutex<VecDeque<ScriptedReply>>>,
    calls: Arc<Mutex<Vec<PromptId>>>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    /// Create a new mock backend (healthy, heuristic answers)
    pub fn new() -> Self {
        Self {
            healthy: true,
            model: "mock".to_string(),
            outage: None,
            script: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            ..Self::new()
        }
    }

    /// Hand out `replies` in order, then fall back to the heuristics
    pub fn scripted(replies: Vec<ScriptedReply>) -> Self {
        let backend = Self::new();
        if let Ok(mut script) = backend.script.lock() {
            script.extend(replies);
        }
        backend
    }

    /// Every call fails as a provider outage
    pub fn failing(message: &str) -> Self {
        Self {
            outage: Some(message.to_string()),
            ..Self::new()
        }
    }

    pub fn with_model(&self, model: &str) -> Self {
        Self {
            model: model.to_string(),
            ..self.clone()
        }
    }

    /// Tasks requested so far, in order (shared between clones)
    pub fn calls(&self) -> Vec<PromptId> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn next_scripted(&self) -> Option<ScriptedReply> {
        self.script.lock().ok().and_then(|mut s| s.pop_front())
    }
}

#[async_trait]
impl AIBackend for MockBackend {
    async fn complete(&self, task: PromptId, prompt: &str) -> Result<ModelReply> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(task);
        }

        if let Some(ref message) = self.outage {
            return Err(Error::Inference(message.clone()));
        }

        match self.next_scripted() {
            Some(ScriptedReply::Reply(reply)) => Ok(reply),
            Some(ScriptedReply::Fail(message)) => Err(Error::Inference(message)),
            None => Ok(ModelReply::Text(heuristic_reply(task, prompt))),
        }
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}

/// Canned JSON answer for a rendered prompt
pub(crate) fn heuristic_reply(task: PromptId, rendered: &str) -> String {
    let text = user_text(rendered).to_lowercase();
    let reply = match task {
        PromptId::ClassifyPrompt => classify(&text),
        PromptId::ExtractExpenses => extract_expenses(&text),
        PromptId::ExtractFilters => extract_filters(&text),
    };
    reply.to_string()
}

/// The user's words: the rest of the `Prompt:` line, or the whole text
fn user_text(rendered: &str) -> &str {
    rendered
        .lines()
        .find_map(|line| line.trim_start().strip_prefix("Prompt:"))
        .map(str::trim)
        .unwrap_or(rendered)
}

fn classify(text: &str) -> Value {
    let count = |words: &[&str]| words.iter().filter(|w| text.contains(*w)).count();
    let views = count(VIEW_VERBS);
    let additions = count(ADDITION_VERBS);
    let hints = count(VIEW_HINTS) + known_periods().iter().filter(|p| text.contains(*p)).count();

    let prompt_type = if views > 0 {
        "view"
    } else if additions > 0 {
        "addition"
    } else if hints > 0 {
        "view"
    } else {
        "unclear"
    };

    json!({
        "prompt_type": prompt_type,
        "confidence": if prompt_type == "unclear" { "low" } else { "high" },
        "reasoning": format!("mock keyword match ({} addition, {} view)", additions, views + hints),
    })
}

fn extract_expenses(text: &str) -> Value {
    let time_re = Regex::new(r"\b(\d{1,2}(?::\d{2})?\s?(?:am|pm))\b").expect("valid regex");
    let amount_re = Regex::new(r"\$?(\d+(?:\.\d+)?)").expect("valid regex");
    let on_re = Regex::new(r"\b(?:on|for)\s+([a-z]+)").expect("valid regex");

    let time = time_re.captures(text).map(|c| c[1].replace(' ', ""));
    let without_times = time_re.replace_all(text, " ");

    let mut expenses = Vec::new();
    for segment in without_times.split([',', ';']).flat_map(|s| s.split(" and ")) {
        let Some(amount) = amount_re.captures(segment).map(|c| c[1].to_string()) else {
            continue;
        };
        let category = on_re
            .captures_iter(segment)
            .map(|c| c[1].to_string())
            .find(|word| !matches!(word.as_str(), "the" | "a" | "an" | "my"))
            .or_else(|| known_category(segment));
        let Some(category) = category else {
            continue;
        };
        expenses.push(json!({
            "amount": amount,
            "category": category,
            "date": Value::Null,
            "time": time,
        }));
    }

    if expenses.is_empty() {
        let mut required = Vec::new();
        if !amount_re.is_match(&without_times) {
            required.push("amount");
        }
        if known_category(text).is_none() && !on_re.is_match(text) {
            required.push("category");
        }
        if required.is_empty() {
            required = vec!["amount", "category"];
        }
        return json!({
            "missing_info": true,
            "required_fields": required,
            "message": "Please tell me how much you spent and what it was for.",
            "example_prompt": "Example: 'I spent 50 dollars on food today' or 'I bought groceries for 80 dollars yesterday at 2pm'",
        });
    }

    Value::Array(expenses)
}

fn extract_filters(text: &str) -> Value {
    let team_re = Regex::new(r"\b([a-z]+)\s+team\b").expect("valid regex");
    let year_re = Regex::new(r"\b((?:19|20)\d{2})\b").expect("valid regex");
    let between_re = Regex::new(r"between\s+\$?(\d+(?:\.\d+)?)\s*(?:dollars\s+)?and\s+\$?(\d+(?:\.\d+)?)")
        .expect("valid regex");
    let bound_re = Regex::new(
        r"(over|above|more than|greater than|under|below|less than|at least|at most)\s+\$?(\d+(?:\.\d+)?)",
    )
    .expect("valid regex");

    let team = team_re
        .captures(text)
        .map(|c| c[1].to_string())
        .filter(|t| !matches!(t.as_str(), "the" | "my" | "our"));

    let time_period = known_periods()
        .into_iter()
        .find(|p| text.contains(p))
        .map(str::to_string)
        .or_else(|| year_re.captures(text).map(|c| c[1].to_string()));

    let category = known_category(text);

    let amount_range = if let Some(c) = between_re.captures(text) {
        let low: f64 = c[1].parse().unwrap_or(0.0);
        let high: f64 = c[2].parse().unwrap_or(0.0);
        Some(json!({"operator": "between", "value": [low, high], "text": &c[0]}))
    } else if let Some(c) = bound_re.captures(text) {
        let operator = match &c[1] {
            "over" | "above" | "more than" | "greater than" => "gt",
            "under" | "below" | "less than" => "lt",
            "at least" => "gte",
            _ => "lte",
        };
        let value: f64 = c[2].parse().unwrap_or(0.0);
        Some(json!({"operator": operator, "value": value, "text": &c[0]}))
    } else {
        None
    };

    if team.is_none() && time_period.is_none() && category.is_none() && amount_range.is_none() {
        return json!({
            "insufficient_info": true,
            "message": "Please say which team, period, category or amount range you want to see.",
            "missing_fields": ["team", "time_period", "category", "amount_range"],
        });
    }

    json!({
        "team": team,
        "time_period": time_period,
        "category": category,
        "amount_range": amount_range,
    })
}

fn known_category(text: &str) -> Option<String> {
    let word_re = Regex::new(r"[a-z]+").expect("valid regex");
    let found = word_re
        .find_iter(text)
        .map(|m| m.as_str())
        .find(|word| KNOWN_CATEGORIES.contains(word))
        .map(str::to_string);
    found
}
