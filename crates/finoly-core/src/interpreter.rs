//! Natural-language expense interpreter
//!
//! Classifies a prompt as recording expenses or viewing them, then runs the
//! matching extraction. Every model reply goes through the sanitizer and a
//! strict parser; when that fails the interpreter degrades to a keyword
//! classifier or a structured "could not parse" result. Only a failing
//! inference provider comes back as an error.

use std::collections::HashMap;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::ai::parsing::{parse_reply, parse_reply_as, PayloadStart};
use crate::ai::{AIBackend, ModelReply};
use crate::error::Result;
use crate::expense::{is_truthy, normalize_expense, ExpenseRecord};
use crate::periods::known_periods;
use crate::prompts::{PromptId, PromptLibrary};
use crate::query::{build_query_at, AmountRange, FilterSpec, QueryPlan};

const ADDITION_KEYWORDS: &[&str] = &[
    "add", "spent", "bought", "purchased", "paid", "expense", "cost", "spend",
];
const VIEW_KEYWORDS: &[&str] = &[
    "show", "view", "see", "list", "check", "history", "summary", "how much",
];

pub const EXAMPLE_PROMPT: &str =
    "Example: 'I spent 50 dollars on food today' or 'I bought groceries for 80 dollars yesterday at 2pm'";
const MISSING_EXPENSE_MESSAGE: &str =
    "Could not extract valid expense information. Please provide amount and category.";
const UNPARSED_EXPENSE_MESSAGE: &str = "Could not extract expense information from the prompt";
const UNPARSED_FILTER_MESSAGE: &str = "Could not extract filter information from the prompt";
const INSUFFICIENT_FILTER_MESSAGE: &str =
    "Please specify which expenses to show: a team, a time period, a category or an amount range.";

/// Phrasings offered when a view request names no filter
pub const EXAMPLE_QUERIES: &[&str] = &[
    "show all marketing team cost in this month",
    "expenses over 100 dollars",
    "ads expenses this year",
    "food expenses under 50 dollars",
    "expenses between 50 and 200 dollars",
    "sales team expenses today",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptType {
    Addition,
    View,
    Unclear,
}

impl PromptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Addition => "addition",
            Self::View => "view",
            Self::Unclear => "unclear",
        }
    }
}

/// Result of classifying a prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptAnalysis {
    pub prompt_type: PromptType,
    pub confidence: String,
    pub reasoning: String,
}

/// Outcome of the expense extraction step
#[derive(Debug, Clone, PartialEq)]
pub enum ExpenseExtraction {
    Expenses(Vec<ExpenseRecord>),
    MissingInfo {
        required_fields: Vec<String>,
        message: String,
        example_prompt: String,
    },
    Unparsed {
        raw_response: String,
        message: String,
    },
}

/// Outcome of the filter extraction step
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExtraction {
    Filters(FilterSpec),
    Insufficient {
        message: String,
        missing_fields: Vec<String>,
        example_queries: Vec<String>,
    },
    Unparsed {
        raw_response: String,
        message: String,
    },
}

/// Full pipeline result for one prompt
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Interpretation {
    Addition {
        analysis: PromptAnalysis,
        expenses: Vec<ExpenseRecord>,
    },
    AdditionMissingInfo {
        analysis: PromptAnalysis,
        required_fields: Vec<String>,
        message: String,
        example_prompt: String,
    },
    AdditionUnparsed {
        analysis: PromptAnalysis,
        raw_response: String,
        message: String,
    },
    View {
        analysis: PromptAnalysis,
        query: QueryPlan,
    },
    ViewInsufficient {
        analysis: PromptAnalysis,
        message: String,
        missing_fields: Vec<String>,
        example_queries: Vec<String>,
    },
    ViewUnparsed {
        analysis: PromptAnalysis,
        raw_response: String,
        message: String,
    },
    Unclear {
        analysis: PromptAnalysis,
    },
}

impl Interpretation {
    pub fn analysis(&self) -> &PromptAnalysis {
        match self {
            Self::Addition { analysis, .. }
            | Self::AdditionMissingInfo { analysis, .. }
            | Self::AdditionUnparsed { analysis, .. }
            | Self::View { analysis, .. }
            | Self::ViewInsufficient { analysis, .. }
            | Self::ViewUnparsed { analysis, .. }
            | Self::Unclear { analysis } => analysis,
        }
    }
}

/// Keyword-count classifier used when the model's answer is unusable
///
/// Each keyword counts once if it appears anywhere in the lowercased prompt.
/// Addition needs a strict majority; ties go to view.
pub fn fallback_classification(prompt: &str) -> PromptAnalysis {
    let lower = prompt.to_lowercase();
    let additions = ADDITION_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();
    let views = VIEW_KEYWORDS.iter().filter(|k| lower.contains(*k)).count();

    let prompt_type = if additions > views {
        PromptType::Addition
    } else {
        PromptType::View
    };

    PromptAnalysis {
        prompt_type,
        confidence: "medium".to_string(),
        reasoning: "fallback classification".to_string(),
    }
}

/// Turns free text into expense records or a view query
pub struct ExpenseInterpreter<B: AIBackend> {
    backend: B,
    prompts: PromptLibrary,
}

impl<B: AIBackend> ExpenseInterpreter<B> {
    pub fn new(backend: B, prompts: PromptLibrary) -> Self {
        Self { backend, prompts }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn prompts(&self) -> &PromptLibrary {
        &self.prompts
    }

    async fn ask(&self, task: PromptId, prompt: &str) -> Result<ModelReply> {
        let periods = known_periods().join(", ");
        let mut vars = HashMap::new();
        vars.insert("prompt", prompt);
        vars.insert("periods", periods.as_str());

        let rendered = self.prompts.render_user(task, &vars)?;
        let reply = self.backend.complete(task, &rendered).await?;
        debug!(task = task.as_str(), raw = %reply.raw_text(), "Model reply");
        Ok(reply)
    }

    /// Decide whether the prompt records expenses or asks to see them
    pub async fn analyze_prompt_type(&self, prompt: &str) -> Result<PromptAnalysis> {
        let reply = self.ask(PromptId::ClassifyPrompt, prompt).await?;

        match parse_reply_as::<Value>(&reply, PayloadStart::PreferObject) {
            Ok(Value::Object(fields)) => Ok(analysis_from_fields(&fields)),
            Ok(other) => {
                warn!(reply = %other, "Classification reply is not an object, using keyword fallback");
                Ok(fallback_classification(prompt))
            }
            Err(e) => {
                warn!(error = %e, "Could not parse classification, using keyword fallback");
                Ok(fallback_classification(prompt))
            }
        }
    }

    /// Pull expense line items out of the prompt, dated against the local clock
    pub async fn extract_expenses(&self, prompt: &str) -> Result<ExpenseExtraction> {
        self.extract_expenses_at(prompt, Local::now().naive_local())
            .await
    }

    pub async fn extract_expenses_at(
        &self,
        prompt: &str,
        now: NaiveDateTime,
    ) -> Result<ExpenseExtraction> {
        let reply = self.ask(PromptId::ExtractExpenses, prompt).await?;

        // A missing-info object carries its own arrays, so look for it object-first
        if let Ok(Value::Object(fields)) = parse_reply_as::<Value>(&reply, PayloadStart::PreferObject) {
            if fields.get("missing_info").is_some_and(is_truthy) {
                return Ok(missing_info_from_fields(&fields));
            }
        }

        let parsed: Value = match parse_reply(&reply) {
            Ok(value) => value,
            Err(e) => {
                warn!(error = %e, "Could not parse expense extraction");
                return Ok(ExpenseExtraction::Unparsed {
                    raw_response: reply.raw_text(),
                    message: UNPARSED_EXPENSE_MESSAGE.to_string(),
                });
            }
        };

        let items = match parsed {
            Value::Object(ref fields) if fields.get("missing_info").is_some_and(is_truthy) => {
                return Ok(missing_info_from_fields(fields));
            }
            Value::Array(items) => items,
            object @ Value::Object(_) => vec![object],
            _ => Vec::new(),
        };

        let total = items.len();
        let expenses: Vec<ExpenseRecord> = items
            .iter()
            .filter_map(|item| normalize_expense(item, now))
            .collect();

        if expenses.len() < total {
            warn!(
                dropped = total - expenses.len(),
                kept = expenses.len(),
                "Dropped expense items without a usable amount or category"
            );
        }

        if expenses.is_empty() {
            return Ok(ExpenseExtraction::MissingInfo {
                required_fields: vec!["amount".to_string(), "category".to_string()],
                message: MISSING_EXPENSE_MESSAGE.to_string(),
                example_prompt: EXAMPLE_PROMPT.to_string(),
            });
        }

        Ok(ExpenseExtraction::Expenses(expenses))
    }

    /// Pull view filters out of the prompt
    pub async fn extract_filters(&self, prompt: &str) -> Result<FilterExtraction> {
        let reply = self.ask(PromptId::ExtractFilters, prompt).await?;

        let fields = match parse_reply_as::<Value>(&reply, PayloadStart::PreferObject) {
            Ok(Value::Object(fields)) => fields,
            Ok(other) => {
                warn!(reply = %other, "Filter extraction reply is not an object");
                return Ok(unparsed_filters(&reply));
            }
            Err(e) => {
                warn!(error = %e, "Could not parse filter extraction");
                return Ok(unparsed_filters(&reply));
            }
        };

        if fields.get("insufficient_info").is_some_and(is_truthy) {
            return Ok(insufficient(
                text_field(&fields, "message"),
                string_list(&fields, "missing_fields"),
            ));
        }

        let filters = filter_spec_from_fields(&fields);
        if !filters.is_meaningful() {
            return Ok(insufficient(None, None));
        }

        Ok(FilterExtraction::Filters(filters))
    }

    /// Classify, then run at most one extraction
    pub async fn interpret(&self, prompt: &str) -> Result<Interpretation> {
        self.interpret_at(prompt, Local::now().naive_local()).await
    }

    pub async fn interpret_at(&self, prompt: &str, now: NaiveDateTime) -> Result<Interpretation> {
        let analysis = self.analyze_prompt_type(prompt).await?;
        info!(
            prompt_type = analysis.prompt_type.as_str(),
            confidence = %analysis.confidence,
            "Classified prompt"
        );

        let interpretation = match analysis.prompt_type {
            PromptType::Addition => match self.extract_expenses_at(prompt, now).await? {
                ExpenseExtraction::Expenses(expenses) => {
                    Interpretation::Addition { analysis, expenses }
                }
                ExpenseExtraction::MissingInfo {
                    required_fields,
                    message,
                    example_prompt,
                } => Interpretation::AdditionMissingInfo {
                    analysis,
                    required_fields,
                    message,
                    example_prompt,
                },
                ExpenseExtraction::Unparsed {
                    raw_response,
                    message,
                } => Interpretation::AdditionUnparsed {
                    analysis,
                    raw_response,
                    message,
                },
            },
            PromptType::View => match self.extract_filters(prompt).await? {
                FilterExtraction::Filters(filters) => Interpretation::View {
                    analysis,
                    query: build_query_at(&filters, now),
                },
                FilterExtraction::Insufficient {
                    message,
                    missing_fields,
                    example_queries,
                } => Interpretation::ViewInsufficient {
                    analysis,
                    message,
                    missing_fields,
                    example_queries,
                },
                FilterExtraction::Unparsed {
                    raw_response,
                    message,
                } => Interpretation::ViewUnparsed {
                    analysis,
                    raw_response,
                    message,
                },
            },
            PromptType::Unclear => Interpretation::Unclear { analysis },
        };

        Ok(interpretation)
    }
}

fn analysis_from_fields(fields: &Map<String, Value>) -> PromptAnalysis {
    let prompt_type = match text_field(fields, "prompt_type")
        .map(|t| t.trim().to_lowercase())
        .as_deref()
    {
        Some("addition") => PromptType::Addition,
        Some("view") => PromptType::View,
        _ => PromptType::Unclear,
    };

    PromptAnalysis {
        prompt_type,
        confidence: text_field(fields, "confidence").unwrap_or_else(|| "low".to_string()),
        reasoning: text_field(fields, "reasoning").unwrap_or_default(),
    }
}

fn unparsed_filters(reply: &ModelReply) -> FilterExtraction {
    FilterExtraction::Unparsed {
        raw_response: reply.raw_text(),
        message: UNPARSED_FILTER_MESSAGE.to_string(),
    }
}

fn missing_info_from_fields(fields: &Map<String, Value>) -> ExpenseExtraction {
    ExpenseExtraction::MissingInfo {
        required_fields: string_list(fields, "required_fields")
            .unwrap_or_else(|| vec!["amount".to_string(), "category".to_string()]),
        message: text_field(fields, "message")
            .unwrap_or_else(|| MISSING_EXPENSE_MESSAGE.to_string()),
        example_prompt: text_field(fields, "example_prompt")
            .unwrap_or_else(|| EXAMPLE_PROMPT.to_string()),
    }
}

fn insufficient(message: Option<String>, missing_fields: Option<Vec<String>>) -> FilterExtraction {
    FilterExtraction::Insufficient {
        message: message.unwrap_or_else(|| INSUFFICIENT_FILTER_MESSAGE.to_string()),
        missing_fields: missing_fields.unwrap_or_else(|| {
            ["team", "time_period", "category", "amount_range"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        }),
        example_queries: EXAMPLE_QUERIES.iter().map(|s| s.to_string()).collect(),
    }
}

/// Lenient field-by-field read; a bad amount range is dropped, not fatal
fn filter_spec_from_fields(fields: &Map<String, Value>) -> FilterSpec {
    let amount_range = match fields.get("amount_range") {
        None | Some(Value::Null) => None,
        Some(value) => match serde_json::from_value::<AmountRange>(value.clone()) {
            Ok(range) => Some(range),
            Err(e) => {
                warn!(error = %e, "Ignoring malformed amount range");
                None
            }
        },
    };

    FilterSpec {
        team: text_field(fields, "team"),
        time_period: text_field(fields, "time_period"),
        category: text_field(fields, "category"),
        amount_range,
    }
}

/// Non-empty string (or number, e.g. a bare year) field as text
fn text_field(fields: &Map<String, Value>, key: &str) -> Option<String> {
    match fields.get(key)? {
        Value::String(s) if !s.trim().is_empty() && s != "null" => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn string_list(fields: &Map<String, Value>, key: &str) -> Option<Vec<String>> {
    let items = fields.get(key)?.as_array()?;
    let list: Vec<String> = items
        .iter()
        .filter_map(|v| v.as_str().map(str::to_string))
        .collect();
    if list.is_empty() {
        None
    } else {
        Some(list)
    }
}
